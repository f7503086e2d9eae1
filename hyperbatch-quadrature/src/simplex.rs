//! Symmetric rules for the unit triangle and the unit tetrahedron.
//!
//! Some of the rules have negative weights.
use crate::{Error, Rule};

/// A rule of at least the given strength on the unit triangle (area 1/2).
pub fn triangle(strength: usize) -> Result<Rule<2>, Error> {
    let rule = match strength {
        0 | 1 => (vec![0.5], vec![[1.0 / 3.0, 1.0 / 3.0]]),
        2 => (
            vec![1.0 / 6.0; 3],
            vec![[1.0 / 6.0, 1.0 / 6.0], [2.0 / 3.0, 1.0 / 6.0], [1.0 / 6.0, 2.0 / 3.0]],
        ),
        3 => (
            vec![-27.0 / 96.0, 25.0 / 96.0, 25.0 / 96.0, 25.0 / 96.0],
            vec![[1.0 / 3.0, 1.0 / 3.0], [0.2, 0.2], [0.6, 0.2], [0.2, 0.6]],
        ),
        4 => {
            // Dunavant's six-point rule
            let (a, wa) = (0.445948490915965, 0.223381589678011 / 2.0);
            let (b, wb) = (0.091576213509771, 0.109951743655322 / 2.0);
            let weights = vec![wa, wa, wa, wb, wb, wb];
            let points = vec![
                [a, a],
                [1.0 - 2.0 * a, a],
                [a, 1.0 - 2.0 * a],
                [b, b],
                [1.0 - 2.0 * b, b],
                [b, 1.0 - 2.0 * b],
            ];
            (weights, points)
        }
        _ => {
            return Err(Error::NoRuleAvailable {
                domain: "triangle",
                strength,
            })
        }
    };
    Ok(rule)
}

/// A rule of at least the given strength on the unit tetrahedron (volume 1/6).
pub fn tetrahedron(strength: usize) -> Result<Rule<3>, Error> {
    let rule = match strength {
        0 | 1 => (vec![1.0 / 6.0], vec![[0.25, 0.25, 0.25]]),
        2 => {
            let a = 0.5854101966249685;
            let b = 0.1381966011250105;
            (
                vec![1.0 / 24.0; 4],
                vec![[b, b, b], [a, b, b], [b, a, b], [b, b, a]],
            )
        }
        3 => {
            // Keast's five-point rule
            let (a, b) = (0.5, 1.0 / 6.0);
            (
                vec![-2.0 / 15.0, 3.0 / 40.0, 3.0 / 40.0, 3.0 / 40.0, 3.0 / 40.0],
                vec![[0.25, 0.25, 0.25], [b, b, b], [a, b, b], [b, a, b], [b, b, a]],
            )
        }
        4 => {
            // Keast's eleven-point rule
            let (c, d) = (1.0 / 14.0, 11.0 / 14.0);
            let a = (1.0 + (5.0f64 / 14.0).sqrt()) / 4.0;
            let b = (1.0 - (5.0f64 / 14.0).sqrt()) / 4.0;
            let (w0, wc, wa) = (-74.0 / 5625.0, 343.0 / 45000.0, 56.0 / 2250.0);
            let mut weights = vec![w0];
            weights.extend([wc; 4]);
            weights.extend([wa; 6]);
            let points = vec![
                [0.25, 0.25, 0.25],
                [c, c, c],
                [d, c, c],
                [c, d, c],
                [c, c, d],
                [a, b, b],
                [b, a, b],
                [b, b, a],
                [a, a, b],
                [a, b, a],
                [b, a, a],
            ];
            (weights, points)
        }
        _ => {
            return Err(Error::NoRuleAvailable {
                domain: "tetrahedron",
                strength,
            })
        }
    };
    Ok(rule)
}
