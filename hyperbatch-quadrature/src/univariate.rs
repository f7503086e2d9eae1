//! Quadrature rules for the one-dimensional domain `[-1, 1]`.

use crate::Rule;
use std::f64::consts::PI;

/// Legendre polynomial `p_n` and its predecessor `p_{n-1}` evaluated at `x`.
///
/// The derivative formula is singular at `|x| == 1`, so this is only suitable for the open
/// interval `(-1, 1)`.
#[derive(Debug, Default)]
struct Legendre {
    n: usize,
    x: f64,
    p_n: f64,
    p_n_minus_1: f64,
}

impl Legendre {
    fn evaluate(n: usize, x: f64) -> Self {
        // m P_m(x) = (2m - 1) x P_{m - 1}(x) - (m - 1) P_{m - 2}(x)
        let (mut p_n, mut p_n_minus_1) = (1.0, 0.0);
        for m in 1..=n {
            let m = m as f64;
            let p_n_minus_2 = p_n_minus_1;
            p_n_minus_1 = p_n;
            p_n = ((2.0 * m - 1.0) * x * p_n_minus_1 - (m - 1.0) * p_n_minus_2) / m;
        }
        Self { n, x, p_n, p_n_minus_1 }
    }

    fn derivative(&self) -> f64 {
        // P'_n(x) = n (x P_n(x) - P_{n - 1}(x)) / (x^2 - 1)
        let n = self.n as f64;
        n * (self.x * self.p_n - self.p_n_minus_1) / (self.x * self.x - 1.0)
    }
}

/// Gauss-Legendre quadrature with `num_points` points on `[-1, 1]`.
///
/// With `n` points the rule integrates polynomials of degree `2n - 1` exactly.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss(num_points: usize) -> Rule<1> {
    let n = num_points;
    assert!(n > 0, "number of points must be positive");

    // Roots are symmetric about the origin, so we only search for the first half
    let half = (n + 1) / 2;
    let mut points = Vec::with_capacity(n);
    let mut weights = Vec::with_capacity(n);

    for i in 0..half {
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut legendre = Legendre::evaluate(n, x);
        // Newton iterations converge quadratically from the initial guess above
        for _ in 0..100 {
            let dx = -legendre.p_n / legendre.derivative();
            x += dx;
            legendre = Legendre::evaluate(n, x);
            if dx.abs() <= 1e-15 {
                break;
            }
        }
        let dp = legendre.derivative();
        points.push([x]);
        weights.push(2.0 / ((1.0 - x * x) * dp * dp));
    }

    for i in half..n {
        let mirror = n - i - 1;
        points.push([-points[mirror][0]]);
        weights.push(weights[mirror]);
    }

    (weights, points)
}
