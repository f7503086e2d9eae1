//! Quadrature rules for finite element reference domains.
//!
//! The rules are given in `f64` on the following reference domains:
//!
//! - the interval `[-1, 1]`,
//! - the quadrilateral `[-1, 1]^2` and the hexahedron `[-1, 1]^3`,
//! - the unit triangle with vertices `(0, 0)`, `(1, 0)`, `(0, 1)`,
//! - the unit tetrahedron with vertices `(0, 0, 0)`, `(1, 0, 0)`, `(0, 1, 0)`, `(0, 0, 1)`.
//!
//! The *strength* of a rule is the highest total polynomial degree it integrates exactly.

use std::fmt;
use std::fmt::{Display, Formatter};

pub mod simplex;
pub mod tensor;
pub mod univariate;

/// Library-wide error type.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// No rule of the requested strength is available for the domain.
    NoRuleAvailable { domain: &'static str, strength: usize },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuleAvailable { domain, strength } => {
                write!(
                    f,
                    "there is no quadrature rule of strength {} available for the reference {}",
                    strength, domain
                )
            }
        }
    }
}

impl std::error::Error for Error {}

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A D-dimensional rule, given as `(weights, points)`.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// Approximates the integral of `f` with the given rule.
pub fn integrate<const D: usize>(rule: &Rule<D>, f: impl Fn(&Point<D>) -> f64) -> f64 {
    let (weights, points) = rule;
    weights.iter().zip(points).map(|(w, p)| w * f(p)).sum()
}

/// Number of Gauss points per dimension needed to integrate polynomials of the given degree.
pub fn gauss_points_for_strength(strength: usize) -> usize {
    // n points integrate degree 2n - 1 exactly
    (strength + 2) / 2
}
