//! Quadrature rules on reference shapes in the scalar type of the mesh.
use crate::element::ReferenceShape;
use crate::{Real, Result};
use hyperbatch_quadrature::{gauss_points_for_strength, simplex, tensor, univariate, Rule};
use nalgebra::{convert, Point3, Scalar};

/// A quadrature rule consisting of weights and reference points.
///
/// Points of rules on lower-dimensional shapes are padded with zeros.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadratureRule<T: Scalar> {
    weights: Vec<T>,
    points: Vec<Point3<T>>,
}

impl<T: Real> QuadratureRule<T> {
    /// Returns a rule on the given reference shape that integrates polynomials of total degree
    /// `strength` exactly.
    pub fn for_shape(shape: ReferenceShape, strength: usize) -> Result<Self> {
        let gauss_points = gauss_points_for_strength(strength);
        let rule = match shape {
            ReferenceShape::Segment => Self::from_f64_rule(univariate::gauss(gauss_points)),
            ReferenceShape::Quadrilateral => Self::from_f64_rule(tensor::quadrilateral_gauss(gauss_points)),
            ReferenceShape::Hexahedron => Self::from_f64_rule(tensor::hexahedron_gauss(gauss_points)),
            ReferenceShape::Triangle => Self::from_f64_rule(simplex::triangle(strength)?),
            ReferenceShape::Tetrahedron => Self::from_f64_rule(simplex::tetrahedron(strength)?),
        };
        Ok(rule)
    }

    fn from_f64_rule<const D: usize>((weights, points): Rule<D>) -> Self {
        let points = points
            .iter()
            .map(|p| {
                let mut padded = [0.0; 3];
                padded[..D].copy_from_slice(p);
                Point3::new(convert(padded[0]), convert(padded[1]), convert(padded[2]))
            })
            .collect();
        Self {
            weights: weights.into_iter().map(convert).collect(),
            points,
        }
    }

}

impl<T: Scalar> QuadratureRule<T> {
    pub fn weights(&self) -> &[T] {
        &self.weights
    }

    pub fn points(&self) -> &[Point3<T>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
