//! Tensor-product Gauss rules for quadrilaterals and hexahedra.

use crate::univariate::gauss;
use crate::Rule;
use std::iter::repeat;

/// A Gauss rule on `[-1, 1]^2` with `num_points_per_dim` points along each axis.
pub fn quadrilateral_gauss(num_points_per_dim: usize) -> Rule<2> {
    let (w1d, p1d) = gauss(num_points_per_dim);
    let n = w1d.len();
    let mut weights = Vec::with_capacity(n * n);
    let mut points = Vec::with_capacity(n * n);
    for (i, j) in (0..n).flat_map(|i| repeat(i).zip(0..n)) {
        weights.push(w1d[i] * w1d[j]);
        points.push([p1d[i][0], p1d[j][0]]);
    }
    (weights, points)
}

/// A Gauss rule on `[-1, 1]^3` with `num_points_per_dim` points along each axis.
pub fn hexahedron_gauss(num_points_per_dim: usize) -> Rule<3> {
    let (w2d, p2d) = quadrilateral_gauss(num_points_per_dim);
    let (w1d, p1d) = gauss(num_points_per_dim);
    let mut weights = Vec::with_capacity(w2d.len() * w1d.len());
    let mut points = Vec::with_capacity(w2d.len() * w1d.len());
    for (w_xy, [x, y]) in w2d.iter().zip(&p2d) {
        for (w_z, [z]) in w1d.iter().zip(&p1d) {
            weights.push(w_xy * w_z);
            points.push([*x, *y, *z]);
        }
    }
    (weights, points)
}
