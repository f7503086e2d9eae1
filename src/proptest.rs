//! Proptest strategies for meshes and batched arrays.
use crate::mesh::ParsedMesh;
use crate::procedural::{create_box_hex_mesh, create_box_tet_mesh};
use ::proptest::collection::vec;
use ::proptest::prelude::*;
use nalgebra::{DMatrix, Point3};

pub fn point3() -> impl Strategy<Value = Point3<f64>> {
    // Pick a reasonably small range to pick coordinates from,
    // otherwise we can easily get floating point numbers that are
    // so ridiculously large as to break anything we might want to do with them
    let range = -10.0..10.0;
    [range.clone(), range.clone(), range].prop_map(|[x, y, z]| Point3::new(x, y, z))
}

/// Cell counts `[nx, ny, nz]` with `1 <= n <= max_cells_per_dim` along each axis.
pub fn box_cells_strategy(max_cells_per_dim: usize) -> impl Strategy<Value = [usize; 3]> {
    let range = 1..=max_cells_per_dim.max(1);
    [range.clone(), range.clone(), range]
}

/// Extents of a box with side lengths in `[0.5, 2]`.
pub fn box_extents_strategy() -> impl Strategy<Value = [f64; 3]> {
    let range = 0.5..2.0;
    [range.clone(), range.clone(), range]
}

pub fn box_hex_mesh_strategy(max_cells_per_dim: usize) -> impl Strategy<Value = ParsedMesh> {
    (box_cells_strategy(max_cells_per_dim), box_extents_strategy())
        .prop_filter_map("box mesh must be valid", |(cells, extents)| {
            create_box_hex_mesh(cells, extents).ok()
        })
}

pub fn box_tet_mesh_strategy(max_cells_per_dim: usize) -> impl Strategy<Value = ParsedMesh> {
    (box_cells_strategy(max_cells_per_dim), box_extents_strategy())
        .prop_filter_map("box mesh must be valid", |(cells, extents)| {
            create_box_tet_mesh(cells, extents).ok()
        })
}

/// Batched arrays of the given shape with entries in `[-magnitude, magnitude]`.
pub fn batch_strategy(
    num_realizations: usize,
    num_dofs: usize,
    magnitude: f64,
) -> impl Strategy<Value = DMatrix<f64>> {
    vec(-magnitude..=magnitude, num_realizations * num_dofs)
        .prop_map(move |data| DMatrix::from_row_slice(num_realizations, num_dofs, &data))
}
