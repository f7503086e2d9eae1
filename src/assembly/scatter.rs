//! Index-based transfer between element-local and global batched arrays.
//!
//! Global arrays are `n_realizations x n_dofs` matrices.
use crate::Real;
use nalgebra::{DMatrix, Scalar};

/// Adds `values[i]` to `target[(realization, indices[i])]` for every `i`.
///
/// Repeated indices accumulate.
///
/// # Panics
///
/// Panics if `indices` and `values` differ in length or an index is out of bounds.
pub fn scatter_accumulate<T: Real>(target: &mut DMatrix<T>, realization: usize, indices: &[usize], values: &[T]) {
    assert_eq!(indices.len(), values.len(), "indices and values must have the same length");
    for (&index, &value) in indices.iter().zip(values) {
        target[(realization, index)] += value;
    }
}

/// Sets `target[positions[i]]` to `values[i]` for every `i`, where a position is a
/// `(realization, dof)` pair.
///
/// # Panics
///
/// Panics if `positions` and `values` differ in length or a position is out of bounds.
pub fn scatter_overwrite<T: Scalar + Copy>(target: &mut DMatrix<T>, positions: &[(usize, usize)], values: &[T]) {
    assert_eq!(positions.len(), values.len(), "positions and values must have the same length");
    for (&position, &value) in positions.iter().zip(values) {
        target[position] = value;
    }
}

/// Reads `source[(realization, indices[i])]` into `output[i]`.
///
/// # Panics
///
/// Panics if `indices` and `output` differ in length or an index is out of bounds.
pub fn gather<T: Scalar + Copy>(source: &DMatrix<T>, realization: usize, indices: &[usize], output: &mut [T]) {
    assert_eq!(indices.len(), output.len(), "indices and output must have the same length");
    for (out, &index) in output.iter_mut().zip(indices) {
        *out = source[(realization, index)];
    }
}
