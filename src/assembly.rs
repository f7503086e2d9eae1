//! Batched assembly of residual contributions.
//!
//! Element contributions are computed in parallel across realizations and then added into the
//! global arrays sequentially, in a fixed order, so that results do not depend on thread
//! scheduling.
pub mod deformation;
pub mod internal;
pub mod scatter;
pub mod traction;

pub use deformation::evaluate_deformation_gradient;
pub use internal::{assemble_internal_work, compute_internal_energy};
pub use traction::{assemble_traction_work, compute_external_work, TractionKind, TractionRecord};

use crate::{Error, Result};
use nalgebra::{DMatrix, Scalar};

/// Checks that a batched global array has the expected shape.
pub(crate) fn check_batch_shape<T: Scalar>(
    array: &DMatrix<T>,
    num_realizations: usize,
    num_dofs: usize,
    what: &str,
) -> Result<()> {
    if array.shape() != (num_realizations, num_dofs) {
        Err(Error::RealizationConsistency(format!(
            "{} has shape {:?}, expected ({}, {})",
            what,
            array.shape(),
            num_realizations,
            num_dofs
        )))
    } else {
        Ok(())
    }
}
