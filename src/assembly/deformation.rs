//! Deformation gradients from nodal displacements.
use crate::assembly::scatter::gather;
use crate::dispatch::{RealizationGroups, VolumeElements};
use crate::field::TensorField;
use crate::{Real, Result};
use nalgebra::{DMatrix, Matrix3, Vector3};
use rayon::prelude::*;

/// Evaluates $\vec F = \vec I + \sum_a \vec u_a \otimes \nabla N_a$ at every quadrature point of
/// every element, for each realization (row) of the displacement array.
///
/// Element DOFs must be laid out as three components per node, and per-realization groups must
/// match the rows of `displacements`.
pub fn evaluate_deformation_gradient<T: Real>(
    displacements: &DMatrix<T>,
    groups: &RealizationGroups<'_, VolumeElements<T>>,
) -> Result<TensorField<T>> {
    let num_realizations = displacements.nrows();
    groups.check_batch(num_realizations, displacements.ncols())?;
    let (num_elements, num_qp) = groups
        .first()
        .map_or((0, 0), |group| (group.num_elements(), group.num_quadrature_points()));
    let mut field = TensorField::from_element(num_realizations, num_elements, num_qp, Matrix3::identity());

    field
        .as_mut_slice()
        .par_chunks_mut((num_elements * num_qp).max(1))
        .enumerate()
        .for_each(|(r, realization_field)| {
            let group = groups.get(r);
            let mut u_local = vec![T::zero(); 3 * group.nodes_per_element()];
            for (e, element_field) in realization_field.chunks_exact_mut(num_qp.max(1)).enumerate() {
                gather(displacements, r, group.element_dofs(e), &mut u_local);
                for (q, f) in element_field.iter_mut().enumerate() {
                    for (u_a, grad_a) in u_local.chunks_exact(3).zip(group.gradients(e, q)) {
                        let u_a = Vector3::new(u_a[0], u_a[1], u_a[2]);
                        *f += u_a * grad_a.transpose();
                    }
                }
            }
        });
    Ok(field)
}
