//! Internal (stress) work.
use crate::assembly::deformation::evaluate_deformation_gradient;
use crate::assembly::scatter::scatter_accumulate;
use crate::assembly::check_batch_shape;
use crate::dispatch::{RealizationGroups, VolumeElements};
use crate::materials::ConstitutiveModel;
use crate::{Real, Result};
use itertools::izip;
use log::trace;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

/// Accumulates the internal forces $\int \vec P : \nabla N_a \, dX$ of a domain group into the
/// residual, for all realizations.
pub fn assemble_internal_work<T: Real>(
    residual: &mut DMatrix<T>,
    displacements: &DMatrix<T>,
    groups: &RealizationGroups<'_, VolumeElements<T>>,
    material: &dyn ConstitutiveModel<T>,
) -> Result<()> {
    let num_realizations = displacements.nrows();
    check_batch_shape(residual, num_realizations, displacements.ncols(), "residual")?;
    material
        .parameters()
        .check_num_realizations(num_realizations)?;

    let Some(reference) = groups.first() else {
        return Ok(());
    };
    let num_elements = reference.num_elements();
    let element_len = 3 * reference.nodes_per_element();

    let deformation_gradients = evaluate_deformation_gradient(displacements, groups)?;
    let stresses = material.first_piola_kirchhoff(&deformation_gradients)?;

    let mut element_forces = vec![T::zero(); num_realizations * num_elements * element_len];
    element_forces
        .par_chunks_mut((num_elements * element_len).max(1))
        .enumerate()
        .for_each(|(r, forces)| {
            let group = groups.get(r);
            for (e, f_e) in forces.chunks_exact_mut(element_len.max(1)).enumerate() {
                let stress = stresses.element_values(r, e);
                for (q, (p, &measure)) in stress.iter().zip(group.element_measures(e)).enumerate() {
                    for (f_a, grad_a) in f_e.chunks_exact_mut(3).zip(group.gradients(e, q)) {
                        let f = p * grad_a * measure;
                        for (f_ai, f_i) in f_a.iter_mut().zip(f.iter()) {
                            *f_ai += *f_i;
                        }
                    }
                }
            }
        });

    for r in 0..num_realizations {
        let group = groups.get(r);
        let forces = &element_forces[r * num_elements * element_len..(r + 1) * num_elements * element_len];
        for (e, f_e) in forces.chunks_exact(element_len.max(1)).enumerate() {
            scatter_accumulate(residual, r, group.element_dofs(e), f_e);
        }
    }
    trace!(
        "assembled internal work of group '{}' for {} realizations",
        reference.name(),
        num_realizations
    );
    Ok(())
}

/// Computes the stored energy $\int \psi(\vec F) \, dX$ of a domain group per realization.
pub fn compute_internal_energy<T: Real>(
    displacements: &DMatrix<T>,
    groups: &RealizationGroups<'_, VolumeElements<T>>,
    material: &dyn ConstitutiveModel<T>,
) -> Result<DVector<T>> {
    let num_realizations = displacements.nrows();
    material
        .parameters()
        .check_num_realizations(num_realizations)?;
    let mut energy = DVector::zeros(num_realizations);
    let Some(reference) = groups.first() else {
        return Ok(energy);
    };
    let num_elements = reference.num_elements();

    let deformation_gradients = evaluate_deformation_gradient(displacements, groups)?;
    let densities = material.strain_energy(&deformation_gradients)?;
    for r in 0..num_realizations {
        let group = groups.get(r);
        for e in 0..num_elements {
            for (&psi, &measure) in izip!(densities.element_values(r, e), group.element_measures(e)) {
                energy[r] += psi * measure;
            }
        }
    }
    Ok(energy)
}
