//! External work of boundary tractions.
use crate::assembly::scatter::{gather, scatter_accumulate};
use crate::config::TractionConfig;
use crate::dispatch::{RealizationGroups, SurfaceElements};
use crate::load_curve::LoadCurve;
use crate::{Error, Real, Result};
use log::trace;
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use rayon::prelude::*;

/// How the traction vector at a boundary point is obtained.
#[derive(Clone, Debug, PartialEq)]
pub enum TractionKind<T: Real> {
    /// The same vector for all realizations.
    Constant(Vector3<T>),
    /// One vector per realization.
    Batched(Vec<Vector3<T>>),
    /// $\vec t = \vec \sigma \vec n$ for a prescribed stress tensor.
    StressTensor(Matrix3<T>),
    /// $\vec t = -p \vec n$, one pressure per realization.
    Pressure(Vec<T>),
}

/// A traction acting on a boundary group, scaled by a load curve.
#[derive(Clone, Debug, PartialEq)]
pub struct TractionRecord<T: Real> {
    group: String,
    kind: TractionKind<T>,
    load_curve: LoadCurve,
    end_time: T,
    scale: T,
}

impl<T: Real> TractionRecord<T> {
    /// A record with a constant load curve.
    pub fn new(group: &str, kind: TractionKind<T>) -> Self {
        Self {
            group: group.to_string(),
            kind,
            load_curve: LoadCurve::Constant,
            end_time: T::one(),
            scale: T::one(),
        }
    }

    pub fn with_load_curve(self, load_curve: LoadCurve, end_time: T) -> Self {
        let mut record = Self {
            load_curve,
            end_time,
            ..self
        };
        record.update_load_curve(T::zero());
        record
    }

    /// Builds a record from its configuration.
    pub fn from_config(group: &str, config: &TractionConfig<T>, num_realizations: usize) -> Result<Self> {
        let kind = match config {
            TractionConfig::ConstantTraction { traction, .. } => TractionKind::Constant(Vector3::from(*traction)),
            TractionConfig::BatchedTraction { tractions, .. } => {
                if tractions.len() != num_realizations {
                    return Err(Error::RealizationConsistency(format!(
                        "traction of group '{}' is given for {} realizations, but there are {} realizations",
                        group,
                        tractions.len(),
                        num_realizations
                    )));
                }
                TractionKind::Batched(tractions.iter().map(|&t| Vector3::from(t)).collect())
            }
            TractionConfig::StressTensorTraction { stress, .. } => {
                TractionKind::StressTensor(Matrix3::from_fn(|i, j| stress[i][j]))
            }
            TractionConfig::PressureTraction { pressure, .. } => {
                TractionKind::Pressure(pressure.expand(num_realizations, "pressure")?)
            }
        };
        Ok(Self::new(group, kind).with_load_curve(config.load_curve(), config.end_time().unwrap_or_else(T::one)))
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn kind(&self) -> &TractionKind<T> {
        &self.kind
    }

    pub fn scale(&self) -> T {
        self.scale
    }

    /// Number of realizations the traction is given for, or `None` if it is shared.
    pub fn num_realizations(&self) -> Option<usize> {
        match &self.kind {
            TractionKind::Batched(tractions) => Some(tractions.len()),
            TractionKind::Pressure(pressures) => Some(pressures.len()),
            TractionKind::Constant(_) | TractionKind::StressTensor(_) => None,
        }
    }

    /// Recomputes the load curve scale for the given time.
    pub fn update_load_curve(&mut self, time: T) {
        self.scale = self.load_curve.factor(time, self.end_time);
    }

    /// The scaled traction vector for a realization at a point with the given outward normal.
    pub fn traction(&self, realization: usize, normal: &Vector3<T>) -> Vector3<T> {
        let t = match &self.kind {
            TractionKind::Constant(t) => *t,
            TractionKind::Batched(tractions) => tractions[realization],
            TractionKind::StressTensor(stress) => stress * normal,
            TractionKind::Pressure(pressures) => normal * -pressures[realization],
        };
        t * self.scale
    }

    fn check_num_realizations(&self, num_realizations: usize) -> Result<()> {
        match self.num_realizations() {
            Some(n) if n != num_realizations => Err(Error::RealizationConsistency(format!(
                "traction of group '{}' is given for {} realizations, but there are {} realizations",
                self.group, n, num_realizations
            ))),
            _ => Ok(()),
        }
    }
}

/// Subtracts the external forces $\int \vec t N_a \, dA$ of a boundary group from the residual,
/// for all realizations.
pub fn assemble_traction_work<T: Real>(
    residual: &mut DMatrix<T>,
    groups: &RealizationGroups<'_, SurfaceElements<T>>,
    record: &TractionRecord<T>,
) -> Result<()> {
    let num_realizations = residual.nrows();
    record.check_num_realizations(num_realizations)?;
    groups.check_batch(num_realizations, residual.ncols())?;
    let Some(reference) = groups.first() else {
        return Ok(());
    };
    let num_elements = reference.num_elements();
    let element_len = 3 * reference.nodes_per_element();

    let mut element_forces = vec![T::zero(); num_realizations * num_elements * element_len];
    element_forces
        .par_chunks_mut((num_elements * element_len).max(1))
        .enumerate()
        .for_each(|(r, forces)| {
            let group = groups.get(r);
            let reference_element = group.reference();
            for (e, f_e) in forces.chunks_exact_mut(element_len.max(1)).enumerate() {
                let normals = group.element_normals(e);
                let measures = group.element_measures(e);
                for (q, (normal, &measure)) in normals.iter().zip(measures).enumerate() {
                    let t = record.traction(r, normal) * measure;
                    for (f_a, &n_a) in f_e.chunks_exact_mut(3).zip(reference_element.basis_values(q)) {
                        for (f_ai, t_i) in f_a.iter_mut().zip(t.iter()) {
                            *f_ai -= *t_i * n_a;
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
        "assembled traction work of group '{}' for {} realizations",
        record.group(),
        num_realizations
    );
    Ok(())
}

/// Computes the work $\int \vec t \cdot \vec u \, dA$ of a traction per realization.
pub fn compute_external_work<T: Real>(
    displacements: &DMatrix<T>,
    groups: &RealizationGroups<'_, SurfaceElements<T>>,
    record: &TractionRecord<T>,
) -> Result<DVector<T>> {
    let num_realizations = displacements.nrows();
    record.check_num_realizations(num_realizations)?;
    groups.check_batch(num_realizations, displacements.ncols())?;
    let mut work = DVector::zeros(num_realizations);
    let Some(reference) = groups.first() else {
        return Ok(work);
    };

    let mut u_local = vec![T::zero(); 3 * reference.nodes_per_element()];
    for r in 0..num_realizations {
        let group = groups.get(r);
        let reference_element = group.reference();
        for e in 0..group.num_elements() {
            gather(displacements, r, group.element_dofs(e), &mut u_local);
            let quadrature_data = group.element_normals(e).iter().zip(group.element_measures(e));
            for (q, (normal, &measure)) in quadrature_data.enumerate() {
                let u = u_local
                    .chunks_exact(3)
                    .zip(reference_element.basis_values(q))
                    .fold(Vector3::zeros(), |u: Vector3<T>, (u_a, &n_a)| {
                        u + Vector3::new(u_a[0], u_a[1], u_a[2]) * n_a
                    });
                work[r] += record.traction(r, normal).dot(&u) * measure;
            }
        }
    }
    Ok(work)
}
