//! Hyperelastic constitutive models evaluated on batched deformation gradient fields.
use crate::field::{ScalarField, TensorField};
use crate::{Error, Real, Result};
use nalgebra::{Matrix3, Scalar};
use numeric_literals::replace_float_literals;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LameParameters<T> {
    pub mu: T,
    pub lambda: T,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YoungPoisson<T> {
    pub young: T,
    pub poisson: T,
}

impl<T> From<YoungPoisson<T>> for LameParameters<T>
where
    T: Real,
{
    #[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
    fn from(params: YoungPoisson<T>) -> Self {
        let YoungPoisson { young, poisson } = params;
        let mu = 0.5 * young / (1.0 + poisson);
        let lambda = 2.0 * mu * poisson / (1.0 - 2.0 * poisson);
        Self { mu, lambda }
    }
}

/// Lamé parameters shared by all realizations or given per realization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MaterialParameters<T: Scalar> {
    Uniform(LameParameters<T>),
    PerRealization(Vec<LameParameters<T>>),
}

impl<T: Real> MaterialParameters<T> {
    /// Converts Young's modulus and Poisson ratio pairs, one per realization.
    pub fn from_young_poisson_per_realization(params: &[YoungPoisson<T>]) -> Self {
        Self::PerRealization(params.iter().copied().map(LameParameters::from).collect())
    }

    /// # Panics
    ///
    /// Panics if the parameters are given per realization and the index is out of bounds.
    pub fn for_realization(&self, realization: usize) -> LameParameters<T> {
        match self {
            Self::Uniform(params) => *params,
            Self::PerRealization(params) => params[realization],
        }
    }

    /// The number of realizations the parameters are given for, or `None` if uniform.
    pub fn num_realizations(&self) -> Option<usize> {
        match self {
            Self::Uniform(_) => None,
            Self::PerRealization(params) => Some(params.len()),
        }
    }

    /// Checks that the parameters can be used with the given number of realizations.
    pub fn check_num_realizations(&self, num_realizations: usize) -> Result<()> {
        match self.num_realizations() {
            Some(n) if n != num_realizations => Err(Error::RealizationConsistency(format!(
                "material parameters are given for {} realizations, but there are {} realizations",
                n, num_realizations
            ))),
            _ => Ok(()),
        }
    }
}

impl<T: Scalar> From<LameParameters<T>> for MaterialParameters<T> {
    fn from(params: LameParameters<T>) -> Self {
        Self::Uniform(params)
    }
}

impl<T: Real> From<YoungPoisson<T>> for MaterialParameters<T> {
    fn from(params: YoungPoisson<T>) -> Self {
        Self::Uniform(params.into())
    }
}

impl<T: Scalar> From<Vec<LameParameters<T>>> for MaterialParameters<T> {
    fn from(params: Vec<LameParameters<T>>) -> Self {
        Self::PerRealization(params)
    }
}

/// A hyperelastic material with parameters for a batch of realizations.
///
/// Implementors provide the energy density and first Piola-Kirchhoff stress at a single point.
/// The batched methods evaluate these for every realization, element and quadrature point of a
/// deformation gradient field.
pub trait ConstitutiveModel<T: Real>: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn parameters(&self) -> &MaterialParameters<T>;

    /// Compute the energy density $\psi = \psi(\vec F)$.
    fn compute_energy_density(&self, deformation_gradient: &Matrix3<T>, parameters: &LameParameters<T>) -> T;

    /// Compute the first Piola-Kirchhoff stress tensor $\vec P = \vec P(\vec F)$.
    fn compute_stress_tensor(&self, deformation_gradient: &Matrix3<T>, parameters: &LameParameters<T>) -> Matrix3<T>;

    /// Energy densities for a batched deformation gradient field.
    fn strain_energy(&self, deformation_gradients: &TensorField<T>) -> Result<ScalarField<T>> {
        let parameters = self.parameters();
        parameters.check_num_realizations(deformation_gradients.num_realizations())?;
        let mut energy = ScalarField::from_element(
            deformation_gradients.num_realizations(),
            deformation_gradients.num_elements(),
            deformation_gradients.num_quadrature_points(),
            T::zero(),
        );
        let chunk_size = deformation_gradients.realization_len().max(1);
        energy
            .as_mut_slice()
            .par_chunks_mut(chunk_size)
            .zip(deformation_gradients.as_slice().par_chunks(chunk_size))
            .enumerate()
            .for_each(|(r, (psi, f))| {
                let lame = parameters.for_realization(r);
                for (psi, f) in psi.iter_mut().zip(f) {
                    *psi = self.compute_energy_density(f, &lame);
                }
            });
        Ok(energy)
    }

    /// First Piola-Kirchhoff stresses for a batched deformation gradient field.
    fn first_piola_kirchhoff(&self, deformation_gradients: &TensorField<T>) -> Result<TensorField<T>> {
        let parameters = self.parameters();
        parameters.check_num_realizations(deformation_gradients.num_realizations())?;
        let mut stress = TensorField::from_element(
            deformation_gradients.num_realizations(),
            deformation_gradients.num_elements(),
            deformation_gradients.num_quadrature_points(),
            Matrix3::zeros(),
        );
        let chunk_size = deformation_gradients.realization_len().max(1);
        stress
            .as_mut_slice()
            .par_chunks_mut(chunk_size)
            .zip(deformation_gradients.as_slice().par_chunks(chunk_size))
            .enumerate()
            .for_each(|(r, (p, f))| {
                let lame = parameters.for_realization(r);
                for (p, f) in p.iter_mut().zip(f) {
                    *p = self.compute_stress_tensor(f, &lame);
                }
            });
        Ok(stress)
    }
}

/// Cofactor matrix $\operatorname{cof}(\vec F) = (\det \vec F) \vec F^{-T}$.
fn cofactor<T: Real>(matrix: &Matrix3<T>) -> Matrix3<T> {
    let (c0, c1, c2) = (matrix.column(0), matrix.column(1), matrix.column(2));
    Matrix3::from_columns(&[c1.cross(&c2), c2.cross(&c0), c0.cross(&c1)])
}

/// The compressible Neo-Hookean material model.
///
/// The strain energy density is given by
/// $$
/// \psi(\vec F) = \frac{\mu}{2}(I_C - 3) - \mu \log J + \frac{\lambda}{2}(\log J)^2,
/// $$
/// where $J = \det \vec F$ and $I_C = \tr{\vec F^T \vec F}$. The stress tensor is
/// $$
/// \vec P(\vec F) = \mu (\vec F - \vec F^{-T}) + \lambda \log J \vec F^{-T}.
/// $$
/// Deformation gradients with $J \leq 0$ produce non-finite values.
#[derive(Clone, Debug, PartialEq)]
pub struct NeoHookean<T: Scalar> {
    parameters: MaterialParameters<T>,
}

impl<T: Real> NeoHookean<T> {
    pub fn new(parameters: impl Into<MaterialParameters<T>>) -> Self {
        Self {
            parameters: parameters.into(),
        }
    }
}

#[allow(non_snake_case)]
#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
impl<T: Real> ConstitutiveModel<T> for NeoHookean<T> {
    fn name(&self) -> &'static str {
        "NeoHookean"
    }

    fn parameters(&self) -> &MaterialParameters<T> {
        &self.parameters
    }

    fn compute_energy_density(&self, deformation_gradient: &Matrix3<T>, parameters: &LameParameters<T>) -> T {
        let &LameParameters { mu, lambda } = parameters;
        let F = deformation_gradient;
        let log_J = F.determinant().ln();
        let I_C = F.norm_squared();
        0.5 * mu * (I_C - 3.0) - mu * log_J + 0.5 * lambda * log_J * log_J
    }

    fn compute_stress_tensor(&self, deformation_gradient: &Matrix3<T>, parameters: &LameParameters<T>) -> Matrix3<T> {
        let &LameParameters { mu, lambda } = parameters;
        let F = deformation_gradient;
        let J = F.determinant();
        let F_inv_T = cofactor(F) / J;
        (F - F_inv_T) * mu + F_inv_T * (lambda * J.ln())
    }
}

/// The Saint Venant-Kirchhoff material model.
///
/// This material model is characterized by the strain energy density
/// $$
/// \psi(\vec F) = \mu \vec E : \vec E + \frac{\lambda}{2} \operatorname{tr}^2(\vec E)
/// $$
/// where $\vec E = \frac{1}{2} \left( \vec F^T \vec F - \vec I \right)$ is the Green strain
/// tensor. The stress tensor is
/// $$
/// \vec P(\vec F) = \vec F (2 \mu \vec E + \lambda \tr{E} \vec I).
/// $$
#[derive(Clone, Debug, PartialEq)]
pub struct StVenantKirchhoff<T: Scalar> {
    parameters: MaterialParameters<T>,
}

impl<T: Real> StVenantKirchhoff<T> {
    pub fn new(parameters: impl Into<MaterialParameters<T>>) -> Self {
        Self {
            parameters: parameters.into(),
        }
    }
}

#[allow(non_snake_case)]
#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
fn green_strain_tensor<T: Real>(deformation_gradient: &Matrix3<T>) -> Matrix3<T> {
    let F = deformation_gradient;
    (F.transpose() * F - Matrix3::identity()) * 0.5
}

#[allow(non_snake_case)]
#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
impl<T: Real> ConstitutiveModel<T> for StVenantKirchhoff<T> {
    fn name(&self) -> &'static str {
        "StVenantKirchhoff"
    }

    fn parameters(&self) -> &MaterialParameters<T> {
        &self.parameters
    }

    fn compute_energy_density(&self, deformation_gradient: &Matrix3<T>, parameters: &LameParameters<T>) -> T {
        let &LameParameters { mu, lambda } = parameters;
        let E = green_strain_tensor(deformation_gradient);
        mu * E.dot(&E) + 0.5 * lambda * E.trace().powi(2)
    }

    fn compute_stress_tensor(&self, deformation_gradient: &Matrix3<T>, parameters: &LameParameters<T>) -> Matrix3<T> {
        let &LameParameters { mu, lambda } = parameters;
        let F = deformation_gradient;
        let E = green_strain_tensor(deformation_gradient);
        F * &E * (2.0 * mu) + F * (lambda * E.trace())
    }
}

/// The linear elastic material model.
///
/// The strain energy density is
/// $$
/// \psi(\vec F) = \mu \vec \epsilon : \vec \epsilon + \frac{\lambda}{2} \operatorname{tr}^2(\vec \epsilon),
/// $$
/// where $\vec \epsilon = \frac{1}{2}(\vec F + \vec F^T) - \vec I$ is the infinitesimal strain
/// tensor, and the stress is $\vec P = 2 \mu \vec \epsilon + \lambda \operatorname{tr}(\vec \epsilon) \vec I$.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearElastic<T: Scalar> {
    parameters: MaterialParameters<T>,
}

impl<T: Real> LinearElastic<T> {
    pub fn new(parameters: impl Into<MaterialParameters<T>>) -> Self {
        Self {
            parameters: parameters.into(),
        }
    }
}

fn infinitesimal_strain_tensor<T: Real>(deformation_gradient: &Matrix3<T>) -> Matrix3<T> {
    deformation_gradient.symmetric_part() - Matrix3::identity()
}

#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
impl<T: Real> ConstitutiveModel<T> for LinearElastic<T> {
    fn name(&self) -> &'static str {
        "LinearElastic"
    }

    fn parameters(&self) -> &MaterialParameters<T> {
        &self.parameters
    }

    fn compute_energy_density(&self, deformation_gradient: &Matrix3<T>, parameters: &LameParameters<T>) -> T {
        let &LameParameters { mu, lambda } = parameters;
        let eps = infinitesimal_strain_tensor(deformation_gradient);
        mu * eps.dot(&eps) + 0.5 * lambda * eps.trace().powi(2)
    }

    fn compute_stress_tensor(&self, deformation_gradient: &Matrix3<T>, parameters: &LameParameters<T>) -> Matrix3<T> {
        let &LameParameters { mu, lambda } = parameters;
        let eps = infinitesimal_strain_tensor(deformation_gradient);
        eps * (2.0 * mu) + Matrix3::from_diagonal_element(lambda * eps.trace())
    }
}
