//! Residual evaluation for a batch of realizations.
use crate::assembly::{
    assemble_internal_work, assemble_traction_work, compute_external_work, compute_internal_energy, TractionRecord,
};
use crate::boundary::DirichletEnforcer;
use crate::config::ProblemConfig;
use crate::dispatch::MeshSet;
use crate::materials::ConstitutiveModel;
use crate::{Error, Real, Result};
use log::{info, warn};
use nalgebra::{DMatrix, DVector};

/// Owns the batched parameter and residual arrays and sequences all assembly steps.
///
/// The parameter array holds one row per realization and one column per global DOF. An external
/// nonlinear solver typically alternates [`update_boundary_conditions`](Self::update_boundary_conditions),
/// [`apply_boundary_conditions`](Self::apply_boundary_conditions) and updates of the
/// unconstrained entries followed by [`evaluate_residual_vector`](Self::evaluate_residual_vector).
#[derive(Debug)]
pub struct ResidualOrchestrator<T: Real> {
    meshes: MeshSet<T>,
    field: String,
    num_realizations: usize,
    num_dofs: usize,
    materials: Vec<(String, Box<dyn ConstitutiveModel<T>>)>,
    tractions: Vec<TractionRecord<T>>,
    dirichlet: DirichletEnforcer<T>,
    parameters: DMatrix<T>,
    residual: DMatrix<T>,
    time: T,
}

impl<T: Real> ResidualOrchestrator<T> {
    /// Validates the configuration against the meshes and builds all sub-assemblers.
    ///
    /// Parameters start at zero, and boundary conditions and tractions are evaluated at time zero.
    pub fn new(meshes: MeshSet<T>, config: &ProblemConfig<T>) -> Result<Self> {
        config.validate()?;
        let num_realizations = config.n_realizations;
        let field = config.field.as_str();
        meshes.validate(num_realizations, field)?;

        let reference_mesh = meshes.reference_mesh();
        let space = reference_mesh
            .field(field)
            .ok_or_else(|| Error::ConfigValidation(format!("field '{}' is not declared in the mesh", field)))?;
        if space.dofs_per_node() != 3 {
            return Err(Error::ConfigValidation(format!(
                "hyperelastic field '{}' must have 3 DOFs per node, but has {}",
                field,
                space.dofs_per_node()
            )));
        }

        let mut materials = Vec::with_capacity(config.materials.len());
        for (group, material_config) in &config.materials {
            if space.volume_group(group).is_none() {
                return Err(Error::PhysicalGroup(format!(
                    "material refers to unknown domain group '{}'",
                    group
                )));
            }
            materials.push((group.clone(), material_config.build(num_realizations)?));
        }
        for group in space.domain().keys() {
            if !config.materials.contains_key(group) {
                warn!("domain group '{}' has no material and does not contribute to the residual", group);
            }
        }

        let mut tractions = Vec::with_capacity(config.tractions.len());
        for (group, traction_config) in &config.tractions {
            if space.surface_group(group).is_none() {
                return Err(Error::PhysicalGroup(format!(
                    "traction refers to unknown boundary group '{}'",
                    group
                )));
            }
            tractions.push(TractionRecord::from_config(group, traction_config, num_realizations)?);
        }

        let dirichlet = DirichletEnforcer::from_configs(&config.boundary_conditions, &meshes, num_realizations)?;

        let num_dofs = meshes.num_dofs();
        info!(
            "residual orchestrator for field '{}': {} realizations, {} DOFs, {} materials, {} tractions, {} Dirichlet conditions",
            field,
            num_realizations,
            num_dofs,
            materials.len(),
            tractions.len(),
            dirichlet.conditions().len()
        );

        Ok(Self {
            field: field.to_string(),
            meshes,
            num_realizations,
            num_dofs,
            materials,
            tractions,
            dirichlet,
            parameters: DMatrix::zeros(num_realizations, num_dofs),
            residual: DMatrix::zeros(num_realizations, num_dofs),
            time: T::zero(),
        })
    }

    pub fn meshes(&self) -> &MeshSet<T> {
        &self.meshes
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn num_realizations(&self) -> usize {
        self.num_realizations
    }

    pub fn num_dofs(&self) -> usize {
        self.num_dofs
    }

    pub fn time(&self) -> T {
        self.time
    }

    pub fn dirichlet(&self) -> &DirichletEnforcer<T> {
        &self.dirichlet
    }

    pub fn tractions(&self) -> &[TractionRecord<T>] {
        &self.tractions
    }

    /// The parameter array, shaped `n_realizations x n_dofs`.
    pub fn parameters(&self) -> &DMatrix<T> {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut DMatrix<T> {
        &mut self.parameters
    }

    /// Replaces the parameter array.
    pub fn set_parameters(&mut self, parameters: DMatrix<T>) -> Result<()> {
        crate::assembly::check_batch_shape(&parameters, self.num_realizations, self.num_dofs, "parameter array")?;
        self.parameters = parameters;
        Ok(())
    }

    /// The residual computed by the last call to
    /// [`evaluate_residual_vector`](Self::evaluate_residual_vector).
    pub fn residual(&self) -> &DMatrix<T> {
        &self.residual
    }

    /// Zeros the residual and accumulates internal work of all domain groups with a material,
    /// followed by the traction work of all boundary groups with a traction.
    ///
    /// Entries at constrained DOFs are not modified; see
    /// [`constrained_dofs`](Self::constrained_dofs).
    pub fn evaluate_residual_vector(&mut self) -> Result<&DMatrix<T>> {
        crate::assembly::check_batch_shape(&self.parameters, self.num_realizations, self.num_dofs, "parameter array")?;
        self.residual.fill(T::zero());

        for (group, material) in &self.materials {
            let groups = self
                .meshes
                .volume_groups(&self.field, group)
                .ok_or_else(|| Error::PhysicalGroup(format!("unknown domain group '{}'", group)))?;
            assemble_internal_work(&mut self.residual, &self.parameters, &groups, material.as_ref())?;
        }
        for record in &self.tractions {
            let groups = self
                .meshes
                .surface_groups(&self.field, record.group())
                .ok_or_else(|| Error::PhysicalGroup(format!("unknown boundary group '{}'", record.group())))?;
            assemble_traction_work(&mut self.residual, &groups, record)?;
        }
        Ok(&self.residual)
    }

    /// Total potential energy per realization: stored energy minus the work of all tractions.
    ///
    /// The residual is the gradient of this energy with respect to the parameters.
    pub fn evaluate_total_energy(&self) -> Result<DVector<T>> {
        let mut energy = DVector::zeros(self.num_realizations);
        for (group, material) in &self.materials {
            let groups = self
                .meshes
                .volume_groups(&self.field, group)
                .ok_or_else(|| Error::PhysicalGroup(format!("unknown domain group '{}'", group)))?;
            energy += compute_internal_energy(&self.parameters, &groups, material.as_ref())?;
        }
        for record in &self.tractions {
            let groups = self
                .meshes
                .surface_groups(&self.field, record.group())
                .ok_or_else(|| Error::PhysicalGroup(format!("unknown boundary group '{}'", record.group())))?;
            energy -= compute_external_work(&self.parameters, &groups, record)?;
        }
        Ok(energy)
    }

    /// Advances Dirichlet values and traction scales to the given time.
    pub fn update_boundary_conditions(&mut self, time: T) {
        self.time = time;
        self.dirichlet.update_load_curve(time);
        for record in &mut self.tractions {
            record.update_load_curve(time);
        }
    }

    /// Overwrites constrained entries of the parameter array with the current prescribed values.
    pub fn apply_boundary_conditions(&mut self) {
        self.dirichlet.apply_boundary_conditions(&mut self.parameters);
    }

    /// All `(realization, dof)` positions prescribed by Dirichlet conditions.
    pub fn constrained_dofs(&self) -> Vec<(usize, usize)> {
        self.dirichlet.constrained_dofs()
    }
}
