//! Dirichlet boundary conditions on the batched parameter array.
use crate::assembly::scatter::scatter_overwrite;
use crate::config::BoundaryConditionConfig;
use crate::dispatch::MeshSet;
use crate::load_curve::LoadCurve;
use crate::{Error, Real, Result};
use itertools::Itertools;
use log::debug;
use nalgebra::DMatrix;
use std::collections::BTreeMap;

/// Prescribed values for a set of `(realization, dof)` positions of the parameter array.
#[derive(Clone, Debug, PartialEq)]
pub struct DirichletBoundaryCondition<T: Real> {
    group: String,
    field: String,
    components: Vec<usize>,
    load_curve: LoadCurve,
    end_time: T,
    positions: Vec<(usize, usize)>,
    targets: Vec<T>,
    values: Vec<T>,
}

impl<T: Real> DirichletBoundaryCondition<T> {
    /// Resolves the degrees of freedom of a boundary group and builds the condition.
    ///
    /// Positions are ordered by realization, then by node index, then by component. Values given
    /// per realization belong to the realizations in the order they are listed.
    pub fn new(
        group: &str,
        config: &BoundaryConditionConfig<T>,
        meshes: &MeshSet<T>,
        num_realizations: usize,
    ) -> Result<Self> {
        let field = config.field();
        let space = meshes.reference_mesh().field(field).ok_or_else(|| {
            Error::ConfigValidation(format!(
                "boundary condition of group '{}' refers to undeclared field '{}'",
                group, field
            ))
        })?;
        let elements = space.surface_group(group).ok_or_else(|| {
            Error::PhysicalGroup(format!("boundary condition refers to unknown boundary group '{}'", group))
        })?;
        let dofs_per_node = space.dofs_per_node();

        let (components, end_values, end_time, load_curve) = match config {
            BoundaryConditionConfig::FixedSupportDirichletBC { .. } => {
                ((0..dofs_per_node).collect(), None, T::one(), LoadCurve::Constant)
            }
            BoundaryConditionConfig::FixedComponentsDirichletBC { components, .. } => {
                (components.clone(), None, T::one(), LoadCurve::Constant)
            }
            BoundaryConditionConfig::PrescribedDisplacementDirichletBC {
                components,
                values,
                end_time,
                load_curve,
                ..
            } => (
                components.clone(),
                Some(values),
                *end_time,
                load_curve.unwrap_or(LoadCurve::Linear),
            ),
        };

        if let Some(&c) = components.iter().find(|&&c| c >= dofs_per_node) {
            return Err(Error::ConfigValidation(format!(
                "boundary condition of group '{}' constrains component {}, but field '{}' has {} components",
                group, c, field, dofs_per_node
            )));
        }
        if components.iter().duplicates().next().is_some() {
            return Err(Error::ConfigValidation(format!(
                "boundary condition of group '{}' lists a component more than once",
                group
            )));
        }
        if end_time <= T::zero() {
            return Err(Error::ConfigValidation(format!(
                "boundary condition of group '{}' must have a positive end_time",
                group
            )));
        }

        let realizations: Vec<usize> = config
            .realizations()
            .map_or_else(|| (0..num_realizations).collect(), <[usize]>::to_vec);
        if realizations.iter().duplicates().next().is_some() {
            return Err(Error::ConfigValidation(format!(
                "boundary condition of group '{}' lists a realization more than once",
                group
            )));
        }
        if let Some(&r) = realizations.iter().find(|&&r| r >= num_realizations) {
            return Err(Error::RealizationConsistency(format!(
                "boundary condition of group '{}' refers to realization {}, but there are only {} realizations",
                group, r, num_realizations
            )));
        }

        let end_values: Vec<Vec<T>> = match end_values {
            None => vec![vec![T::zero(); components.len()]; realizations.len()],
            Some(values) => values.expand(realizations.len(), "prescribed displacement")?,
        };
        if let Some(values) = end_values.iter().find(|values| values.len() != components.len()) {
            return Err(Error::ConfigValidation(format!(
                "boundary condition of group '{}' prescribes {} values for {} components",
                group,
                values.len(),
                components.len()
            )));
        }

        let nodes: Vec<usize> = (0..elements.num_elements())
            .flat_map(|e| elements.element_nodes(e).iter().copied())
            .sorted_unstable()
            .dedup()
            .collect();
        let mut node_dofs = Vec::with_capacity(nodes.len() * components.len());
        for &node in &nodes {
            let dofs = space.dof_map().node_dofs(node).ok_or_else(|| {
                Error::PhysicalGroup(format!(
                    "boundary group '{}' contains node {} without degrees of freedom",
                    group, node
                ))
            })?;
            node_dofs.extend(components.iter().map(|&c| dofs[c]));
        }

        let mut selected: Vec<(usize, Vec<T>)> = realizations.into_iter().zip(end_values).collect();
        selected.sort_unstable_by_key(|(r, _)| *r);

        let mut positions = Vec::with_capacity(selected.len() * node_dofs.len());
        let mut targets = Vec::with_capacity(selected.len() * node_dofs.len());
        for (r, values) in &selected {
            for dofs in node_dofs.chunks_exact(components.len().max(1)) {
                for (&dof, &value) in dofs.iter().zip(values) {
                    positions.push((*r, dof));
                    targets.push(value);
                }
            }
        }
        debug!(
            "Dirichlet condition on group '{}' constrains {} DOFs in {} realizations",
            group,
            node_dofs.len(),
            selected.len()
        );

        let mut condition = Self {
            group: group.to_string(),
            field: field.to_string(),
            components,
            load_curve,
            end_time,
            values: vec![T::zero(); targets.len()],
            positions,
            targets,
        };
        condition.update_load_curve(T::zero());
        Ok(condition)
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn components(&self) -> &[usize] {
        &self.components
    }

    /// The constrained `(realization, dof)` positions.
    pub fn positions(&self) -> &[(usize, usize)] {
        &self.positions
    }

    /// The values currently prescribed at [`positions`](Self::positions).
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Recomputes the prescribed values for the given time.
    pub fn update_load_curve(&mut self, time: T) {
        let factor = self.load_curve.factor(time, self.end_time);
        for (value, &target) in self.values.iter_mut().zip(&self.targets) {
            *value = target * factor;
        }
    }

    /// Overwrites the constrained entries of the parameter array.
    pub fn apply(&self, parameters: &mut DMatrix<T>) {
        scatter_overwrite(parameters, &self.positions, &self.values);
    }
}

/// Enforces a collection of Dirichlet boundary conditions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DirichletEnforcer<T: Real> {
    conditions: Vec<DirichletBoundaryCondition<T>>,
}

impl<T: Real> DirichletEnforcer<T> {
    /// Builds conditions in order of group name.
    pub fn from_configs(
        configs: &BTreeMap<String, BoundaryConditionConfig<T>>,
        meshes: &MeshSet<T>,
        num_realizations: usize,
    ) -> Result<Self> {
        let conditions = configs
            .iter()
            .map(|(group, config)| DirichletBoundaryCondition::new(group, config, meshes, num_realizations))
            .collect::<Result<_>>()?;
        Ok(Self { conditions })
    }

    pub fn conditions(&self) -> &[DirichletBoundaryCondition<T>] {
        &self.conditions
    }

    pub fn update_load_curve(&mut self, time: T) {
        for condition in &mut self.conditions {
            condition.update_load_curve(time);
        }
    }

    /// Overwrites all constrained entries. Later conditions take precedence where conditions
    /// overlap.
    pub fn apply_boundary_conditions(&self, parameters: &mut DMatrix<T>) {
        for condition in &self.conditions {
            condition.apply(parameters);
        }
    }

    /// All constrained `(realization, dof)` positions, sorted and without duplicates.
    pub fn constrained_dofs(&self) -> Vec<(usize, usize)> {
        self.conditions
            .iter()
            .flat_map(|condition| condition.positions().iter().copied())
            .sorted_unstable()
            .dedup()
            .collect()
    }
}
