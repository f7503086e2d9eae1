//! Problem configuration.
//!
//! A [`ProblemConfig`] declares the fields of the mesh, the hyperelastic field whose residual is
//! assembled, and the materials, Dirichlet boundary conditions and tractions per physical group.
//! All types can be deserialized, e.g. from JSON:
//!
//! ```json
//! {
//!     "n_realizations": 2,
//!     "field": "u",
//!     "fields": { "u": { "dofs_per_node": 3, "element_type": "Tet4" } },
//!     "materials": { "domain": { "model": "NeoHookean", "young": [1e6, 2e6], "poisson": 0.3 } },
//!     "boundary_conditions": { "x_min": { "case": "FixedSupportDirichletBC", "field": "u" } },
//!     "tractions": { "x_max": { "case": "ConstantTraction", "traction": [0.0, 0.0, -10.0] } }
//! }
//! ```
use crate::element::ElementType;
use crate::load_curve::LoadCurve;
use crate::materials::{
    ConstitutiveModel, LameParameters, LinearElastic, MaterialParameters, NeoHookean, StVenantKirchhoff, YoungPoisson,
};
use crate::{Error, Real, Result};
use eyre::WrapErr;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// An element type given by name (e.g. `"Tet4"`) or by Gmsh type tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementTypeName {
    Tag(usize),
    Name(String),
}

impl ElementTypeName {
    pub fn resolve(&self) -> Result<ElementType> {
        match self {
            Self::Tag(tag) => ElementType::from_gmsh_tag(*tag)
                .ok_or_else(|| Error::ElementType(format!("unsupported element type tag {}", tag))),
            Self::Name(name) => {
                ElementType::from_name(name).ok_or_else(|| Error::ElementType(format!("unknown element type '{}'", name)))
            }
        }
    }
}

impl From<ElementType> for ElementTypeName {
    fn from(element_type: ElementType) -> Self {
        Self::Name(element_type.name().to_string())
    }
}

/// Declaration of a discretized field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDeclaration {
    pub dofs_per_node: usize,
    pub element_type: ElementTypeName,
    /// Overrides the default quadrature strength of twice the polynomial degree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quadrature_strength: Option<usize>,
}

impl FieldDeclaration {
    pub fn new(dofs_per_node: usize, element_type: ElementType) -> Self {
        Self {
            dofs_per_node,
            element_type: element_type.into(),
            quadrature_strength: None,
        }
    }

    pub fn with_quadrature_strength(self, strength: usize) -> Self {
        Self {
            quadrature_strength: Some(strength),
            ..self
        }
    }

    pub fn element_type(&self) -> Result<ElementType> {
        self.element_type.resolve()
    }

    pub fn quadrature_strength_for(&self, element_type: ElementType) -> usize {
        self.quadrature_strength
            .unwrap_or(2 * element_type.polynomial_degree())
    }
}

/// A value shared by all realizations or given once per realization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValues<T> {
    Uniform(T),
    PerRealization(Vec<T>),
}

impl<T: Clone> ParameterValues<T> {
    /// Checks that per-realization values match the given number of realizations.
    pub fn check_len(&self, num_realizations: usize, what: &str) -> Result<()> {
        match self {
            Self::PerRealization(values) if values.len() != num_realizations => {
                Err(Error::RealizationConsistency(format!(
                    "{} is given for {} realizations, but there are {} realizations",
                    what,
                    values.len(),
                    num_realizations
                )))
            }
            _ => Ok(()),
        }
    }

    /// Expands the values to one value per realization.
    pub fn expand(&self, num_realizations: usize, what: &str) -> Result<Vec<T>> {
        self.check_len(num_realizations, what)?;
        match self {
            Self::Uniform(value) => Ok(vec![value.clone(); num_realizations]),
            Self::PerRealization(values) => Ok(values.clone()),
        }
    }

    pub fn is_uniform(&self) -> bool {
        matches!(self, Self::Uniform(_))
    }
}

impl<T> From<T> for ParameterValues<T> {
    fn from(value: T) -> Self {
        Self::Uniform(value)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialModel {
    NeoHookean,
    StVenantKirchhoff,
    LinearElastic,
}

/// Material of a domain group, given either by Young's modulus and Poisson ratio or by Lamé
/// parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterialConfig<T> {
    pub model: MaterialModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub young: Option<ParameterValues<T>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poisson: Option<ParameterValues<T>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mu: Option<ParameterValues<T>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lambda: Option<ParameterValues<T>>,
}

impl<T: Real> MaterialConfig<T> {
    pub fn young_poisson(model: MaterialModel, young: impl Into<ParameterValues<T>>, poisson: impl Into<ParameterValues<T>>) -> Self {
        Self {
            model,
            young: Some(young.into()),
            poisson: Some(poisson.into()),
            mu: None,
            lambda: None,
        }
    }

    pub fn lame(model: MaterialModel, mu: impl Into<ParameterValues<T>>, lambda: impl Into<ParameterValues<T>>) -> Self {
        Self {
            model,
            young: None,
            poisson: None,
            mu: Some(mu.into()),
            lambda: Some(lambda.into()),
        }
    }

    /// Resolves the Lamé parameters for the given number of realizations.
    pub fn parameters(&self, num_realizations: usize) -> Result<MaterialParameters<T>> {
        let (first, second, young_poisson) = match (&self.young, &self.poisson, &self.mu, &self.lambda) {
            (Some(young), Some(poisson), None, None) => (young, poisson, true),
            (None, None, Some(mu), Some(lambda)) => (mu, lambda, false),
            _ => {
                return Err(Error::ConfigValidation(
                    "material must specify either 'young' and 'poisson' or 'mu' and 'lambda'".to_string(),
                ))
            }
        };
        let to_lame = |a: T, b: T| {
            if young_poisson {
                LameParameters::from(YoungPoisson { young: a, poisson: b })
            } else {
                LameParameters { mu: a, lambda: b }
            }
        };
        match (first, second) {
            (ParameterValues::Uniform(a), ParameterValues::Uniform(b)) => Ok(MaterialParameters::Uniform(to_lame(*a, *b))),
            _ => {
                let first = first.expand(num_realizations, "material parameter")?;
                let second = second.expand(num_realizations, "material parameter")?;
                Ok(MaterialParameters::PerRealization(
                    first.into_iter().zip(second).map(|(a, b)| to_lame(a, b)).collect(),
                ))
            }
        }
    }

    /// Builds the constitutive model for the given number of realizations.
    pub fn build(&self, num_realizations: usize) -> Result<Box<dyn ConstitutiveModel<T>>> {
        let parameters = self.parameters(num_realizations)?;
        Ok(match self.model {
            MaterialModel::NeoHookean => Box::new(NeoHookean::new(parameters)),
            MaterialModel::StVenantKirchhoff => Box::new(StVenantKirchhoff::new(parameters)),
            MaterialModel::LinearElastic => Box::new(LinearElastic::new(parameters)),
        })
    }
}

/// Dirichlet boundary condition of a boundary group.
///
/// `realizations` restricts the condition to a subset of realizations, by default it applies to
/// all of them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "case", deny_unknown_fields)]
pub enum BoundaryConditionConfig<T> {
    /// All components are fixed to zero.
    FixedSupportDirichletBC {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        realizations: Option<Vec<usize>>,
    },
    /// The given components are fixed to zero.
    FixedComponentsDirichletBC {
        field: String,
        components: Vec<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        realizations: Option<Vec<usize>>,
    },
    /// The given components are moved to `values` along a load curve, reaching them at
    /// `end_time`. Values are given once or once per selected realization.
    PrescribedDisplacementDirichletBC {
        field: String,
        components: Vec<usize>,
        values: ParameterValues<Vec<T>>,
        end_time: T,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        load_curve: Option<LoadCurve>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        realizations: Option<Vec<usize>>,
    },
}

impl<T> BoundaryConditionConfig<T> {
    pub fn field(&self) -> &str {
        match self {
            Self::FixedSupportDirichletBC { field, .. }
            | Self::FixedComponentsDirichletBC { field, .. }
            | Self::PrescribedDisplacementDirichletBC { field, .. } => field,
        }
    }

    pub fn realizations(&self) -> Option<&[usize]> {
        match self {
            Self::FixedSupportDirichletBC { realizations, .. }
            | Self::FixedComponentsDirichletBC { realizations, .. }
            | Self::PrescribedDisplacementDirichletBC { realizations, .. } => realizations.as_deref(),
        }
    }
}

/// Traction acting on a boundary group, scaled by a load curve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "case", deny_unknown_fields)]
pub enum TractionConfig<T> {
    /// The same traction vector for all realizations.
    ConstantTraction {
        traction: [T; 3],
        #[serde(default, skip_serializing_if = "Option::is_none")]
        load_curve: Option<LoadCurve>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_time: Option<T>,
    },
    /// One traction vector per realization.
    BatchedTraction {
        tractions: Vec<[T; 3]>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        load_curve: Option<LoadCurve>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_time: Option<T>,
    },
    /// A stress tensor (given row by row) contracted with the outward normal.
    StressTensorTraction {
        stress: [[T; 3]; 3],
        #[serde(default, skip_serializing_if = "Option::is_none")]
        load_curve: Option<LoadCurve>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_time: Option<T>,
    },
    /// A pressure acting against the outward normal.
    PressureTraction {
        pressure: ParameterValues<T>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        load_curve: Option<LoadCurve>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_time: Option<T>,
    },
}

impl<T: Copy> TractionConfig<T> {
    pub fn load_curve(&self) -> LoadCurve {
        match self {
            Self::ConstantTraction { load_curve, .. }
            | Self::BatchedTraction { load_curve, .. }
            | Self::StressTensorTraction { load_curve, .. }
            | Self::PressureTraction { load_curve, .. } => load_curve.unwrap_or_default(),
        }
    }

    pub fn end_time(&self) -> Option<T> {
        match self {
            Self::ConstantTraction { end_time, .. }
            | Self::BatchedTraction { end_time, .. }
            | Self::StressTensorTraction { end_time, .. }
            | Self::PressureTraction { end_time, .. } => *end_time,
        }
    }
}

/// The complete description of a batched hyperelastic problem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProblemConfig<T> {
    pub n_realizations: usize,
    /// The hyperelastic displacement field.
    pub field: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDeclaration>,
    #[serde(default)]
    pub materials: BTreeMap<String, MaterialConfig<T>>,
    #[serde(default)]
    pub boundary_conditions: BTreeMap<String, BoundaryConditionConfig<T>>,
    #[serde(default)]
    pub tractions: BTreeMap<String, TractionConfig<T>>,
}

impl<T: Real> ProblemConfig<T> {
    pub fn new(n_realizations: usize, field: &str, declaration: FieldDeclaration) -> Self {
        Self {
            n_realizations,
            field: field.to_string(),
            fields: [(field.to_string(), declaration)].into_iter().collect(),
            materials: BTreeMap::new(),
            boundary_conditions: BTreeMap::new(),
            tractions: BTreeMap::new(),
        }
    }

    pub fn with_material(mut self, group: &str, material: MaterialConfig<T>) -> Self {
        self.materials.insert(group.to_string(), material);
        self
    }

    pub fn with_boundary_condition(mut self, group: &str, condition: BoundaryConditionConfig<T>) -> Self {
        self.boundary_conditions.insert(group.to_string(), condition);
        self
    }

    pub fn with_traction(mut self, group: &str, traction: TractionConfig<T>) -> Self {
        self.tractions.insert(group.to_string(), traction);
        self
    }

    /// Checks the configuration for consistency without reference to a mesh.
    pub fn validate(&self) -> Result<()> {
        let n = self.n_realizations;
        if n == 0 {
            return Err(Error::ConfigValidation(
                "the number of realizations must be positive".to_string(),
            ));
        }
        if let Some(declaration) = self.fields.get(&self.field) {
            if declaration.dofs_per_node != 3 {
                return Err(Error::ConfigValidation(format!(
                    "hyperelastic field '{}' must have 3 DOFs per node, but has {}",
                    self.field, declaration.dofs_per_node
                )));
            }
        }
        for declaration in self.fields.values() {
            declaration.element_type()?;
        }

        for (group, material) in &self.materials {
            material
                .parameters(n)
                .map_err(|err| prefix_error(err, &format!("material of group '{}'", group)))?;
        }

        for (group, condition) in &self.boundary_conditions {
            let context = format!("boundary condition of group '{}'", group);
            if let Some(realizations) = condition.realizations() {
                if let Some(&r) = realizations.iter().find(|&&r| r >= n) {
                    return Err(Error::RealizationConsistency(format!(
                        "{} refers to realization {}, but there are only {} realizations",
                        context, r, n
                    )));
                }
            }
            if let BoundaryConditionConfig::PrescribedDisplacementDirichletBC {
                components,
                values,
                end_time,
                realizations,
                ..
            } = condition
            {
                if *end_time <= T::zero() {
                    return Err(Error::ConfigValidation(format!("{} must have a positive end_time", context)));
                }
                let num_selected = realizations.as_ref().map_or(n, Vec::len);
                values
                    .check_len(num_selected, "prescribed displacement")
                    .map_err(|err| prefix_error(err, &context))?;
                let value_lists: Vec<&Vec<T>> = match values {
                    ParameterValues::Uniform(v) => vec![v],
                    ParameterValues::PerRealization(vs) => vs.iter().collect(),
                };
                if let Some(v) = value_lists.iter().find(|v| v.len() != components.len()) {
                    return Err(Error::ConfigValidation(format!(
                        "{} prescribes {} values for {} components",
                        context,
                        v.len(),
                        components.len()
                    )));
                }
            }
        }

        for (group, traction) in &self.tractions {
            let context = format!("traction of group '{}'", group);
            if let Some(end_time) = traction.end_time() {
                if end_time <= T::zero() {
                    return Err(Error::ConfigValidation(format!("{} must have a positive end_time", context)));
                }
            }
            match traction {
                TractionConfig::BatchedTraction { tractions, .. } if tractions.len() != n => {
                    return Err(Error::RealizationConsistency(format!(
                        "{} is given for {} realizations, but there are {} realizations",
                        context,
                        tractions.len(),
                        n
                    )));
                }
                TractionConfig::PressureTraction { pressure, .. } => {
                    pressure
                        .check_len(n, "pressure")
                        .map_err(|err| prefix_error(err, &context))?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl<T: Real + Default + DeserializeOwned> ProblemConfig<T> {
    /// Parses and validates a configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(file_path: P) -> eyre::Result<Self> {
        let file_path = file_path.as_ref();
        let json = std::fs::read_to_string(file_path)
            .wrap_err_with(|| format!("failed to read file {}", file_path.display()))?;
        Self::from_json_str(&json).wrap_err("failed to load problem configuration")
    }
}

fn prefix_error(err: Error, context: &str) -> Error {
    match err {
        Error::ConfigValidation(msg) => Error::ConfigValidation(format!("{}: {}", context, msg)),
        Error::RealizationConsistency(msg) => Error::RealizationConsistency(format!("{}: {}", context, msg)),
        other => other,
    }
}
