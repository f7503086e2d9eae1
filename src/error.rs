//! Error types.
use std::error;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Library-wide error type.
///
/// All errors are raised while reading input or constructing data structures. Once an
/// [`ResidualOrchestrator`](crate::orchestrator::ResidualOrchestrator) has been built, evaluation
/// only fails if its inputs are modified into an inconsistent state.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// The mesh file is malformed or uses an unsupported format version.
    MeshFormat(String),
    /// An element type is unknown, unsupported in the current context or has too few nodes.
    ElementType(String),
    /// A physical group is unknown, duplicated or inconsistent.
    PhysicalGroup(String),
    /// Data along the realization axis is inconsistent.
    RealizationConsistency(String),
    /// Configuration data is missing, malformed or refers to something that does not exist.
    ConfigValidation(String),
    /// An element has a singular reference-to-physical Jacobian.
    DegenerateElement { group: String, element: usize },
    /// Reading input failed.
    Io(std::io::Error),
}

/// Convenience alias for results with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MeshFormat(msg) => write!(f, "mesh format error: {}", msg),
            Self::ElementType(msg) => write!(f, "element type error: {}", msg),
            Self::PhysicalGroup(msg) => write!(f, "physical group error: {}", msg),
            Self::RealizationConsistency(msg) => write!(f, "realization consistency error: {}", msg),
            Self::ConfigValidation(msg) => write!(f, "configuration error: {}", msg),
            Self::DegenerateElement { group, element } => {
                write!(
                    f,
                    "element {} in physical group '{}' has a singular reference Jacobian",
                    element, group
                )
            }
            Self::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<hyperbatch_quadrature::Error> for Error {
    fn from(err: hyperbatch_quadrature::Error) -> Self {
        Self::ElementType(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigValidation(err.to_string())
    }
}
