//! Batched residual assembly for nonlinear hyperelastic finite element problems.
//!
//! A single mesh topology is shared by a number of *realizations*: independent boundary value
//! problems that differ in material parameters, loads or nodal reference coordinates. Global
//! parameter and residual arrays are stored as `n_realizations x n_dofs` matrices, and every
//! assembly routine works across the whole batch at once.
//!
//! The typical pipeline is
//!
//! 1. parse a Gmsh MSH file with [`io::msh`] into a [`mesh::ParsedMesh`],
//! 2. number degrees of freedom and build element data with [`dispatch::MeshData`],
//! 3. construct a [`orchestrator::ResidualOrchestrator`] from a [`config::ProblemConfig`],
//! 4. apply Dirichlet conditions and evaluate the residual inside an external nonlinear solver.
use nalgebra::RealField;

pub mod assembly;
pub mod boundary;
pub mod config;
pub mod dispatch;
pub mod dofs;
pub mod element;
pub mod error;
pub mod field;
pub mod io;
pub mod load_curve;
pub mod materials;
pub mod mesh;
pub mod orchestrator;
pub mod procedural;
pub mod quadrature;

#[cfg(feature = "proptest")]
pub mod proptest;

pub extern crate nalgebra;

pub use error::{Error, Result};

/// Scalar type used throughout the crate.
pub trait Real: RealField + Copy + Send + Sync {}

impl<T> Real for T where T: RealField + Copy + Send + Sync {}
