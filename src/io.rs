//! Reading and writing mesh files.
pub mod msh;
