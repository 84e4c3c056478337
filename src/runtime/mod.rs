//! Runtime system
//!
//! The tagged value model, error/control-flow signalling, the workspace
//! (scopes, procedures, property lists, modules) and the primitive library.

pub mod except;
pub mod primitives;
pub mod value;
pub mod workspace;
