//! Dependency resolution engine: backtracking search over version ranges,
//! extras and group selection, conflict reporting, the resolved dependency
//! graph and lock preferences.

pub mod cache;
pub mod conflict;
pub mod graph;
pub mod resolver;

pub use resolver::{resolve, ResolutionResult, ResolveError, ResolveOptions, Update};
