//! Semantic layer: the unified error type and the entity relationship graph
//! with its path resolver.

pub mod error;
pub mod graph;

pub use error::{AggregateError, AggregateResult};
pub use graph::{EntityGraph, RelationshipStep, ResolvedPath};
