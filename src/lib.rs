//! # Tally
//!
//! A grouped-aggregation engine over an entity data model.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        AggregateQuery (group-bys, aggregates, having)    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [semantic: graph + path resolver]
//! ┌─────────────────────────────────────────────────────────┐
//! │     Join/multiplicity plan (fan-out contexts,            │
//! │     existence checks, residual predicate)                │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [chunking of oversized in-lists]
//! ┌─────────────────────────────────────────────────────────┐
//! │        ExecutionRequest(s) → RowSource backend           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [accumulate / merge / having]
//! ┌─────────────────────────────────────────────────────────┐
//! │             AggregateList (re-sortable rows)             │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The `model` module holds the declarative request vocabulary, `semantic`
//! validates it against the entity graph, `planner` decides how each to-many
//! relationship path participates, and `engine` reduces what the row source
//! returns.

pub mod engine;
pub mod model;
pub mod planner;
pub mod semantic;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::engine::{
        AggregateList, AggregateQuery, AggregateRow, Dataset, MemoryRowSource, RowSource,
    };
    pub use crate::model::{
        AggregateFunction, AttributeKind, Catalog, CompareOp, EntitySchema, Expr, Having,
        Predicate, Value,
    };
    pub use crate::semantic::{AggregateError, AggregateResult};
}

pub use engine::{AggregateList, AggregateQuery, AggregateRow};
pub use model::{AggregateFunction, Catalog, EntitySchema, Expr, Having, Predicate, Value};
pub use semantic::{AggregateError, AggregateResult};
