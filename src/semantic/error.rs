//! Unified error type for the aggregation engine.
//!
//! Callers see three families: the request was invalid (construction-time,
//! fail-fast where detectable), a typed accessor was misused against a null
//! or differently-typed value (local, caller-correctable), or the underlying
//! data retrieval failed (aborts the whole request, including all chunks).

use thiserror::Error;

/// Result type for engine operations.
pub type AggregateResult<T> = Result<T, AggregateError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregateError {
    // --- invalid request ---
    #[error("duplicate aggregate attribute name '{0}'")]
    DuplicateAggregateName(String),

    #[error("duplicate group-by name '{0}'")]
    DuplicateGroupByName(String),

    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("unknown attribute '{reference}' on entity '{entity}'")]
    UnknownAttribute { entity: String, reference: String },

    #[error("unknown relationship '{relationship}' on entity '{entity}'")]
    UnknownRelationship { entity: String, relationship: String },

    #[error("expression roots at entity '{found}' but the request roots at '{expected}'")]
    MixedRootEntity { expected: String, found: String },

    /// An order-by or accessor name that is neither a group-by nor an
    /// aggregate attribute of the request.
    #[error("no group-by or aggregate attribute named '{0}'")]
    UnknownRequestName(String),

    #[error("cyclic relationship path: {}", .0.join(" -> "))]
    CyclicPath(Vec<String>),

    #[error("expression is not numeric: {0}")]
    NotNumeric(String),

    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    /// A to-many traversal may only wrap the whole aggregate source
    /// expression; fanning out inside an arithmetic operand is ill-defined.
    #[error("to-many traversal nested inside a calculation: {0}")]
    NestedToMany(String),

    // --- accessor misuse ---
    #[error("attribute '{0}' is null; use the object accessor")]
    NullPrimitiveAccess(String),

    #[error("attribute '{name}' holds a {found} value, not {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    // --- execution ---
    #[error("row source failure: {0}")]
    Execution(String),
}
