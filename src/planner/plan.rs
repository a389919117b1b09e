//! Execution request types produced by the join/multiplicity planner.

use serde::Serialize;

use crate::model::{AggregateFunction, AttributeKind, CompareOp, Expr, Predicate, Value};
use crate::semantic::ResolvedPath;

/// One independent fan-out join.
///
/// Each context fans the root row out into one row per related entity and is
/// joined back to the group key only, never to another context, so two
/// distinct to-many paths cannot cross-multiply.
#[derive(Debug, Clone, Serialize)]
pub struct JoinContext {
    pub path: ResolvedPath,
    /// Filter applied to the fanned rows before they feed any aggregate of
    /// this context. Set when the same to-many path is used as both filter
    /// and aggregation source.
    pub pre_filter: Option<Predicate>,
}

/// A correlated existence check: the root row is retained iff at least one
/// related row satisfies the condition. Never alters the multiplicity of any
/// fan-out context.
#[derive(Debug, Clone, Serialize)]
pub struct ExistenceCheck {
    pub path: ResolvedPath,
    /// Condition with expressions relative to the path's target entity.
    pub condition: Predicate,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupBySpec {
    pub name: String,
    /// Expression relative to the context's target entity, or to the root
    /// when `context` is `None`.
    pub expr: Expr,
    /// Index into [`ExecutionRequest::contexts`] when the group-by key fans
    /// out over a to-many path.
    pub context: Option<usize>,
    pub kind: AttributeKind,
}

/// One aggregate value source to fetch per group.
///
/// Shadow sources back having comparisons whose aggregate expression is not
/// selected for output; they are fetched and reduced but never appear on a
/// result row.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSpec {
    pub name: String,
    pub function: AggregateFunction,
    /// Expression relative to the context's target entity, or to the root
    /// when `context` is `None`.
    pub expr: Expr,
    /// Index into [`ExecutionRequest::contexts`].
    pub context: Option<usize>,
    /// Result kind of the full source expression, fixed at plan time.
    pub kind: AttributeKind,
    pub shadow: bool,
}

/// The immutable request handed to a row source.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRequest {
    pub root: String,
    /// Residual base predicate: everything that was not promoted into a
    /// pre-aggregation filter or a separate existence check.
    pub predicate: Predicate,
    pub existence_checks: Vec<ExistenceCheck>,
    pub contexts: Vec<JoinContext>,
    pub group_bys: Vec<GroupBySpec>,
    pub sources: Vec<SourceSpec>,
}

impl ExecutionRequest {
    /// Render the plan as pretty JSON for diagnostics.
    pub fn explain(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// A having tree with every comparison bound to a source name.
#[derive(Debug, Clone)]
pub enum BoundHaving {
    Compare {
        source: String,
        function: AggregateFunction,
        op: CompareOp,
        value: Value,
    },
    And(Box<BoundHaving>, Box<BoundHaving>),
    Or(Box<BoundHaving>, Box<BoundHaving>),
}

/// Planner output: the row-source request plus the bound having filter.
#[derive(Debug, Clone)]
pub struct PlannedQuery {
    pub request: ExecutionRequest,
    pub having: Option<BoundHaving>,
}
