//! The row source contract.
//!
//! The engine is responsible for the correctness of the request it builds and
//! the interpretation of the rows it gets back; everything about physical
//! retrieval lives behind this trait. The row source is trusted to honor the
//! planned join and existence semantics and to report nulls faithfully.

use std::collections::HashMap;

use crate::model::Value;
use crate::planner::ExecutionRequest;
use crate::semantic::AggregateResult;

/// One group's raw contribution: the group-key tuple and, per aggregate
/// source name, the already-fanned, pre-filtered value list. Null entries in
/// a list are contributed nulls (a null base attribute, or a per-row
/// calculation with a null operand) and are elided by the accumulators.
#[derive(Debug, Clone)]
pub struct GroupRows {
    pub key: Vec<Value>,
    pub sources: HashMap<String, Vec<Value>>,
}

pub trait RowSource {
    fn execute(&self, request: &ExecutionRequest) -> AggregateResult<Vec<GroupRows>>;
}
