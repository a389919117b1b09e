//! Aggregate functions and the having predicate tree.

use serde::{Deserialize, Serialize};

use super::expr::Expr;
use super::predicate::CompareOp;
use super::value::Value;

/// The reducing functions an aggregate attribute can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunction {
    Count,
    Sum,
    Min,
    Max,
    Avg,
    VarianceSample,
    VariancePopulation,
    StdDevSample,
    StdDevPopulation,
}

impl AggregateFunction {
    /// Sum, average and the dispersion functions need a numeric source;
    /// count/min/max take any kind.
    pub fn requires_numeric(self) -> bool {
        !matches!(
            self,
            AggregateFunction::Count | AggregateFunction::Min | AggregateFunction::Max
        )
    }
}

/// A post-aggregation boolean predicate.
///
/// Built by explicit combination; evaluation follows exactly the tree shape
/// as constructed, with no implicit precedence. A comparison may reference an
/// aggregate expression that is not selected for output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Having {
    Compare {
        function: AggregateFunction,
        expr: Expr,
        op: CompareOp,
        value: Value,
    },
    And(Box<Having>, Box<Having>),
    Or(Box<Having>, Box<Having>),
}

impl Having {
    pub fn compare(function: AggregateFunction, expr: Expr, op: CompareOp, value: Value) -> Self {
        Having::Compare {
            function,
            expr,
            op,
            value,
        }
    }

    pub fn and(self, other: Having) -> Self {
        Having::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Having) -> Self {
        Having::Or(Box::new(self), Box::new(other))
    }

    /// Every comparison leaf, in construction order.
    pub fn comparisons(&self) -> Vec<&Having> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Having>) {
        match self {
            Having::Compare { .. } => out.push(self),
            Having::And(left, right) | Having::Or(left, right) => {
                left.collect(out);
                right.collect(out);
            }
        }
    }
}
