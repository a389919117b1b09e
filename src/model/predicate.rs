//! Base selection predicates.
//!
//! A predicate tree is built by the caller and consumed read-only by the
//! planner and the row source. Comparisons over a `Null` left-hand side are
//! false; a comparison over a to-many mapped expression holds when at least
//! one related row satisfies it.

use serde::{Deserialize, Serialize};

use super::expr::Expr;
use super::value::Value;

/// Comparison operators shared by base predicates and having comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
}

impl CompareOp {
    /// Apply the operator to an already-computed ordering. `None` (null or
    /// incomparable operands) never satisfies a base comparison.
    pub fn matches(self, ordering: Option<std::cmp::Ordering>) -> bool {
        use std::cmp::Ordering::*;
        match ordering {
            None => false,
            Some(ord) => match self {
                CompareOp::Eq => ord == Equal,
                CompareOp::NotEq => ord != Equal,
                CompareOp::Gt => ord == Greater,
                CompareOp::GtEq => ord != Less,
                CompareOp::Lt => ord == Less,
                CompareOp::LtEq => ord != Greater,
            },
        }
    }
}

/// The base selection tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Matches every root row.
    All,
    Compare {
        expr: Expr,
        op: CompareOp,
        value: Value,
    },
    In {
        expr: Expr,
        values: Vec<Value>,
    },
    Between {
        expr: Expr,
        low: Value,
        high: Value,
    },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn all() -> Self {
        Predicate::All
    }

    pub fn compare(expr: Expr, op: CompareOp, value: Value) -> Self {
        Predicate::Compare { expr, op, value }
    }

    pub fn eq(expr: Expr, value: Value) -> Self {
        Self::compare(expr, CompareOp::Eq, value)
    }

    pub fn not_eq(expr: Expr, value: Value) -> Self {
        Self::compare(expr, CompareOp::NotEq, value)
    }

    pub fn gt(expr: Expr, value: Value) -> Self {
        Self::compare(expr, CompareOp::Gt, value)
    }

    pub fn gt_eq(expr: Expr, value: Value) -> Self {
        Self::compare(expr, CompareOp::GtEq, value)
    }

    pub fn lt(expr: Expr, value: Value) -> Self {
        Self::compare(expr, CompareOp::Lt, value)
    }

    pub fn lt_eq(expr: Expr, value: Value) -> Self {
        Self::compare(expr, CompareOp::LtEq, value)
    }

    pub fn is_in(expr: Expr, values: Vec<Value>) -> Self {
        Predicate::In { expr, values }
    }

    pub fn between(expr: Expr, low: Value, high: Value) -> Self {
        Predicate::Between { expr, low, high }
    }

    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// All expressions referenced anywhere in the tree.
    pub fn exprs(&self) -> Vec<&Expr> {
        let mut out = Vec::new();
        self.collect_exprs(&mut out);
        out
    }

    fn collect_exprs<'a>(&'a self, out: &mut Vec<&'a Expr>) {
        match self {
            Predicate::All => {}
            Predicate::Compare { expr, .. }
            | Predicate::In { expr, .. }
            | Predicate::Between { expr, .. } => out.push(expr),
            Predicate::And(left, right) | Predicate::Or(left, right) => {
                left.collect_exprs(out);
                right.collect_exprs(out);
            }
            Predicate::Not(inner) => inner.collect_exprs(out),
        }
    }

    /// Split the tree into its AND-reachable conjuncts.
    ///
    /// Only these are candidates for promotion to pre-aggregation filters,
    /// existence checks, or in-list chunking; anything nested under `Or` or
    /// `Not` stays in place.
    pub fn conjuncts(&self) -> Vec<&Predicate> {
        let mut out = Vec::new();
        self.collect_conjuncts(&mut out);
        out
    }

    fn collect_conjuncts<'a>(&'a self, out: &mut Vec<&'a Predicate>) {
        match self {
            Predicate::And(left, right) => {
                left.collect_conjuncts(out);
                right.collect_conjuncts(out);
            }
            Predicate::All => {}
            other => out.push(other),
        }
    }

    /// Rebuild a tree from conjuncts, collapsing to `All` when empty.
    pub fn from_conjuncts(conjuncts: Vec<Predicate>) -> Predicate {
        conjuncts
            .into_iter()
            .reduce(|acc, next| acc.and(next))
            .unwrap_or(Predicate::All)
    }
}
