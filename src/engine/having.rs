//! Having predicate evaluation.
//!
//! The bound tree is evaluated bottom-up per group; both sides of every
//! combinator are always evaluated (no side effects to short-circuit), and
//! the combination order is exactly the tree shape as constructed.

use std::collections::HashMap;

use crate::model::{CompareOp, Value};
use crate::planner::BoundHaving;

use super::aggregate::Accumulator;

/// Whether the group behind `accumulators` survives the having filter.
pub fn evaluate(having: &BoundHaving, accumulators: &HashMap<String, Accumulator>) -> bool {
    match having {
        BoundHaving::Compare {
            source,
            function,
            op,
            value,
        } => {
            let aggregate = match accumulators.get(source) {
                Some(acc) => acc.finalize(*function),
                None => Value::Null,
            };
            if aggregate.is_null() {
                // Null never equals a non-null literal, so only notEq holds.
                return *op == CompareOp::NotEq && !value.is_null();
            }
            op.matches(aggregate.compare(value))
        }
        BoundHaving::And(left, right) => {
            let l = evaluate(left, accumulators);
            let r = evaluate(right, accumulators);
            l && r
        }
        BoundHaving::Or(left, right) => {
            let l = evaluate(left, accumulators);
            let r = evaluate(right, accumulators);
            l || r
        }
    }
}
