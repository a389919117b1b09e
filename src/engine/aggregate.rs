//! Aggregate function evaluation over sufficient statistics.
//!
//! One accumulator per (group, source) holds count, sum, sum of squares and
//! the extremes. That is enough to finalize every supported function, and two
//! accumulators merge commutatively, which is what makes chunked execution
//! deterministic.

use rust_decimal::Decimal;

use crate::model::{AggregateFunction, AttributeKind, NumericKind, Value};

/// Sufficient statistics for one group's contributing values.
///
/// Null source values are skipped on push: they never contribute to any
/// function, and `count` excludes them while itself never being null.
#[derive(Debug, Clone)]
pub struct Accumulator {
    kind: AttributeKind,
    n: u64,
    sum: Value,
    sum_sq: f64,
    min: Option<Value>,
    max: Option<Value>,
}

impl Accumulator {
    pub fn new(kind: AttributeKind) -> Self {
        let sum = kind
            .numeric()
            .map(Value::zero)
            .unwrap_or(Value::Null);
        Self {
            kind,
            n: 0,
            sum,
            sum_sq: 0.0,
            min: None,
            max: None,
        }
    }

    /// Fold one contributing value in. Nulls are elided.
    pub fn push(&mut self, value: &Value) {
        if value.is_null() {
            return;
        }
        self.n += 1;
        if self.kind.is_numeric() {
            self.sum = self.sum.add(value);
            if let Some(x) = value.as_f64() {
                self.sum_sq += x * x;
            }
        }
        replace_extreme(&mut self.min, value, std::cmp::Ordering::Less);
        replace_extreme(&mut self.max, value, std::cmp::Ordering::Greater);
    }

    /// Merge another partial accumulator. Commutative and associative, so
    /// chunk completion order cannot change the result.
    pub fn merge(&mut self, other: &Accumulator) {
        self.n += other.n;
        if self.kind.is_numeric() {
            self.sum = self.sum.add(&other.sum);
            self.sum_sq += other.sum_sq;
        }
        if let Some(v) = &other.min {
            replace_extreme(&mut self.min, v, std::cmp::Ordering::Less);
        }
        if let Some(v) = &other.max {
            replace_extreme(&mut self.max, v, std::cmp::Ordering::Greater);
        }
    }

    /// Produce the requested function's value for this group.
    pub fn finalize(&self, function: AggregateFunction) -> Value {
        match function {
            AggregateFunction::Count => Value::Int(self.n as i64),
            AggregateFunction::Sum => self.sum.clone(),
            AggregateFunction::Min => self.min.clone().unwrap_or(Value::Null),
            AggregateFunction::Max => self.max.clone().unwrap_or(Value::Null),
            AggregateFunction::Avg => self.average(),
            AggregateFunction::VariancePopulation => self.variance(false),
            AggregateFunction::VarianceSample => self.variance(true),
            AggregateFunction::StdDevPopulation => sqrt(self.variance(false)),
            AggregateFunction::StdDevSample => sqrt(self.variance(true)),
        }
    }

    fn average(&self) -> Value {
        if self.n == 0 {
            return Value::Null;
        }
        match self.kind.numeric() {
            Some(NumericKind::Decimal) => {
                if let Value::Decimal(sum) = &self.sum {
                    sum.checked_div(Decimal::from(self.n))
                        .map(Value::Decimal)
                        .unwrap_or(Value::Null)
                } else {
                    Value::Null
                }
            }
            Some(_) => match self.sum.as_f64() {
                Some(sum) => Value::Float(sum / self.n as f64),
                None => Value::Null,
            },
            None => Value::Null,
        }
    }

    /// Null for an empty group, 0 for a single-row group (both variants),
    /// otherwise the sum of squared deviations over n or n-1.
    fn variance(&self, sample: bool) -> Value {
        if self.n == 0 {
            return Value::Null;
        }
        if self.n == 1 {
            return Value::Float(0.0);
        }
        let sum = match self.sum.as_f64() {
            Some(sum) => sum,
            None => return Value::Null,
        };
        let n = self.n as f64;
        let mean = sum / n;
        // Σ(x − mean)² via Σx² − n·mean², clamped against rounding.
        let m2 = (self.sum_sq - n * mean * mean).max(0.0);
        let divisor = if sample { n - 1.0 } else { n };
        Value::Float(m2 / divisor)
    }
}

fn sqrt(value: Value) -> Value {
    match value {
        Value::Float(v) => Value::Float(v.sqrt()),
        other => other,
    }
}

fn replace_extreme(slot: &mut Option<Value>, candidate: &Value, keep: std::cmp::Ordering) {
    match slot {
        None => *slot = Some(candidate.clone()),
        Some(current) => {
            if candidate.compare(current) == Some(keep) {
                *slot = Some(candidate.clone());
            }
        }
    }
}
