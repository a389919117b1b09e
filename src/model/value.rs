//! Runtime values and value-level operations.
//!
//! A `Value` carries one datum of any attribute kind, plus `Null`. Arithmetic
//! follows the numeric promotion table and propagates `Null`: any operation
//! with a `Null` operand is `Null`, and so is a division or modulo by zero.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{AttributeKind, NumericKind};

/// One datum. `Null` is a first-class member of every kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Boolean(bool),
    Char(char),
    String(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Time(NaiveTime),
}

/// Internal promoted numeric form for one arithmetic step.
enum Num {
    Int(i64),
    Float(f64),
    Decimal(Decimal),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The attribute kind this value belongs to, `None` for `Null`.
    pub fn kind(&self) -> Option<AttributeKind> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(AttributeKind::Int),
            Value::Float(_) => Some(AttributeKind::Float),
            Value::Decimal(_) => Some(AttributeKind::Decimal),
            Value::Boolean(_) => Some(AttributeKind::Boolean),
            Value::Char(_) => Some(AttributeKind::Char),
            Value::String(_) => Some(AttributeKind::String),
            Value::Date(_) => Some(AttributeKind::Date),
            Value::Timestamp(_) => Some(AttributeKind::Timestamp),
            Value::Time(_) => Some(AttributeKind::Time),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind().map(AttributeKind::name).unwrap_or("null")
    }

    /// The additive zero of a numeric kind, used as the empty-group sum.
    pub fn zero(kind: NumericKind) -> Value {
        match kind {
            NumericKind::Int => Value::Int(0),
            NumericKind::Float => Value::Float(0.0),
            NumericKind::Decimal => Value::Decimal(Decimal::ZERO),
        }
    }

    /// Numeric view as `f64`, used by variance accumulation.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Decimal(v) => v.to_f64(),
            _ => None,
        }
    }

    fn num(&self) -> Option<Num> {
        match self {
            Value::Int(v) => Some(Num::Int(*v)),
            Value::Float(v) => Some(Num::Float(*v)),
            Value::Decimal(v) => Some(Num::Decimal(*v)),
            _ => None,
        }
    }

    /// Natural ordering within a kind; numeric kinds compare cross-kind after
    /// promotion. `None` for `Null` operands or incomparable kinds.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Char(a), Value::Char(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
            _ => match (self.num()?, other.num()?) {
                (Num::Int(a), Num::Int(b)) => Some(a.cmp(&b)),
                (Num::Decimal(a), Num::Decimal(b)) => Some(a.cmp(&b)),
                (Num::Int(a), Num::Decimal(b)) => Some(Decimal::from(a).cmp(&b)),
                (Num::Decimal(a), Num::Int(b)) => Some(a.cmp(&Decimal::from(b))),
                (a, b) => {
                    let (a, b) = (num_f64(&a)?, num_f64(&b)?);
                    a.partial_cmp(&b)
                }
            },
        }
    }

    /// Value-wise equality as used for group keys and `In` membership.
    pub fn same(&self, other: &Value) -> bool {
        if self.is_null() && other.is_null() {
            return true;
        }
        self.compare(other) == Some(Ordering::Equal)
    }

    pub fn add(&self, other: &Value) -> Value {
        self.binary(other, |a, b| a.checked_add(b), |a, b| Some(a + b), |a, b| {
            a.checked_add(b)
        })
    }

    pub fn sub(&self, other: &Value) -> Value {
        self.binary(other, |a, b| a.checked_sub(b), |a, b| Some(a - b), |a, b| {
            a.checked_sub(b)
        })
    }

    pub fn mul(&self, other: &Value) -> Value {
        self.binary(other, |a, b| a.checked_mul(b), |a, b| Some(a * b), |a, b| {
            a.checked_mul(b)
        })
    }

    /// Division keeps integer semantics for integer operands. Division by
    /// zero yields `Null` for every numeric kind.
    pub fn div(&self, other: &Value) -> Value {
        self.binary(
            other,
            |a, b| a.checked_div(b),
            |a, b| if b == 0.0 { None } else { Some(a / b) },
            |a, b| a.checked_div(b),
        )
    }

    pub fn rem(&self, other: &Value) -> Value {
        self.binary(
            other,
            |a, b| a.checked_rem(b),
            |a, b| if b == 0.0 { None } else { Some(a % b) },
            |a, b| a.checked_rem(b),
        )
    }

    pub fn abs(&self) -> Value {
        match self {
            Value::Int(v) => v.checked_abs().map(Value::Int).unwrap_or(Value::Null),
            Value::Float(v) => Value::Float(v.abs()),
            Value::Decimal(v) => Value::Decimal(v.abs()),
            _ => Value::Null,
        }
    }

    fn binary(
        &self,
        other: &Value,
        int_op: impl Fn(i64, i64) -> Option<i64>,
        float_op: impl Fn(f64, f64) -> Option<f64>,
        dec_op: impl Fn(Decimal, Decimal) -> Option<Decimal>,
    ) -> Value {
        let (a, b) = match (self.num(), other.num()) {
            (Some(a), Some(b)) => (a, b),
            _ => return Value::Null,
        };
        match (a, b) {
            (Num::Int(a), Num::Int(b)) => int_op(a, b).map(Value::Int),
            (Num::Int(a), Num::Decimal(b)) => dec_op(Decimal::from(a), b).map(Value::Decimal),
            (Num::Decimal(a), Num::Int(b)) => dec_op(a, Decimal::from(b)).map(Value::Decimal),
            (Num::Decimal(a), Num::Decimal(b)) => dec_op(a, b).map(Value::Decimal),
            (a, b) => match (num_f64(&a), num_f64(&b)) {
                (Some(a), Some(b)) => float_op(a, b).map(Value::Float),
                _ => None,
            },
        }
        .unwrap_or(Value::Null)
    }
}

fn num_f64(n: &Num) -> Option<f64> {
    match n {
        Num::Int(v) => Some(*v as f64),
        Num::Float(v) => Some(*v),
        Num::Decimal(v) => v.to_f64(),
    }
}

/// A group-key tuple with total, hashable equality.
///
/// `Value` itself is only `PartialEq` because of floats; group keys need to
/// live in hash maps, so floats are keyed by their bit pattern here.
#[derive(Debug, Clone)]
pub struct GroupKey(pub Vec<Value>);

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().zip(&other.0).all(|(a, b)| key_eq(a, b))
    }
}

impl Eq for GroupKey {}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for value in &self.0 {
            hash_value(value, state);
        }
    }
}

fn key_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
        _ => a == b,
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Null => 0u8.hash(state),
        Value::Int(v) => {
            1u8.hash(state);
            v.hash(state);
        }
        Value::Float(v) => {
            2u8.hash(state);
            v.to_bits().hash(state);
        }
        Value::Decimal(v) => {
            3u8.hash(state);
            v.hash(state);
        }
        Value::Boolean(v) => {
            4u8.hash(state);
            v.hash(state);
        }
        Value::Char(v) => {
            5u8.hash(state);
            v.hash(state);
        }
        Value::String(v) => {
            6u8.hash(state);
            v.hash(state);
        }
        Value::Date(v) => {
            7u8.hash(state);
            v.hash(state);
        }
        Value::Timestamp(v) => {
            8u8.hash(state);
            v.hash(state);
        }
        Value::Time(v) => {
            9u8.hash(state);
            v.hash(state);
        }
    }
}
