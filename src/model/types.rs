//! Attribute kinds and numeric promotion rules.
//!
//! Promotion is decided once, when a calculated expression is built or
//! validated, never per row.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// The closed set of attribute kinds an entity schema can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeKind {
    Int,
    Float,
    Decimal,
    Boolean,
    Char,
    String,
    Date,
    Timestamp,
    Time,
}

impl AttributeKind {
    /// The numeric subset, if this kind participates in arithmetic.
    pub fn numeric(self) -> Option<NumericKind> {
        match self {
            AttributeKind::Int => Some(NumericKind::Int),
            AttributeKind::Float => Some(NumericKind::Float),
            AttributeKind::Decimal => Some(NumericKind::Decimal),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        self.numeric().is_some()
    }

    /// Kinds that support year/month/day extraction.
    pub fn is_temporal(self) -> bool {
        matches!(self, AttributeKind::Date | AttributeKind::Timestamp)
    }

    pub fn name(self) -> &'static str {
        match self {
            AttributeKind::Int => "int",
            AttributeKind::Float => "float",
            AttributeKind::Decimal => "decimal",
            AttributeKind::Boolean => "boolean",
            AttributeKind::Char => "char",
            AttributeKind::String => "string",
            AttributeKind::Date => "date",
            AttributeKind::Timestamp => "timestamp",
            AttributeKind::Time => "time",
        }
    }
}

/// The closed set of numeric kinds used for promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericKind {
    Int,
    Float,
    Decimal,
}

impl NumericKind {
    pub fn kind(self) -> AttributeKind {
        match self {
            NumericKind::Int => AttributeKind::Int,
            NumericKind::Float => AttributeKind::Float,
            NumericKind::Decimal => AttributeKind::Decimal,
        }
    }
}

/// Promotion table for binary arithmetic.
///
/// Int stays Int against Int; Decimal absorbs Int; Float absorbs everything,
/// including Decimal (a Float operand forces an approximate result).
static PROMOTION: Lazy<HashMap<(NumericKind, NumericKind), NumericKind>> = Lazy::new(|| {
    use NumericKind::*;
    let mut table = HashMap::new();
    table.insert((Int, Int), Int);
    table.insert((Int, Float), Float);
    table.insert((Float, Int), Float);
    table.insert((Float, Float), Float);
    table.insert((Int, Decimal), Decimal);
    table.insert((Decimal, Int), Decimal);
    table.insert((Decimal, Decimal), Decimal);
    table.insert((Float, Decimal), Float);
    table.insert((Decimal, Float), Float);
    table
});

/// Promote two numeric kinds to the kind of their combination.
pub fn promote(a: NumericKind, b: NumericKind) -> NumericKind {
    PROMOTION[&(a, b)]
}
