//! Attribute expressions: plain, calculated, extracted, and
//! relationship-mapped.
//!
//! The expression tree is immutable and carries no relationship knowledge of
//! its own; a `Mapped` node only names relationship steps, which the semantic
//! layer resolves and classifies.

use serde::{Deserialize, Serialize};

use crate::semantic::error::{AggregateError, AggregateResult};

use super::schema::Catalog;
use super::types::{promote, AttributeKind, NumericKind};

/// Arithmetic operators for calculated expressions.
///
/// `AbsoluteValue` is unary; the rest are binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithOp {
    Plus,
    Minus,
    Times,
    DividedBy,
    Modulo,
    AbsoluteValue,
}

/// Date-part extraction functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractFunc {
    Year,
    Month,
    DayOfMonth,
}

/// An attribute expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A named attribute, optionally qualified with the entity it is expected
    /// to live on. A qualifier that disagrees with the entity in scope is a
    /// mixed-root error.
    Attribute {
        entity: Option<String>,
        name: String,
    },

    /// Arithmetic over operand expressions.
    Calculated { op: ArithOp, operands: Vec<Expr> },

    /// Date-part extraction over a temporal operand.
    Extract { func: ExtractFunc, operand: Box<Expr> },

    /// An inner expression evaluated after traversing relationship steps.
    Mapped { path: Vec<String>, inner: Box<Expr> },
}

impl Expr {
    /// An unqualified attribute reference on the entity in scope.
    pub fn attr(name: impl Into<String>) -> Self {
        Expr::Attribute {
            entity: None,
            name: name.into(),
        }
    }

    /// An attribute reference qualified with its owning entity.
    pub fn entity_attr(entity: impl Into<String>, name: impl Into<String>) -> Self {
        Expr::Attribute {
            entity: Some(entity.into()),
            name: name.into(),
        }
    }

    /// An inner expression reached through relationship steps.
    pub fn via<S: Into<String>>(path: impl IntoIterator<Item = S>, inner: Expr) -> Self {
        Expr::Mapped {
            path: path.into_iter().map(Into::into).collect(),
            inner: Box::new(inner),
        }
    }

    /// A dotted reference: every segment but the last names a relationship,
    /// the last names an attribute (`"items.quantity"`).
    pub fn reference(dotted: &str) -> Self {
        let mut segments: Vec<&str> = dotted.split('.').collect();
        let attribute = segments.pop().unwrap_or_default();
        if segments.is_empty() {
            Expr::attr(attribute)
        } else {
            Expr::via(segments, Expr::attr(attribute))
        }
    }

    fn binary(self, op: ArithOp, other: Expr) -> Self {
        Expr::Calculated {
            op,
            operands: vec![self, other],
        }
    }

    pub fn plus(self, other: Expr) -> Self {
        self.binary(ArithOp::Plus, other)
    }

    pub fn minus(self, other: Expr) -> Self {
        self.binary(ArithOp::Minus, other)
    }

    pub fn times(self, other: Expr) -> Self {
        self.binary(ArithOp::Times, other)
    }

    pub fn divided_by(self, other: Expr) -> Self {
        self.binary(ArithOp::DividedBy, other)
    }

    pub fn modulo(self, other: Expr) -> Self {
        self.binary(ArithOp::Modulo, other)
    }

    pub fn absolute_value(self) -> Self {
        Expr::Calculated {
            op: ArithOp::AbsoluteValue,
            operands: vec![self],
        }
    }

    pub fn year(self) -> Self {
        self.extract(ExtractFunc::Year)
    }

    pub fn month(self) -> Self {
        self.extract(ExtractFunc::Month)
    }

    pub fn day_of_month(self) -> Self {
        self.extract(ExtractFunc::DayOfMonth)
    }

    fn extract(self, func: ExtractFunc) -> Self {
        Expr::Extract {
            func,
            operand: Box::new(self),
        }
    }

    /// Normalize nested `Mapped` chains into a single step list.
    ///
    /// `Mapped(a, Mapped(b, e))` and `Mapped(a.b, e)` are the same join
    /// target and must plan identically.
    pub fn flattened(&self) -> Expr {
        match self {
            Expr::Mapped { path, inner } => match inner.flattened() {
                Expr::Mapped {
                    path: inner_path,
                    inner: innermost,
                } => {
                    let mut full = path.clone();
                    full.extend(inner_path);
                    Expr::Mapped {
                        path: full,
                        inner: innermost,
                    }
                }
                flat => Expr::Mapped {
                    path: path.clone(),
                    inner: Box::new(flat),
                },
            },
            Expr::Calculated { op, operands } => Expr::Calculated {
                op: *op,
                operands: operands.iter().map(Expr::flattened).collect(),
            },
            Expr::Extract { func, operand } => Expr::Extract {
                func: *func,
                operand: Box::new(operand.flattened()),
            },
            other => other.clone(),
        }
    }

    /// Type-check against `entity` and compute the promoted result kind.
    ///
    /// Performed once at request-building time, never per row.
    pub fn kind(&self, catalog: &Catalog, entity: &str) -> AggregateResult<AttributeKind> {
        match self {
            Expr::Attribute {
                entity: qualifier,
                name,
            } => {
                if let Some(declared) = qualifier {
                    if declared != entity {
                        return Err(AggregateError::MixedRootEntity {
                            expected: entity.to_string(),
                            found: declared.clone(),
                        });
                    }
                }
                let schema = catalog
                    .entity(entity)
                    .ok_or_else(|| AggregateError::UnknownEntity(entity.to_string()))?;
                schema
                    .attribute(name)
                    .map(|a| a.kind)
                    .ok_or_else(|| AggregateError::UnknownAttribute {
                        entity: entity.to_string(),
                        reference: name.clone(),
                    })
            }
            Expr::Calculated { op, operands } => {
                let mut kinds = Vec::with_capacity(operands.len());
                for operand in operands {
                    let kind = operand.kind(catalog, entity)?;
                    let numeric = kind.numeric().ok_or_else(|| {
                        AggregateError::NotNumeric(format!(
                            "{:?} operand has kind {}",
                            op,
                            kind.name()
                        ))
                    })?;
                    kinds.push(numeric);
                }
                let promoted = match (op, kinds.as_slice()) {
                    (ArithOp::AbsoluteValue, [only]) => *only,
                    (ArithOp::AbsoluteValue, _) => {
                        return Err(AggregateError::InvalidExpression(
                            "absoluteValue takes exactly one operand".into(),
                        ))
                    }
                    (_, [left, right]) => promote(*left, *right),
                    _ => {
                        return Err(AggregateError::InvalidExpression(format!(
                            "{:?} takes exactly two operands",
                            op
                        )))
                    }
                };
                Ok(promoted.kind())
            }
            Expr::Extract { func, operand } => {
                let kind = operand.kind(catalog, entity)?;
                if !kind.is_temporal() {
                    return Err(AggregateError::InvalidExpression(format!(
                        "{:?} requires a date or timestamp operand, got {}",
                        func,
                        kind.name()
                    )));
                }
                Ok(AttributeKind::Int)
            }
            Expr::Mapped { path, inner } => {
                let mut current = entity.to_string();
                for step in path {
                    let schema = catalog
                        .entity(&current)
                        .ok_or_else(|| AggregateError::UnknownEntity(current.clone()))?;
                    let relationship = schema.relationship(step).ok_or_else(|| {
                        AggregateError::UnknownRelationship {
                            entity: current.clone(),
                            relationship: step.clone(),
                        }
                    })?;
                    current = relationship.target.clone();
                }
                inner.kind(catalog, &current)
            }
        }
    }

    /// The promoted numeric kind, or a `NotNumeric` error. Used to validate
    /// sum/avg/variance sources.
    pub fn numeric_kind(&self, catalog: &Catalog, entity: &str) -> AggregateResult<NumericKind> {
        let kind = self.kind(catalog, entity)?;
        kind.numeric().ok_or_else(|| {
            AggregateError::NotNumeric(format!("expression has kind {}", kind.name()))
        })
    }
}
