//! The request-side data model: schemas, values, expressions, predicates and
//! aggregate functions. Nothing here knows how requests are planned or
//! executed.

pub mod aggregate;
pub mod expr;
pub mod predicate;
pub mod schema;
pub mod types;
pub mod value;

pub use aggregate::{AggregateFunction, Having};
pub use expr::{ArithOp, Expr, ExtractFunc};
pub use predicate::{CompareOp, Predicate};
pub use schema::{Attribute, Cardinality, Catalog, EntitySchema, Relationship};
pub use types::{promote, AttributeKind, NumericKind};
pub use value::{GroupKey, Value};
