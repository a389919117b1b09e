//! Execution: accumulators, having evaluation, the row source contract, the
//! in-memory reference row source, and the query builder that ties the
//! pipeline together.

pub mod aggregate;
pub mod having;
pub mod memory;
pub mod query;
pub mod result;
pub mod row_source;

pub use aggregate::Accumulator;
pub use memory::{Dataset, EntityRow, MemoryRowSource};
pub use query::AggregateQuery;
pub use result::{AggregateList, AggregateRow};
pub use row_source::{GroupRows, RowSource};
