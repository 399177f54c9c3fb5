//! `tabview-model` defines the core in-memory data structures for an
//! interactive, filterable table view.
//!
//! The crate is intentionally self-contained so it can be reused by:
//! - the view engine (filter state machines, grouping, search)
//! - presentation layers that snapshot committed filter/grouping state
//!   via `serde` (JSON-safe schema)

mod dataset;
mod predicate;
mod schema;
mod value;

pub use dataset::{Dataset, DatasetError, Record, RecordId};
pub use predicate::{Predicate, PredicateDraft, PredicateKind, ValidationError};
pub use schema::{Column, ColumnSchema, ColumnType, SchemaError};
pub use value::ColumnValue;
