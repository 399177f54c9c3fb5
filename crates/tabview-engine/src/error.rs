use thiserror::Error;

use tabview_model::{DatasetError, ValidationError};

/// Errors surfaced by engine commands.
///
/// Every error leaves the session state unchanged; the forgiving cases
/// (removing an absent filter, clearing a closed filter, expand/collapse with
/// no groups) are no-ops rather than errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Invalid draft at apply time; the filter stays open.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A command referenced a column absent from the schema.
    #[error("unknown column: {column}")]
    UnknownColumn { column: String },
    /// Dataset replacement was rejected; the previous dataset stays in place.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    /// A draft edit targeted a filter that is not open.
    #[error("filter on column {column} is not open")]
    FilterNotOpen { column: String },
    /// A draft of the wrong kind was offered for the column's type.
    #[error("predicate kind does not match column {column}")]
    PredicateKindMismatch { column: String },
}
