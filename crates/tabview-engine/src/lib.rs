//! `tabview-engine` turns an in-memory [`tabview_model::Dataset`] plus
//! interactive filter/group/search state into an ordered, annotated view.
//!
//! The engine is a pure function of (state, command): every command returns
//! the notifications it produced, and any change to committed filters,
//! grouping configuration, the search query, or the dataset reruns the whole
//! recomputation pipeline. There is no incremental update path and no
//! background work; callers that need debouncing (e.g. per-keystroke search)
//! apply it before issuing commands.

pub mod error;
pub mod filter;
pub mod group;
pub mod search;
pub mod session;

pub use error::EngineError;
pub use filter::{ActiveFilterSet, ApplyOutcome, FilterLabel, FilterPhase, FilterState};
pub use group::{Group, GroupKey, GroupOrder, GroupingEngine};
pub use search::{SearchEngine, SearchQuery};
pub use session::{Command, Notification, Session, View};
