use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::Record;
use crate::value::ColumnValue;

/// How many selected values a multi-select label spells out before falling
/// back to a count.
const LABEL_MAX_LISTED: usize = 3;

/// Draft validation failure, reported at apply time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("date range start {start} is after end {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },
}

/// Discriminant of the closed predicate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateKind {
    DateRange,
    MultiSelect,
}

/// A committed filter condition over one column.
///
/// The predicate set is deliberately closed: filtering is not a query
/// language, and exhaustive matching keeps evaluation total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Matches date values in `[start, end]` inclusive.
    ///
    /// `start <= end` is enforced when a draft is committed, never during
    /// evaluation.
    DateRange { start: NaiveDate, end: NaiveDate },
    /// Matches values that are members of `allowed`.
    ///
    /// An empty set matches no record: it is an explicit "filter everything
    /// out", distinct from the absence of a filter.
    MultiSelect { allowed: BTreeSet<ColumnValue> },
}

impl Predicate {
    pub fn kind(&self) -> PredicateKind {
        match self {
            Predicate::DateRange { .. } => PredicateKind::DateRange,
            Predicate::MultiSelect { .. } => PredicateKind::MultiSelect,
        }
    }

    /// Pure, total match test against `record`'s value for `column`.
    ///
    /// A record that has no value for the column, or a value of the wrong
    /// type, does not match.
    pub fn matches(&self, record: &Record, column: &str) -> bool {
        let Some(value) = record.value(column) else {
            return false;
        };
        match self {
            Predicate::DateRange { start, end } => value
                .as_date()
                .is_some_and(|d| d >= *start && d <= *end),
            Predicate::MultiSelect { allowed } => allowed.contains(value),
        }
    }

    /// Short human-readable summary shown on the filter button.
    pub fn display_label(&self) -> String {
        match self {
            Predicate::DateRange { start, end } if start == end => start.to_string(),
            Predicate::DateRange { start, end } => format!("{start} – {end}"),
            Predicate::MultiSelect { allowed } if allowed.is_empty() => "none selected".to_string(),
            Predicate::MultiSelect { allowed } if allowed.len() <= LABEL_MAX_LISTED => allowed
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            Predicate::MultiSelect { allowed } => format!("{} selected", allowed.len()),
        }
    }
}

/// The editable, possibly-incomplete form of a predicate.
///
/// Drafts never participate in filtering; they are copied into a committed
/// [`Predicate`] by [`PredicateDraft::commit`], which is where validation
/// happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredicateDraft {
    DateRange {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
    MultiSelect { selected: BTreeSet<ColumnValue> },
}

impl PredicateDraft {
    /// The empty/neutral draft for a predicate kind.
    pub fn neutral(kind: PredicateKind) -> Self {
        match kind {
            PredicateKind::DateRange => PredicateDraft::DateRange { start: None, end: None },
            PredicateKind::MultiSelect => PredicateDraft::MultiSelect {
                selected: BTreeSet::new(),
            },
        }
    }

    /// A draft pre-populated from a committed predicate (copy-on-open).
    pub fn from_predicate(predicate: &Predicate) -> Self {
        match predicate {
            Predicate::DateRange { start, end } => PredicateDraft::DateRange {
                start: Some(*start),
                end: Some(*end),
            },
            Predicate::MultiSelect { allowed } => PredicateDraft::MultiSelect {
                selected: allowed.clone(),
            },
        }
    }

    pub fn kind(&self) -> PredicateKind {
        match self {
            PredicateDraft::DateRange { .. } => PredicateKind::DateRange,
            PredicateDraft::MultiSelect { .. } => PredicateKind::MultiSelect,
        }
    }

    /// Resets the draft to its neutral value in place.
    pub fn clear(&mut self) {
        *self = Self::neutral(self.kind());
    }

    pub fn is_neutral(&self) -> bool {
        match self {
            PredicateDraft::DateRange { start, end } => start.is_none() && end.is_none(),
            PredicateDraft::MultiSelect { selected } => selected.is_empty(),
        }
    }

    /// Validates the draft and converts it into a committed predicate.
    ///
    /// - a date range with `start > end` is rejected;
    /// - a single selected date commits as a one-day range;
    /// - a date draft with neither bound commits to `None`, clearing the
    ///   filter (the calendar widget's save-with-empty-selection behavior);
    /// - multi-select always commits, the empty set included.
    pub fn commit(&self) -> Result<Option<Predicate>, ValidationError> {
        match self {
            PredicateDraft::DateRange { start: None, end: None } => Ok(None),
            PredicateDraft::DateRange { start, end } => {
                let start = start.or(*end).expect("at least one bound is set");
                let end = end.unwrap_or(start);
                if start > end {
                    return Err(ValidationError::InvertedDateRange { start, end });
                }
                Ok(Some(Predicate::DateRange { start, end }))
            }
            PredicateDraft::MultiSelect { selected } => Ok(Some(Predicate::MultiSelect {
                allowed: selected.clone(),
            })),
        }
    }
}
