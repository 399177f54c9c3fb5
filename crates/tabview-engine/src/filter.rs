use serde::{Deserialize, Serialize};

use tabview_model::{Predicate, PredicateDraft, PredicateKind, Record, ValidationError};

use crate::error::EngineError;

/// Lifecycle phase of a single filter instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPhase {
    /// Popup closed, nothing committed.
    Closed,
    /// Popup open, draft editable; the committed value is untouched until
    /// an explicit apply.
    Open,
    /// Popup closed with a committed predicate in effect.
    Applied,
}

/// What a successful apply produced: the new committed predicate (possibly
/// cleared) and its display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub predicate: Option<Predicate>,
    pub label: String,
}

/// Committed filter summary for one column, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterLabel {
    pub column: String,
    pub label: String,
}

/// The draft/applied state machine for one column's filter.
///
/// The draft is always a copy: it is populated from `committed` on open and
/// copied back only by [`FilterState::apply`]. Mutating the draft can never
/// leak into the visible record set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    column: String,
    kind: PredicateKind,
    draft: PredicateDraft,
    committed: Option<Predicate>,
    phase: FilterPhase,
}

impl FilterState {
    pub fn new(column: impl Into<String>, kind: PredicateKind) -> Self {
        Self {
            column: column.into(),
            kind,
            draft: PredicateDraft::neutral(kind),
            committed: None,
            phase: FilterPhase::Closed,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn kind(&self) -> PredicateKind {
        self.kind
    }

    pub fn phase(&self) -> FilterPhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase == FilterPhase::Open
    }

    pub fn draft(&self) -> &PredicateDraft {
        &self.draft
    }

    pub fn committed(&self) -> Option<&Predicate> {
        self.committed.as_ref()
    }

    /// Opens the filter for editing, seeding the draft from the committed
    /// predicate (copy-on-open) or its neutral value.
    pub fn open(&mut self) {
        self.draft = match &self.committed {
            Some(predicate) => PredicateDraft::from_predicate(predicate),
            None => PredicateDraft::neutral(self.kind),
        };
        self.phase = FilterPhase::Open;
    }

    /// Replaces the draft while the filter is open.
    pub fn update_draft(&mut self, draft: PredicateDraft) -> Result<(), EngineError> {
        if !self.is_open() {
            return Err(EngineError::FilterNotOpen { column: self.column.clone() });
        }
        if draft.kind() != self.kind {
            return Err(EngineError::PredicateKindMismatch { column: self.column.clone() });
        }
        self.draft = draft;
        Ok(())
    }

    /// Resets the draft to its neutral value. A no-op unless the filter is
    /// open; the user must still apply or cancel.
    pub fn clear_conditions(&mut self) {
        if self.is_open() {
            self.draft.clear();
        }
    }

    /// Validates the draft and commits it.
    ///
    /// On success the popup closes (phase becomes `Applied`, or `Closed` if
    /// the draft committed to "no predicate"). On validation failure the
    /// filter stays open and `committed` is untouched.
    pub fn apply(&mut self) -> Result<ApplyOutcome, ValidationError> {
        let committed = self.draft.commit()?;
        self.committed = committed.clone();
        self.settle();
        let label = committed
            .as_ref()
            .map(Predicate::display_label)
            .unwrap_or_default();
        Ok(ApplyOutcome { predicate: committed, label })
    }

    /// Discards the draft and closes the popup. Returns whether the filter
    /// was actually open (callers emit a close notification only then).
    pub fn cancel(&mut self) -> bool {
        if !self.is_open() {
            return false;
        }
        self.draft = match &self.committed {
            Some(predicate) => PredicateDraft::from_predicate(predicate),
            None => PredicateDraft::neutral(self.kind),
        };
        self.settle();
        true
    }

    fn settle(&mut self) {
        self.phase = if self.committed.is_some() {
            FilterPhase::Applied
        } else {
            FilterPhase::Closed
        };
    }
}

/// Ordered collection of per-column filter states.
///
/// First-insertion order among distinct columns is preserved for display; at
/// most one state exists per column. Evaluation is the AND over all committed
/// predicates, which is commutative and associative by construction —
/// insertion order can never change the visible set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActiveFilterSet {
    states: Vec<FilterState>,
}

impl ActiveFilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state for `column`, creating a detached (Closed) one if
    /// the column has no filter yet.
    pub fn attach(&mut self, column: &str, kind: PredicateKind) -> &mut FilterState {
        let position = match self.position(column) {
            Some(position) => position,
            None => {
                self.states.push(FilterState::new(column, kind));
                self.states.len() - 1
            }
        };
        &mut self.states[position]
    }

    pub fn get(&self, column: &str) -> Option<&FilterState> {
        self.position(column).map(|i| &self.states[i])
    }

    pub fn get_mut(&mut self, column: &str) -> Option<&mut FilterState> {
        self.position(column).map(|i| &mut self.states[i])
    }

    /// Inserts or replaces the committed predicate for `column`.
    pub fn set_filter(&mut self, column: &str, predicate: Predicate) {
        let kind = predicate.kind();
        let state = self.attach(column, kind);
        state.kind = kind;
        state.committed = Some(predicate);
        state.settle();
    }

    /// Removes the filter for `column` entirely. Idempotent: removing an
    /// absent column is a no-op and returns false.
    pub fn remove_filter(&mut self, column: &str) -> bool {
        match self.position(column) {
            Some(position) => {
                self.states.remove(position);
                true
            }
            None => false,
        }
    }

    /// AND over every committed predicate; an empty set matches everything.
    pub fn evaluate(&self, record: &Record) -> bool {
        self.states.iter().all(|state| {
            state
                .committed()
                .map_or(true, |predicate| predicate.matches(record, state.column()))
        })
    }

    /// Display labels of the committed filters, in insertion order.
    pub fn labels(&self) -> Vec<FilterLabel> {
        self.states
            .iter()
            .filter_map(|state| {
                state.committed().map(|predicate| FilterLabel {
                    column: state.column().to_string(),
                    label: predicate.display_label(),
                })
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterState> {
        self.states.iter()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(FilterState::column)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.states.iter().position(|s| s.column() == column)
    }
}
