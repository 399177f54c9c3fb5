use std::collections::BTreeSet;

use serde::Serialize;

use tabview_model::{
    ColumnSchema, Dataset, Predicate, PredicateDraft, Record, RecordId,
};

use crate::error::EngineError;
use crate::filter::{ActiveFilterSet, FilterLabel};
use crate::group::{Group, GroupKey, GroupOrder, GroupingEngine};
use crate::search::{validate_query, SearchEngine, SearchQuery};

/// Everything a session can be asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Atomically swap in a new schema and record set.
    ReplaceDataset { schema: ColumnSchema, records: Vec<Record> },
    /// Open the filter popup for a column, seeding its draft.
    OpenFilter { column: String },
    /// Replace the open filter's draft.
    UpdateDraft { column: String, draft: PredicateDraft },
    /// Reset the open filter's draft to neutral.
    ClearDraft { column: String },
    /// Validate and commit the open filter's draft.
    ApplyFilter { column: String },
    /// Discard the open filter's draft.
    CancelFilter { column: String },
    /// Commit a predicate directly, bypassing the draft lifecycle.
    SetFilter { column: String, predicate: Predicate },
    /// Drop a column's filter entirely.
    RemoveFilter { column: String },
    SetGroupColumn { column: Option<String> },
    SetGroupOrder { order: GroupOrder },
    SetGroupExpanded { key: GroupKey, expanded: bool },
    ExpandAll,
    CollapseAll,
    Search { query: SearchQuery },
    ClearSearch,
}

/// Events emitted by a command, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A filter's committed predicate changed (`None` means cleared).
    Activated { column: String, predicate: Option<Predicate> },
    /// A filter's display label changed (empty when cleared).
    LabelChanged { column: String, label: String },
    /// A filter popup should close without committing (cancel).
    CloseRequested { column: String },
    /// A filter was removed from the active set.
    FilterRemoved { column: String },
    /// The visible view was recomputed.
    ViewChanged(View),
}

/// The computed view: ordered groups of visible records, the search
/// highlight set, and the committed filter labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub groups: Vec<Group>,
    pub search_matches: BTreeSet<RecordId>,
    pub filter_labels: Vec<FilterLabel>,
}

impl View {
    /// Visible record ids in view order (groups, then load order within).
    pub fn visible_ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.groups.iter().flat_map(|g| g.record_ids.iter().copied())
    }
}

/// Owns the dataset and all interactive state, and turns commands into
/// notifications.
///
/// Any command that can change the visible set or its annotations ends with
/// a full view recomputation; there is no partial invalidation to get wrong.
#[derive(Debug, Clone)]
pub struct Session {
    dataset: Dataset,
    filters: ActiveFilterSet,
    grouping: GroupingEngine,
    search: SearchEngine,
}

impl Session {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            filters: ActiveFilterSet::new(),
            grouping: GroupingEngine::new(),
            search: SearchEngine::new(),
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn filters(&self) -> &ActiveFilterSet {
        &self.filters
    }

    pub fn grouping(&self) -> &GroupingEngine {
        &self.grouping
    }

    pub fn search_query(&self) -> &SearchQuery {
        self.search.query()
    }

    /// Recomputes the current view without issuing a command.
    pub fn view(&mut self) -> View {
        self.recompute_view()
    }

    /// Executes one command. On error the session is unchanged and no
    /// notifications are emitted.
    pub fn apply(&mut self, command: Command) -> Result<Vec<Notification>, EngineError> {
        match command {
            Command::ReplaceDataset { schema, records } => {
                self.replace_dataset(schema, records)
            }
            Command::OpenFilter { column } => self.open_filter(column),
            Command::UpdateDraft { column, draft } => {
                self.open_state(&column)?.update_draft(draft)?;
                Ok(Vec::new())
            }
            Command::ClearDraft { column } => {
                if let Some(state) = self.filters.get_mut(&column) {
                    state.clear_conditions();
                }
                Ok(Vec::new())
            }
            Command::ApplyFilter { column } => self.apply_filter(column),
            Command::CancelFilter { column } => {
                let mut notifications = Vec::new();
                if let Some(state) = self.filters.get_mut(&column) {
                    if state.cancel() {
                        notifications.push(Notification::CloseRequested { column });
                    }
                }
                Ok(notifications)
            }
            Command::SetFilter { column, predicate } => self.set_filter(column, predicate),
            Command::RemoveFilter { column } => {
                let mut notifications = Vec::new();
                if self.filters.remove_filter(&column) {
                    notifications.push(Notification::FilterRemoved { column });
                    notifications.push(self.view_changed());
                }
                Ok(notifications)
            }
            Command::SetGroupColumn { column } => {
                if let Some(column) = &column {
                    self.ensure_column(column)?;
                }
                self.grouping.set_group_column(column);
                Ok(vec![self.view_changed()])
            }
            Command::SetGroupOrder { order } => {
                self.grouping.set_order(order);
                Ok(vec![self.view_changed()])
            }
            Command::SetGroupExpanded { key, expanded } => {
                self.grouping.set_expanded(&key, expanded);
                Ok(vec![self.view_changed()])
            }
            Command::ExpandAll => {
                self.grouping.expand_all();
                Ok(vec![self.view_changed()])
            }
            Command::CollapseAll => {
                self.grouping.collapse_all();
                Ok(vec![self.view_changed()])
            }
            Command::Search { query } => {
                validate_query(&query, &self.dataset)?;
                self.search.set_query(query);
                Ok(vec![self.view_changed()])
            }
            Command::ClearSearch => {
                self.search.clear();
                Ok(vec![self.view_changed()])
            }
        }
    }

    fn open_filter(&mut self, column: String) -> Result<Vec<Notification>, EngineError> {
        let ty = self.ensure_column(&column)?;
        let state = self.filters.attach(&column, ty.predicate_kind());
        state.open();
        Ok(Vec::new())
    }

    fn apply_filter(&mut self, column: String) -> Result<Vec<Notification>, EngineError> {
        let state = self.open_state(&column)?;
        let outcome = state.apply()?;
        Ok(vec![
            Notification::LabelChanged { column: column.clone(), label: outcome.label },
            Notification::Activated { column, predicate: outcome.predicate },
            self.view_changed(),
        ])
    }

    fn set_filter(
        &mut self,
        column: String,
        predicate: Predicate,
    ) -> Result<Vec<Notification>, EngineError> {
        let ty = self.ensure_column(&column)?;
        if predicate.kind() != ty.predicate_kind() {
            return Err(EngineError::PredicateKindMismatch { column });
        }
        let label = predicate.display_label();
        self.filters.set_filter(&column, predicate.clone());
        Ok(vec![
            Notification::LabelChanged { column: column.clone(), label },
            Notification::Activated { column, predicate: Some(predicate) },
            self.view_changed(),
        ])
    }

    fn replace_dataset(
        &mut self,
        schema: ColumnSchema,
        records: Vec<Record>,
    ) -> Result<Vec<Notification>, EngineError> {
        let dataset = Dataset::new(schema, records)?;
        self.dataset = dataset;

        // Drop filters whose column vanished or changed to an incompatible
        // type; everything else survives the swap.
        let mut notifications = Vec::new();
        let stale: Vec<String> = self
            .filters
            .iter()
            .filter(|state| {
                self.dataset
                    .schema()
                    .column_type(state.column())
                    .map_or(true, |ty| ty.predicate_kind() != state.kind())
            })
            .map(|state| state.column().to_string())
            .collect();
        for column in stale {
            self.filters.remove_filter(&column);
            notifications.push(Notification::FilterRemoved { column });
        }

        if self
            .grouping
            .group_column()
            .is_some_and(|column| !self.dataset.schema().contains(column))
        {
            self.grouping.set_group_column(None);
        }

        let query = self.search.query();
        if !query.columns.iter().all(|c| self.dataset.schema().contains(c)) {
            let pruned = SearchQuery::new(
                query.needle.clone(),
                query
                    .columns
                    .iter()
                    .filter(|c| self.dataset.schema().contains(c))
                    .cloned()
                    .collect(),
            );
            self.search.set_query(pruned);
        }

        notifications.push(self.view_changed());
        Ok(notifications)
    }

    fn ensure_column(&self, column: &str) -> Result<tabview_model::ColumnType, EngineError> {
        self.dataset
            .schema()
            .column_type(column)
            .ok_or_else(|| EngineError::UnknownColumn { column: column.to_string() })
    }

    fn open_state(&mut self, column: &str) -> Result<&mut crate::filter::FilterState, EngineError> {
        match self.filters.get_mut(column) {
            Some(state) if state.is_open() => Ok(state),
            _ => Err(EngineError::FilterNotOpen { column: column.to_string() }),
        }
    }

    fn view_changed(&mut self) -> Notification {
        Notification::ViewChanged(self.recompute_view())
    }

    fn recompute_view(&mut self) -> View {
        let matching: Vec<RecordId> = self
            .dataset
            .records()
            .iter()
            .filter(|record| self.filters.evaluate(record))
            .map(Record::id)
            .collect();
        let groups = self.grouping.recompute(&matching, &self.dataset);
        let search_matches = self.search.recompute(&matching, &self.dataset);
        View { groups, search_matches, filter_labels: self.filters.labels() }
    }
}
