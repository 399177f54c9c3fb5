use std::fmt;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use tabview_model::{ColumnValue, Dataset, RecordId};

/// Sentinel group label for records with no value in the grouping column.
pub const UNGROUPED_LABEL: &str = "_others";

/// Identity of a group within one view recomputation.
///
/// `Ungrouped` orders after every `Value` key, so the sentinel group sorts
/// last under [`GroupOrder::SortedByKey`].
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum GroupKey {
    Value(ColumnValue),
    Ungrouped,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Value(value) => value.fmt(f),
            GroupKey::Ungrouped => f.write_str(UNGROUPED_LABEL),
        }
    }
}

/// One group in the computed view: its key, the matching records it contains
/// (in dataset load order), and its expansion flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub key: GroupKey,
    pub record_ids: Vec<RecordId>,
    pub expanded: bool,
}

/// How groups are ordered in the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOrder {
    /// Order of first appearance among the matching records.
    #[default]
    FirstSeen,
    /// Ascending by key, the ungrouped sentinel last.
    SortedByKey,
}

/// Partitions the filtered record set by the value of one column.
///
/// Expansion flags are keyed by [`GroupKey`] and survive recomputation: a
/// group that reappears keeps its previous flag, a new group starts expanded,
/// and flags for vanished groups are dropped.
#[derive(Debug, Clone, Default)]
pub struct GroupingEngine {
    column: Option<String>,
    order: GroupOrder,
    expanded: AHashMap<GroupKey, bool>,
}

impl GroupingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn order(&self) -> GroupOrder {
        self.order
    }

    /// Selects the grouping column, or `None` to disable grouping.
    ///
    /// Changing the column discards the expansion flags; they are keyed by
    /// the old column's values and mean nothing under the new one.
    pub fn set_group_column(&mut self, column: Option<String>) {
        if self.column != column {
            self.expanded.clear();
            self.column = column;
        }
    }

    pub fn set_order(&mut self, order: GroupOrder) {
        self.order = order;
    }

    pub fn set_expanded(&mut self, key: &GroupKey, expanded: bool) {
        if let Some(flag) = self.expanded.get_mut(key) {
            *flag = expanded;
        }
    }

    /// Sets every current group's flag. A no-op when no groups exist.
    pub fn expand_all(&mut self) {
        for flag in self.expanded.values_mut() {
            *flag = true;
        }
    }

    pub fn collapse_all(&mut self) {
        for flag in self.expanded.values_mut() {
            *flag = false;
        }
    }

    /// Partitions `matching` (ids in dataset load order) into groups.
    ///
    /// Every input id lands in exactly one group; records without a value in
    /// the grouping column fall into the `_others` sentinel group. With
    /// grouping disabled, a single implicit group holds all matching records.
    pub fn recompute(&mut self, matching: &[RecordId], dataset: &Dataset) -> Vec<Group> {
        let mut groups = self.partition(matching, dataset);
        if self.order == GroupOrder::SortedByKey {
            groups.sort_by(|a, b| a.key.cmp(&b.key));
        }

        // Carry flags forward for surviving keys, then forget the rest.
        let mut next = AHashMap::with_capacity(groups.len());
        for group in &mut groups {
            group.expanded = self.expanded.get(&group.key).copied().unwrap_or(true);
            next.insert(group.key.clone(), group.expanded);
        }
        self.expanded = next;

        groups
    }

    fn partition(&self, matching: &[RecordId], dataset: &Dataset) -> Vec<Group> {
        let Some(column) = self.column.as_deref() else {
            return vec![Group {
                key: GroupKey::Ungrouped,
                record_ids: matching.to_vec(),
                expanded: true,
            }];
        };

        let mut groups: Vec<Group> = Vec::new();
        let mut positions: AHashMap<GroupKey, usize> = AHashMap::new();
        for &id in matching {
            let key = dataset
                .record(id)
                .and_then(|record| record.value(column))
                .map(|value| GroupKey::Value(value.clone()))
                .unwrap_or(GroupKey::Ungrouped);
            let position = *positions.entry(key.clone()).or_insert_with(|| {
                groups.push(Group { key, record_ids: Vec::new(), expanded: true });
                groups.len() - 1
            });
            groups[position].record_ids.push(id);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabview_model::{Column, ColumnSchema, ColumnType, Record};

    fn dataset() -> Dataset {
        let schema = ColumnSchema::new(vec![
            Column::new("name", ColumnType::Text),
            Column::new("city", ColumnType::Tag),
        ])
        .unwrap();
        let records = vec![
            Record::new(RecordId(1))
                .with("name", "Alice")
                .with("city", ColumnValue::Tag("NY".into())),
            Record::new(RecordId(2))
                .with("name", "Bob")
                .with("city", ColumnValue::Tag("LA".into())),
            Record::new(RecordId(3)).with("name", "Charlie"),
            Record::new(RecordId(4))
                .with("name", "Dana")
                .with("city", ColumnValue::Tag("NY".into())),
        ];
        Dataset::new(schema, records).unwrap()
    }

    fn all_ids(dataset: &Dataset) -> Vec<RecordId> {
        dataset.records().iter().map(|r| r.id()).collect()
    }

    fn keys(groups: &[Group]) -> Vec<String> {
        groups.iter().map(|g| g.key.to_string()).collect()
    }

    #[test]
    fn groups_appear_in_first_seen_order_with_sentinel_for_missing_values() {
        let dataset = dataset();
        let mut engine = GroupingEngine::new();
        engine.set_group_column(Some("city".into()));

        let groups = engine.recompute(&all_ids(&dataset), &dataset);
        assert_eq!(keys(&groups), vec!["NY", "LA", "_others"]);
        assert_eq!(groups[0].record_ids, vec![RecordId(1), RecordId(4)]);
        assert_eq!(groups[1].record_ids, vec![RecordId(2)]);
        assert_eq!(groups[2].record_ids, vec![RecordId(3)]);
        assert!(groups.iter().all(|g| g.expanded));
    }

    #[test]
    fn sorted_by_key_puts_the_sentinel_last() {
        let dataset = dataset();
        let mut engine = GroupingEngine::new();
        engine.set_group_column(Some("city".into()));
        engine.set_order(GroupOrder::SortedByKey);

        let groups = engine.recompute(&all_ids(&dataset), &dataset);
        assert_eq!(keys(&groups), vec!["LA", "NY", "_others"]);
    }

    #[test]
    fn disabled_grouping_yields_one_implicit_group() {
        let dataset = dataset();
        let mut engine = GroupingEngine::new();

        let groups = engine.recompute(&all_ids(&dataset), &dataset);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, GroupKey::Ungrouped);
        assert_eq!(groups[0].record_ids, all_ids(&dataset));
        assert!(groups[0].expanded);
    }

    #[test]
    fn expansion_flags_survive_recomputation() {
        let dataset = dataset();
        let mut engine = GroupingEngine::new();
        engine.set_group_column(Some("city".into()));
        engine.recompute(&all_ids(&dataset), &dataset);

        let la = GroupKey::Value(ColumnValue::Tag("LA".into()));
        engine.set_expanded(&la, false);

        // Narrow the match set so LA vanishes, then widen it back.
        let without_la = vec![RecordId(1), RecordId(3), RecordId(4)];
        let groups = engine.recompute(&without_la, &dataset);
        assert_eq!(keys(&groups), vec!["NY", "_others"]);

        // LA's flag was dropped with the group; it comes back expanded.
        let groups = engine.recompute(&all_ids(&dataset), &dataset);
        let la_group = groups.iter().find(|g| g.key == la).unwrap();
        assert!(la_group.expanded);
    }

    #[test]
    fn collapse_all_then_expand_all() {
        let dataset = dataset();
        let mut engine = GroupingEngine::new();
        engine.set_group_column(Some("city".into()));
        engine.recompute(&all_ids(&dataset), &dataset);

        engine.collapse_all();
        let once = engine.recompute(&all_ids(&dataset), &dataset);
        assert!(once.iter().all(|g| !g.expanded));

        // Idempotent: a second collapse changes nothing.
        engine.collapse_all();
        let twice = engine.recompute(&all_ids(&dataset), &dataset);
        assert_eq!(once, twice);

        engine.expand_all();
        let groups = engine.recompute(&all_ids(&dataset), &dataset);
        assert!(groups.iter().all(|g| g.expanded));
    }

    #[test]
    fn changing_the_group_column_resets_expansion_flags() {
        let dataset = dataset();
        let mut engine = GroupingEngine::new();
        engine.set_group_column(Some("city".into()));
        engine.recompute(&all_ids(&dataset), &dataset);
        engine.collapse_all();

        engine.set_group_column(Some("name".into()));
        let groups = engine.recompute(&all_ids(&dataset), &dataset);
        assert!(groups.iter().all(|g| g.expanded));
    }

    #[test]
    fn reselecting_the_same_column_keeps_flags() {
        let dataset = dataset();
        let mut engine = GroupingEngine::new();
        engine.set_group_column(Some("city".into()));
        engine.recompute(&all_ids(&dataset), &dataset);
        engine.collapse_all();

        engine.set_group_column(Some("city".into()));
        let groups = engine.recompute(&all_ids(&dataset), &dataset);
        assert!(groups.iter().all(|g| !g.expanded));
    }

    #[test]
    fn group_key_serde_round_trip() {
        let key = GroupKey::Value(ColumnValue::Tag("sq010".into()));
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "value",
                "value": { "type": "tag", "value": "sq010" }
            })
        );
        let back: GroupKey = serde_json::from_value(json).unwrap();
        assert_eq!(back, key);

        let json = serde_json::to_value(GroupKey::Ungrouped).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "ungrouped" }));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;
        use std::collections::BTreeSet;

        fn tagged_dataset(ids: &BTreeSet<u64>, buckets: u64) -> Dataset {
            let schema = ColumnSchema::new(vec![Column::new("bucket", ColumnType::Tag)])
                .unwrap();
            let records = ids
                .iter()
                .map(|&id| {
                    let record = Record::new(RecordId(id));
                    if id % (buckets + 1) == buckets {
                        record
                    } else {
                        record.with(
                            "bucket",
                            ColumnValue::Tag(format!("b{}", id % (buckets + 1))),
                        )
                    }
                })
                .collect();
            Dataset::new(schema, records).unwrap()
        }

        proptest! {
            #[test]
            fn partition_is_exact(
                ids in proptest::collection::btree_set(0u64..200, 0..40),
                buckets in 1u64..5,
            ) {
                let dataset = tagged_dataset(&ids, buckets);
                let matching: Vec<RecordId> =
                    dataset.records().iter().map(|r| r.id()).collect();

                let mut engine = GroupingEngine::new();
                engine.set_group_column(Some("bucket".into()));
                let groups = engine.recompute(&matching, &dataset);

                let mut seen = BTreeSet::new();
                let mut total = 0usize;
                for group in &groups {
                    prop_assert!(!group.record_ids.is_empty());
                    total += group.record_ids.len();
                    for id in &group.record_ids {
                        prop_assert!(seen.insert(*id));
                    }
                }
                prop_assert_eq!(total, matching.len());
                prop_assert_eq!(seen, matching.iter().copied().collect::<BTreeSet<_>>());
            }
        }
    }
}
