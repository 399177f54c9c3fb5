use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::ColumnSchema;
use crate::value::ColumnValue;

/// Stable identifier of a record, unique for the dataset's lifetime.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur when loading a dataset.
///
/// A failing load is rejected atomically: no partial dataset is ever
/// observable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasetError {
    #[error("duplicate record identifier: {id}")]
    DuplicateIdentifier { id: RecordId },
    #[error("record {id} references unknown column: {column}")]
    UnknownColumn { id: RecordId, column: String },
    #[error("record {id} holds a value of the wrong type for column {column}")]
    TypeMismatch { id: RecordId, column: String },
}

/// One row: an identifier plus a sparse column-name → value mapping.
///
/// A record may omit values for schema columns (the widget renders those as
/// blanks); it may not carry values for columns outside the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    values: BTreeMap<String, ColumnValue>,
}

impl Record {
    pub fn new(id: RecordId) -> Self {
        Self { id, values: BTreeMap::new() }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<ColumnValue>) {
        self.values.insert(column.into(), value.into());
    }

    /// Builder-style variant of [`Record::insert`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<ColumnValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn value(&self, column: &str) -> Option<&ColumnValue> {
        self.values.get(column)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// The in-memory dataset: a schema plus records in load order.
///
/// Load order is authoritative: filtering, grouping, and search all preserve
/// it, so the view's row order is a stable function of the dataset alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dataset {
    schema: ColumnSchema,
    records: Vec<Record>,
    #[serde(skip)]
    index: HashMap<RecordId, usize>,
}

impl Dataset {
    /// Validates and loads `records` against `schema`.
    ///
    /// Rejects duplicate identifiers, values for unknown columns, and values
    /// whose type contradicts the column declaration. On error nothing is
    /// loaded.
    pub fn new(schema: ColumnSchema, records: Vec<Record>) -> Result<Self, DatasetError> {
        let mut index = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            if index.insert(record.id, position).is_some() {
                return Err(DatasetError::DuplicateIdentifier { id: record.id });
            }
            for (column, value) in record.values() {
                let Some(ty) = schema.column_type(column) else {
                    return Err(DatasetError::UnknownColumn {
                        id: record.id,
                        column: column.to_string(),
                    });
                };
                if !ty.accepts(value) {
                    return Err(DatasetError::TypeMismatch {
                        id: record.id,
                        column: column.to_string(),
                    });
                }
            }
        }
        Ok(Self { schema, records, index })
    }

    /// An empty dataset with an empty schema.
    pub fn empty() -> Self {
        Self {
            schema: ColumnSchema::default(),
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    /// Records in load order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record(&self, id: RecordId) -> Option<&Record> {
        self.index.get(&id).map(|&i| &self.records[i])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, ColumnType};
    use pretty_assertions::assert_eq;

    fn schema() -> ColumnSchema {
        ColumnSchema::new(vec![
            Column::new("name", ColumnType::Text),
            Column::new("age", ColumnType::Integer),
            Column::new("city", ColumnType::Tag),
        ])
        .unwrap()
    }

    #[test]
    fn duplicate_identifiers_reject_the_whole_load() {
        let records = vec![
            Record::new(RecordId(1)).with("name", "Alice"),
            Record::new(RecordId(2)).with("name", "Bob"),
            Record::new(RecordId(1)).with("name", "Charlie"),
        ];
        let err = Dataset::new(schema(), records).unwrap_err();
        assert_eq!(err, DatasetError::DuplicateIdentifier { id: RecordId(1) });
    }

    #[test]
    fn unknown_column_rejects_the_load() {
        let records = vec![Record::new(RecordId(1)).with("country", "US")];
        let err = Dataset::new(schema(), records).unwrap_err();
        assert_eq!(
            err,
            DatasetError::UnknownColumn { id: RecordId(1), column: "country".into() }
        );
    }

    #[test]
    fn type_mismatch_rejects_the_load() {
        let records = vec![Record::new(RecordId(1)).with("age", "thirty")];
        let err = Dataset::new(schema(), records).unwrap_err();
        assert_eq!(
            err,
            DatasetError::TypeMismatch { id: RecordId(1), column: "age".into() }
        );
    }

    #[test]
    fn lookup_by_id_and_load_order() {
        let records = vec![
            Record::new(RecordId(10)).with("name", "Alice").with("age", 30i64),
            Record::new(RecordId(7)).with("name", "Bob"),
        ];
        let dataset = Dataset::new(schema(), records).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records()[0].id(), RecordId(10));
        assert_eq!(
            dataset.record(RecordId(7)).unwrap().value("name"),
            Some(&ColumnValue::Text("Bob".into()))
        );
        assert_eq!(dataset.record(RecordId(99)), None);
    }

    #[test]
    fn sparse_records_are_allowed() {
        let records = vec![Record::new(RecordId(1))];
        let dataset = Dataset::new(schema(), records).unwrap();
        assert_eq!(dataset.record(RecordId(1)).unwrap().value("city"), None);
    }
}
