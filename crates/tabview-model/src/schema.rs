use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::predicate::PredicateKind;
use crate::value::ColumnValue;

/// Errors that can occur when constructing a column schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("column name cannot be empty")]
    EmptyName,
    #[error("duplicate column name: {name}")]
    DuplicateName { name: String },
}

/// Declared value type of a column.
///
/// The type constrains which predicate kinds may be attached to the column:
/// date columns take date-range filters, every other type takes multi-select
/// membership filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Integer,
    Date,
    Tag,
}

impl ColumnType {
    /// The predicate kind valid against a column of this type.
    pub fn predicate_kind(self) -> PredicateKind {
        match self {
            ColumnType::Date => PredicateKind::DateRange,
            ColumnType::Text | ColumnType::Integer | ColumnType::Tag => PredicateKind::MultiSelect,
        }
    }

    /// Returns true if `value` carries this column type's payload.
    pub fn accepts(self, value: &ColumnValue) -> bool {
        matches!(
            (self, value),
            (ColumnType::Text, ColumnValue::Text(_))
                | (ColumnType::Integer, ColumnValue::Integer(_))
                | (ColumnType::Date, ColumnValue::Date(_))
                | (ColumnType::Tag, ColumnValue::Tag(_))
        )
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self { name: name.into(), ty }
    }
}

/// Ordered sequence of columns defining display and grouping order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnSchema {
    columns: Vec<Column>,
}

impl ColumnSchema {
    /// Builds a schema, rejecting empty or duplicate column names.
    pub fn new(columns: Vec<Column>) -> Result<Self, SchemaError> {
        for (i, column) in columns.iter().enumerate() {
            if column.name.is_empty() {
                return Err(SchemaError::EmptyName);
            }
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(SchemaError::DuplicateName {
                    name: column.name.clone(),
                });
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column(name).map(|c| c.ty)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_duplicate_column_names() {
        let err = ColumnSchema::new(vec![
            Column::new("shot_id", ColumnType::Text),
            Column::new("shot_id", ColumnType::Text),
        ])
        .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateName { name: "shot_id".into() });
    }

    #[test]
    fn rejects_empty_column_name() {
        let err = ColumnSchema::new(vec![Column::new("", ColumnType::Text)]).unwrap_err();
        assert_eq!(err, SchemaError::EmptyName);
    }

    #[test]
    fn predicate_kind_follows_column_type() {
        assert_eq!(ColumnType::Date.predicate_kind(), PredicateKind::DateRange);
        assert_eq!(ColumnType::Text.predicate_kind(), PredicateKind::MultiSelect);
        assert_eq!(ColumnType::Integer.predicate_kind(), PredicateKind::MultiSelect);
        assert_eq!(ColumnType::Tag.predicate_kind(), PredicateKind::MultiSelect);
    }

    #[test]
    fn lookup_preserves_declaration_order() {
        let schema = ColumnSchema::new(vec![
            Column::new("sequence", ColumnType::Tag),
            Column::new("due_date", ColumnType::Date),
        ])
        .unwrap();

        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["sequence", "due_date"]);
        assert_eq!(schema.column_type("due_date"), Some(ColumnType::Date));
        assert_eq!(schema.column_type("missing"), None);
    }
}
