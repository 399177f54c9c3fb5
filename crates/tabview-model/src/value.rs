use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON-friendly representation of a single cell value.
///
/// The enum uses an explicit `{type, value}` tagged layout for stable IPC.
/// All variants are totally ordered and hashable so values can serve as set
/// members and group keys.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ColumnValue {
    /// Plain string.
    Text(String),
    /// Signed integer (shot lengths, priorities, counts).
    Integer(i64),
    /// Calendar date without a time component.
    Date(NaiveDate),
    /// Element of an enumerated set (status, department, ...).
    ///
    /// Tags compare by value, never by display string, which keeps
    /// multi-select membership independent of formatting.
    Tag(String),
}

impl ColumnValue {
    /// Returns the date payload if this is a [`ColumnValue::Date`].
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            ColumnValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Text(s) | ColumnValue::Tag(s) => f.write_str(s),
            ColumnValue::Integer(n) => write!(f, "{n}"),
            // NaiveDate renders ISO-8601 (`2023-06-17`), matching the
            // widget's display format.
            ColumnValue::Date(d) => write!(f, "{d}"),
        }
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        ColumnValue::Text(value.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        ColumnValue::Text(value)
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        ColumnValue::Integer(value)
    }
}

impl From<NaiveDate> for ColumnValue {
    fn from(value: NaiveDate) -> Self {
        ColumnValue::Date(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn display_renders_dates_iso() {
        assert_eq!(ColumnValue::Date(date(2023, 6, 17)).to_string(), "2023-06-17");
    }

    #[test]
    fn display_renders_text_and_tags_verbatim() {
        assert_eq!(ColumnValue::from("SHOT001").to_string(), "SHOT001");
        assert_eq!(ColumnValue::Tag("In Progress".into()).to_string(), "In Progress");
    }

    #[test]
    fn text_and_tag_are_distinct_values() {
        // Equality is by variant + payload, not display string.
        assert_ne!(
            ColumnValue::Text("Animation".into()),
            ColumnValue::Tag("Animation".into())
        );
    }

    #[test]
    fn serde_uses_tagged_layout() {
        let json = serde_json::to_value(ColumnValue::Integer(150)).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "integer", "value": 150 }));

        let back: ColumnValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, ColumnValue::Integer(150));
    }
}
