use std::collections::BTreeSet;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use tabview_model::{Dataset, RecordId};

use crate::error::EngineError;

/// A search request: the text to look for and the columns to look in.
///
/// An empty `columns` list means all schema columns. Needles containing `*`
/// or `?` are treated as wildcard patterns anchored at both ends; everything
/// else is a case-insensitive substring match.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub needle: String,
    pub columns: Vec<String>,
}

impl SearchQuery {
    pub fn new(needle: impl Into<String>, columns: Vec<String>) -> Self {
        Self { needle: needle.into(), columns }
    }

    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
enum Matcher {
    /// Empty needle: every record matches.
    #[default]
    All,
    Substring(String),
    Wildcard(Regex),
}

impl Matcher {
    fn compile(needle: &str) -> Self {
        if needle.is_empty() {
            Matcher::All
        } else if needle.contains(['*', '?']) {
            match wildcard_regex(needle) {
                Some(regex) => Matcher::Wildcard(regex),
                // Pattern too large to compile; fall back to literal text.
                None => Matcher::Substring(needle.to_string()),
            }
        } else {
            Matcher::Substring(needle.to_string())
        }
    }

    fn matches(&self, haystack: &str) -> bool {
        match self {
            Matcher::All => true,
            Matcher::Substring(needle) => contains_ignore_case(haystack, needle),
            Matcher::Wildcard(regex) => regex.is_match(haystack),
        }
    }
}

/// Translates a `*`/`?` wildcard pattern into an anchored regex.
fn wildcard_regex(pattern: &str) -> Option<Regex> {
    let mut source = String::with_capacity(pattern.len() + 2);
    source.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            ch => source.push_str(&regex::escape(ch.encode_utf8(&mut [0u8; 4]))),
        }
    }
    source.push('$');
    RegexBuilder::new(&source).case_insensitive(true).build().ok()
}

/// Case-insensitive substring test with an allocation-free ASCII fast path.
fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    if haystack.is_ascii() && needle.is_ascii() {
        if needle.len() > haystack.len() {
            return false;
        }
        return haystack
            .as_bytes()
            .windows(needle.len())
            .any(|window| window.eq_ignore_ascii_case(needle.as_bytes()));
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Computes the highlight set: which of the view's records match the search
/// query. Search never hides rows; the result annotates the view.
#[derive(Debug, Clone, Default)]
pub struct SearchEngine {
    query: SearchQuery,
    matcher: Matcher,
}

impl SearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn set_query(&mut self, query: SearchQuery) {
        self.matcher = Matcher::compile(&query.needle);
        self.query = query;
    }

    pub fn clear(&mut self) {
        self.set_query(SearchQuery::default());
    }

    /// Returns the ids among `matching` whose scanned columns contain the
    /// needle. An empty query matches every record.
    pub fn recompute(&self, matching: &[RecordId], dataset: &Dataset) -> BTreeSet<RecordId> {
        if self.query.is_empty() {
            return matching.iter().copied().collect();
        }
        let scanned: Vec<&str> = if self.query.columns.is_empty() {
            dataset.schema().names().collect()
        } else {
            self.query.columns.iter().map(String::as_str).collect()
        };
        matching
            .iter()
            .copied()
            .filter(|&id| {
                dataset.record(id).is_some_and(|record| {
                    scanned.iter().any(|column| {
                        record
                            .value(column)
                            .map_or(false, |value| self.matcher.matches(&value.to_string()))
                    })
                })
            })
            .collect()
    }
}

/// Rejects queries naming columns outside the schema.
pub(crate) fn validate_query(query: &SearchQuery, dataset: &Dataset) -> Result<(), EngineError> {
    for column in &query.columns {
        if !dataset.schema().contains(column) {
            return Err(EngineError::UnknownColumn { column: column.clone() });
        }
    }
    Ok(())
}
