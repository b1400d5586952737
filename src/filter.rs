//! Filtering of JSON item lists by a dotted field path.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::{Error, Result};

/// Dotted path into nested JSON, e.g. `topic.value` or `members.0`.
///
/// Object segments select keys; numeric segments also index arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArguments` if the path or any segment is empty.
    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(Error::InvalidArguments(format!(
                "invalid field path '{path}'"
            )));
        }
        Ok(Self { segments })
    }

    /// Value at this path, if every segment resolves
    #[must_use]
    pub fn get<'v>(&self, item: &'v Value) -> Option<&'v Value> {
        self.segments
            .iter()
            .try_fold(item, |current, segment| match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }
}

impl FromStr for FieldPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// Items whose value at `path` is one of `query`.
///
/// Case-sensitive matching only considers string values. Case-insensitive
/// matching also compares the JSON text of numbers and booleans. Items
/// lacking the field never match. Order is preserved.
pub fn filter_list_by<'v, S: AsRef<str>>(
    path: &FieldPath,
    query: &[S],
    items: &'v [Value],
    case_sensitive: bool,
) -> Vec<&'v Value> {
    let folded: Vec<String> = if case_sensitive {
        Vec::new()
    } else {
        query.iter().map(|q| q.as_ref().to_lowercase()).collect()
    };

    items
        .iter()
        .filter(|item| match path.get(item) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) if case_sensitive => query.iter().any(|q| q.as_ref() == s),
            Some(_) if case_sensitive => false,
            Some(Value::String(s)) => folded.contains(&s.to_lowercase()),
            Some(other) => folded.contains(&other.to_string().to_lowercase()),
        })
        .collect()
}
