//! Typed submission documents.
//!
//! Submitted values come from a small closed set instead of arbitrary JSON:
//! text, number, boolean or a list of strings.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A single submitted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Textual rendering used for exact-match filtering.
    ///
    /// Mirrors PostgreSQL's `jsonb ->> key` output so in-memory and database
    /// filtering agree.
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(items) => {
                let quoted: Vec<String> = items.iter().map(|s| quoted(s)).collect();
                format!("[{}]", quoted.join(", "))
            }
        }
    }

    /// JSON rendering in PostgreSQL's `jsonb::text` layout.
    fn to_json_text(&self) -> String {
        match self {
            FieldValue::Text(s) => quoted(s),
            other => other.as_text(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n.into())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

/// Mapping from field id to submitted value.
///
/// JSON `null` entries are dropped while deserializing, so a key whose value
/// is `null` counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SubmissionData(BTreeMap<String, FieldValue>);

impl SubmissionData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field_id: &str) -> Option<&FieldValue> {
        self.0.get(field_id)
    }

    pub fn contains(&self, field_id: &str) -> bool {
        self.0.contains_key(field_id)
    }

    pub fn insert(&mut self, field_id: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(field_id.into(), value.into());
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON text used for substring search.
    ///
    /// Laid out the way PostgreSQL prints a `jsonb` document: keys ordered by
    /// length and then bytewise, with `": "` and `", "` separators. A search
    /// for `"name": "alice"` therefore matches in memory and in the database.
    pub fn to_json_text(&self) -> String {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        let members: Vec<String> = entries
            .into_iter()
            .map(|(key, value)| format!("{}: {}", quoted(key), value.to_json_text()))
            .collect();
        format!("{{{}}}", members.join(", "))
    }
}

fn quoted(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

impl<'de> Deserialize<'de> for SubmissionData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Option<FieldValue>>::deserialize(deserializer)?;
        Ok(Self(
            raw.into_iter()
                .filter_map(|(k, v)| v.map(|v| (k, v)))
                .collect(),
        ))
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for SubmissionData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
