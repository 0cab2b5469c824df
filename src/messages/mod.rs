//! Message dictionaries and dotted-key lookup
//!
//! A dictionary is a JSON object tree whose leaves are translation strings.
//! Lookup is two-phase:
//!
//! 1. Exact key membership on the root object. A root entry such as
//!    `"menu.file.open"` wins even when a nested path would also match, so
//!    dictionaries authored as flat maps keep working.
//! 2. If the key contains `.`, walk the tree segment by segment. Missing or
//!    non-object intermediates and non-string terminals are a miss.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use tercume::messages::{find_by_path, Messages};
//!
//! let messages = Messages::from_value(json!({"a": {"b": "v"}})).unwrap();
//! assert_eq!(find_by_path(&messages, "a.b"), Some("v"));
//! assert_eq!(find_by_path(&messages, "a"), None);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{Error, Result};

/// Separator between key path segments
pub const PATH_SEPARATOR: char = '.';

/// A message dictionary for one locale
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Messages(Map<String, Value>);

impl Messages {
    /// Create an empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value, which must be an object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::InvalidMessages {
                reason: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
        }
    }

    /// Parse a JSON document into a dictionary
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Read a JSON file into a dictionary
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::storage(format!("read {}", path.display()), e))?;
        Self::from_json(&content)
    }

    /// Insert or overwrite a root entry
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style [`Messages::insert`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Root entries
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume into the underlying JSON object
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Number of root entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the dictionary has no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a key, see [`find_by_path`]
    pub fn find(&self, key: &str) -> Option<&str> {
        find_by_path(self, key)
    }

    /// Deep-merge `other` into this dictionary
    ///
    /// Objects merge recursively, any other value overwrites. Keys are never
    /// removed, so merging is additive and repeatable.
    pub fn merge(&mut self, other: Messages) {
        merge_maps(&mut self.0, other.0);
    }

    /// Deep-merge `fragment` under the root key `namespace`
    pub fn merge_namespace(&mut self, namespace: &str, fragment: Messages) {
        let mut wrapper = Map::new();
        wrapper.insert(namespace.to_string(), Value::Object(fragment.0));
        merge_maps(&mut self.0, wrapper);
    }

    /// Flat view of every string leaf keyed by its dotted path
    ///
    /// Non-string leaves (numbers, arrays, null) are skipped.
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        flatten_into(&self.0, None, &mut out);
        out
    }
}

impl From<Map<String, Value>> for Messages {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Messages {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        )
    }
}

/// Resolve `key` against a dictionary
///
/// Exact root membership takes priority over the dotted path walk. Only
/// string values are ever returned.
pub fn find_by_path<'a>(messages: &'a Messages, key: &str) -> Option<&'a str> {
    if let Some(Value::String(s)) = messages.0.get(key) {
        return Some(s.as_str());
    }

    if !key.contains(PATH_SEPARATOR) {
        return None;
    }

    let mut segments = key.split(PATH_SEPARATOR);
    let first = segments.next()?;
    let mut current = messages.0.get(first)?;

    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            _ => return None,
        };
    }

    current.as_str()
}

fn merge_maps(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_maps(existing, incoming);
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

fn flatten_into(map: &Map<String, Value>, prefix: Option<&str>, out: &mut Vec<(String, String)>) {
    for (key, value) in map {
        let path = match prefix {
            Some(p) => format!("{p}{PATH_SEPARATOR}{key}"),
            None => key.clone(),
        };
        match value {
            Value::String(s) => out.push((path, s.clone())),
            Value::Object(child) => flatten_into(child, Some(&path), out),
            _ => {}
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn messages(value: Value) -> Messages {
        Messages::from_value(value).unwrap()
    }

    #[test]
    fn test_find_nested() {
        let m = messages(json!({"a": {"b": "v"}}));
        assert_eq!(find_by_path(&m, "a.b"), Some("v"));
    }

    #[test]
    fn test_find_object_is_not_found() {
        let m = messages(json!({"a": {"b": "v"}}));
        assert_eq!(find_by_path(&m, "a"), None);
    }

    #[test]
    fn test_flat_key_takes_priority() {
        let m = messages(json!({
            "menu.open": "flat",
            "menu": {"open": "nested"}
        }));
        assert_eq!(find_by_path(&m, "menu.open"), Some("flat"));
    }

    #[test]
    fn test_flat_non_string_falls_through_to_walk() {
        let m = messages(json!({
            "menu.open": 42,
            "menu": {"open": "nested"}
        }));
        assert_eq!(find_by_path(&m, "menu.open"), Some("nested"));
    }

    #[test]
    fn test_walk_short_circuits() {
        let m = messages(json!({"a": "leaf", "n": {"x": 1}}));
        assert_eq!(find_by_path(&m, "a.b"), None);
        assert_eq!(find_by_path(&m, "missing.b"), None);
        assert_eq!(find_by_path(&m, "n.x"), None);
        assert_eq!(find_by_path(&m, "n.x.y"), None);
    }

    #[test]
    fn test_from_value_rejects_non_object() {
        assert!(Messages::from_value(json!(["a"])).is_err());
        assert!(Messages::from_json("\"text\"").is_err());
    }

    #[test]
    fn test_merge_is_additive() {
        let mut m = messages(json!({"a": {"x": "1", "y": "2"}, "keep": "k"}));
        m.merge(messages(json!({"a": {"y": "two", "z": "3"}})));

        assert_eq!(m.find("a.x"), Some("1"));
        assert_eq!(m.find("a.y"), Some("two"));
        assert_eq!(m.find("a.z"), Some("3"));
        assert_eq!(m.find("keep"), Some("k"));
    }

    #[test]
    fn test_merge_namespace() {
        let mut m = messages(json!({"title": "Home"}));
        m.merge_namespace("checkout", messages(json!({"pay": {"button": "Pay now"}})));
        m.merge_namespace("checkout", messages(json!({"total": "Total"})));

        assert_eq!(m.find("checkout.pay.button"), Some("Pay now"));
        assert_eq!(m.find("checkout.total"), Some("Total"));
        assert_eq!(m.find("title"), Some("Home"));
    }

    #[test]
    fn test_flatten() {
        let m = messages(json!({
            "a": {"b": "v", "c": {"d": "w"}},
            "top": "t",
            "n": 3
        }));
        let flat = m.flatten();
        assert_eq!(
            flat,
            vec![
                ("a.b".to_string(), "v".to_string()),
                ("a.c.d".to_string(), "w".to_string()),
                ("top".to_string(), "t".to_string()),
            ]
        );
    }

    #[test]
    fn test_from_iter() {
        let m: Messages = [("hello", "Merhaba")].into_iter().collect();
        assert_eq!(m.find("hello"), Some("Merhaba"));
    }
}
