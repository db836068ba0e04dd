use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::Index;

use crate::codes::keys;

static NULL: Value = Value::Null;

/// Caller-supplied metadata attached to an error.
///
/// The details are an open mapping of string keys to JSON values. Building them
/// from a plain mapping performs a shallow copy of every entry, so later changes
/// to the source mapping are not observed.
///
/// ```rust
/// use error_common::ErrorDetails;
/// use serde_json::json;
///
/// let details = ErrorDetails::from(json!({ "code": 42, "field": "patient_id" }));
/// assert_eq!(details["code"], 42);
/// assert!(details["missing"].is_null());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorDetails {
    entries: Map<String, Value>,
}

impl ErrorDetails {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shallow copy of a plain mapping.
    pub fn from_map(map: &Map<String, Value>) -> Self {
        Self {
            entries: map.clone(),
        }
    }

    /// Adds an entry, builder style.
    pub fn with<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Stack id carried by the details, if it is a non-empty string.
    pub fn stack_id(&self) -> Option<&str> {
        self.non_empty_str(keys::STACK_ID)
    }

    /// Stack trace carried by the details, if it is a non-empty string.
    pub fn stack(&self) -> Option<&str> {
        self.non_empty_str(keys::STACK)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.entries
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.entries
    }

    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }
}

impl Index<&str> for ErrorDetails {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.entries.get(key).unwrap_or(&NULL)
    }
}

impl From<Map<String, Value>> for ErrorDetails {
    fn from(entries: Map<String, Value>) -> Self {
        Self { entries }
    }
}

impl From<&Map<String, Value>> for ErrorDetails {
    fn from(map: &Map<String, Value>) -> Self {
        Self::from_map(map)
    }
}

/// Objects are copied entry by entry, `null` yields empty details and any other
/// value is kept under the `value` key.
impl From<Value> for ErrorDetails {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(entries) => Self { entries },
            Value::Null => Self::default(),
            other => Self::default().with("value", other),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ErrorDetails {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl IntoIterator for ErrorDetails {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shallow_copy_from_map() {
        let mut source = Map::new();
        source.insert("code".to_string(), json!(42));

        let details = ErrorDetails::from_map(&source);
        source.insert("code".to_string(), json!(7));

        assert_eq!(details["code"], 42);
        assert_eq!(details.len(), 1);
    }

    #[test]
    fn test_stack_id_ignores_non_strings() {
        let details = ErrorDetails::from(json!({ "stackId": 12 }));
        assert_eq!(details.stack_id(), None);

        let details = ErrorDetails::from(json!({ "stackId": "" }));
        assert_eq!(details.stack_id(), None);

        let details = ErrorDetails::from(json!({ "stackId": "abc" }));
        assert_eq!(details.stack_id(), Some("abc"));
    }

    #[test]
    fn test_non_object_values() {
        assert!(ErrorDetails::from(Value::Null).is_empty());
        assert_eq!(ErrorDetails::from(json!("oops"))["value"], "oops");
    }

    #[test]
    fn test_serializes_as_plain_mapping() {
        let details: ErrorDetails = [("field", "dob")].into_iter().collect();
        assert_eq!(serde_json::to_value(&details).unwrap(), json!({ "field": "dob" }));
    }
}
