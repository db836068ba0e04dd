// Error reporting utilities
// Serialized form of an enriched error and structured tracing output

use serde::{Deserialize, Serialize};

use crate::details::ErrorDetails;
use crate::types::EnrichedError;

/// Plain `{ message, stackId, details, stack }` form of an [`EnrichedError`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlainError {
    pub message: String,
    #[serde(rename = "stackId")]
    pub stack_id: String,
    pub details: ErrorDetails,
    pub stack: String,
}

/// Emits the error as a structured `tracing` error event.
///
/// The `stack_id`, `name` and `stack` fields let a tracing-based sink rebuild
/// the error with the same identity.
pub fn report(error: &EnrichedError) {
    tracing::error!(
        stack_id = %error.stack_id(),
        name = %error.name(),
        stack = %error.stack(),
        "{}",
        error
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_error_keys() {
        let error = EnrichedError::with_details("boom", json!({ "code": 42 }));
        let value = serde_json::to_value(error.to_plain_object()).unwrap();
        let object = value.as_object().unwrap();

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["details", "message", "stack", "stackId"]);
        assert_eq!(object["details"], json!({ "code": 42 }));
    }
}
