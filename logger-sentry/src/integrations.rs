//! Event processors installed on the Sentry client.

use error_common::{keys, STACK_ID_MARKER};
use sentry::protocol::Event;
use sentry::{ClientOptions, Integration};
use serde_json::Value;

use crate::config::DEFAULT_ERROR_DATA_DEPTH;
use crate::redactor::PiiRedactor;

/// Keeps nested error data attached to events, cut at a fixed depth.
///
/// Extra values nested deeper than `depth` are replaced by a `[Object]` or
/// `[Array]` placeholder so deeply nested causes cannot blow up the payload.
#[derive(Debug, Clone, Copy)]
pub struct ExtraErrorData {
    depth: usize,
}

impl Default for ExtraErrorData {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_DATA_DEPTH)
    }
}

impl ExtraErrorData {
    pub fn new(depth: usize) -> Self {
        Self { depth }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Integration for ExtraErrorData {
    fn name(&self) -> &'static str {
        "extra-error-data"
    }

    fn process_event(&self, mut event: Event<'static>, _options: &ClientOptions) -> Option<Event<'static>> {
        for value in event.extra.values_mut() {
            *value = normalize_depth(value, self.depth);
        }
        Some(event)
    }
}

/// Copy of `value` with containers below `depth` levels replaced by markers.
pub fn normalize_depth(value: &Value, depth: usize) -> Value {
    match value {
        Value::Object(_) if depth == 0 => Value::String("[Object]".to_string()),
        Value::Array(_) if depth == 0 => Value::String("[Array]".to_string()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), normalize_depth(item, depth - 1)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| normalize_depth(item, depth - 1))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Scrubs PII from messages, exceptions, tags and extra data.
///
/// Stack ids are left untouched: the `stackId` tag, `stackId` keys in extra
/// data and the ` (stackId: ...)` suffix of messages.
#[derive(Debug, Clone, Default)]
pub struct RedactionIntegration {
    redactor: PiiRedactor,
}

impl RedactionIntegration {
    pub fn new(redactor: PiiRedactor) -> Self {
        Self { redactor }
    }

    fn redact_message(&self, text: &str) -> String {
        match text.find(STACK_ID_MARKER) {
            Some(at) => {
                let (message, suffix) = text.split_at(at);
                format!("{}{}", self.redactor.redact(message), suffix)
            }
            None => self.redactor.redact(text),
        }
    }

    fn redact_extra(&self, value: &Value) -> Value {
        match value {
            Value::String(text) => Value::String(self.redact_message(text)),
            Value::Array(items) => Value::Array(items.iter().map(|item| self.redact_extra(item)).collect()),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, item)| {
                        if key == keys::STACK_ID {
                            (key.clone(), item.clone())
                        } else {
                            (self.redactor.redact(key), self.redact_extra(item))
                        }
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

impl Integration for RedactionIntegration {
    fn name(&self) -> &'static str {
        "pii-redaction"
    }

    fn process_event(&self, mut event: Event<'static>, _options: &ClientOptions) -> Option<Event<'static>> {
        if let Some(message) = event.message.take() {
            event.message = Some(self.redact_message(&message));
        }
        for exception in &mut event.exception.values {
            if let Some(value) = exception.value.take() {
                exception.value = Some(self.redact_message(&value));
            }
        }
        for (key, value) in &mut event.tags {
            if key != keys::STACK_ID {
                *value = self.redactor.redact(value);
            }
        }
        for (key, value) in &mut event.extra {
            if key != keys::STACK_ID {
                *value = self.redact_extra(value);
            }
        }
        Some(event)
    }
}
