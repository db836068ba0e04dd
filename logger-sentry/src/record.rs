use chrono::{DateTime, Utc};
use error_common::{ErrorDetails, ErrorInput};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

impl From<tracing::Level> for LogLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::ERROR => Self::Error,
            tracing::Level::WARN => Self::Warn,
            tracing::Level::INFO => Self::Info,
            tracing::Level::DEBUG => Self::Debug,
            _ => Self::Trace,
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

/// A log record as handed to a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    /// Error variant name for error-level records.
    pub name: Option<String>,
    /// Stack trace carried by the record, usually from an earlier error.
    pub stack: Option<String>,
    /// Stack id carried by the record, usually from an earlier error.
    #[serde(rename = "stackId")]
    pub stack_id: Option<String>,
    /// Logger name, the `tracing` target for records coming from a layer.
    pub logger: Option<String>,
    pub tags: BTreeMap<String, String>,
    /// Any other field of the record.
    pub fields: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    pub fn new<M: Into<String>>(level: LogLevel, message: M) -> Self {
        Self {
            level,
            message: message.into(),
            name: None,
            stack: None,
            stack_id: None,
            logger: None,
            tags: BTreeMap::new(),
            fields: Map::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn error<M: Into<String>>(message: M) -> Self {
        Self::new(LogLevel::Error, message)
    }

    pub fn info<M: Into<String>>(message: M) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn with_name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_stack<S: Into<String>>(mut self, stack: S) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_stack_id<S: Into<String>>(mut self, stack_id: S) -> Self {
        self.stack_id = Some(stack_id.into());
        self
    }

    pub fn with_logger<S: Into<String>>(mut self, logger: S) -> Self {
        self.logger = Some(logger.into());
        self
    }

    pub fn with_tag<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_field<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// A record seen as an error input: its message, stack id and stack.
impl From<&LogRecord> for ErrorInput {
    fn from(record: &LogRecord) -> Self {
        ErrorInput::Error {
            message: record.message.clone(),
            stack_id: record.stack_id.clone(),
            stack: record.stack.clone(),
        }
    }
}

/// Event metadata derived from a log record, shaped after Sentry's event
/// schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMeta {
    pub level: LogLevel,
    pub message: String,
    pub logger: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub extra: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl EventMeta {
    /// Extracts the fields relevant to the monitoring backend from a record.
    pub fn from_record(record: &LogRecord) -> Self {
        let mut extra = record.fields.clone();
        if let Some(stack_id) = &record.stack_id {
            extra.insert("stackId".to_string(), Value::String(stack_id.clone()));
        }

        Self {
            level: record.level,
            message: record.message.clone(),
            logger: record.logger.clone(),
            tags: record.tags.clone(),
            extra,
            timestamp: record.timestamp,
        }
    }

    /// The metadata as error details.
    pub fn to_details(&self) -> ErrorDetails {
        serde_json::to_value(self)
            .map(ErrorDetails::from)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_meta_from_record() {
        let record = LogRecord::error("boom")
            .with_tag("service", "billing")
            .with_field("invoice_id", 7)
            .with_stack_id("abc")
            .with_logger("billing::worker");

        let meta = EventMeta::from_record(&record);
        assert_eq!(meta.level, LogLevel::Error);
        assert_eq!(meta.message, "boom");
        assert_eq!(meta.logger.as_deref(), Some("billing::worker"));
        assert_eq!(meta.tags["service"], "billing");
        assert_eq!(meta.extra["invoice_id"], 7);
        assert_eq!(meta.extra["stackId"], "abc");
    }

    #[test]
    fn test_meta_details_shape() {
        let meta = EventMeta::from_record(&LogRecord::info("started").with_tag("region", "eu"));
        let details = meta.to_details();

        assert_eq!(details["level"], "info");
        assert_eq!(details["message"], "started");
        assert_eq!(details["tags"], json!({ "region": "eu" }));
        assert_eq!(details.stack_id(), None);
    }

    #[test]
    fn test_record_as_error_input() {
        let record = LogRecord::error("boom (stackId: x)").with_stack_id("x");
        let input = ErrorInput::from(&record);
        assert_eq!(input.stack_id(), Some("x"));
    }

    #[test]
    fn test_level_from_tracing() {
        assert_eq!(LogLevel::from(tracing::Level::ERROR), LogLevel::Error);
        assert_eq!(LogLevel::from(tracing::Level::TRACE), LogLevel::Trace);
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }
}
