use error_common::{parse_frames, EnrichedError};
use sentry::protocol::{Event, Exception, Frame, Level, Stacktrace};
use sentry::{Hub, Scope};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::config::SentryOptions;
use crate::error::Result;
use crate::record::{EventMeta, LogLevel};

/// The monitoring backend as seen by a sink.
///
/// Captures are fire-and-forget: implementations hand the payload over and
/// return without waiting for delivery.
#[cfg_attr(test, mockall::automock)]
pub trait MonitoringClient: Send + Sync {
    fn capture_exception(&self, error: &EnrichedError);

    fn capture_event(&self, meta: &EventMeta);
}

/// Sentry-backed monitoring client.
///
/// Owns its own hub, so several clients with different options can live in
/// one process without touching the SDK's global hub.
#[derive(Clone)]
pub struct SentryClient {
    hub: Arc<Hub>,
}

impl SentryClient {
    /// Builds the client and its hub from `options`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::InvalidDsn`](crate::error::SinkError::InvalidDsn) when the DSN cannot be parsed.
    pub fn init(options: &SentryOptions) -> Result<Self> {
        let client_options = options.to_client_options()?;
        let enabled = client_options.dsn.is_some();
        let client = Arc::new(sentry::Client::with_options(client_options));

        let hub = Arc::new(Hub::new(Some(client), Arc::new(Scope::default())));
        hub.configure_scope(|scope| {
            for (key, value) in &options.tags {
                scope.set_tag(key, value);
            }
            for (key, value) in &options.extra {
                scope.set_extra(key, value.clone());
            }
        });

        tracing::debug!(
            enabled,
            environment = ?options.environment,
            attach_stacktrace = options.attach_stacktrace,
            "Sentry client initialized"
        );
        Ok(Self { hub })
    }

    /// Uses an existing hub, for instance the SDK's current one.
    pub fn from_hub(hub: Arc<Hub>) -> Self {
        Self { hub }
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Waits up to `timeout` for queued events to be sent.
    pub fn flush(&self, timeout: Duration) -> bool {
        self.hub
            .client()
            .map_or(true, |client| client.flush(Some(timeout)))
    }
}

impl MonitoringClient for SentryClient {
    fn capture_exception(&self, error: &EnrichedError) {
        self.hub.capture_event(exception_event(error));
    }

    fn capture_event(&self, meta: &EventMeta) {
        self.hub.capture_event(meta_event(meta));
    }
}

/// Sentry level for a record level.
pub fn sentry_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Error => Level::Error,
        LogLevel::Warn => Level::Warning,
        LogLevel::Info => Level::Info,
        LogLevel::Debug | LogLevel::Trace => Level::Debug,
    }
}

/// Event for a generic (non-error) record.
pub fn meta_event(meta: &EventMeta) -> Event<'static> {
    Event {
        level: sentry_level(meta.level),
        message: Some(meta.message.clone()),
        logger: meta.logger.clone(),
        tags: meta.tags.clone().into_iter().collect(),
        extra: meta.extra.clone().into_iter().collect(),
        timestamp: SystemTime::from(meta.timestamp),
        ..Default::default()
    }
}

/// Event for an enriched error.
///
/// The exception list holds the error and its sources, root cause first. The
/// error's details feed the event's tags and extra data, and the error itself
/// is kept under its name as extra data.
pub fn exception_event(error: &EnrichedError) -> Event<'static> {
    let plain = error.to_plain_object();
    let details = error.details();

    let mut exceptions = vec![Exception {
        ty: error.name().to_string(),
        value: Some(plain.message.clone()),
        stacktrace: stacktrace_from_text(&plain.stack),
        ..Default::default()
    }];
    let mut cause = std::error::Error::source(error);
    while let Some(source) = cause {
        exceptions.push(Exception {
            ty: "Error".to_string(),
            value: Some(source.to_string()),
            ..Default::default()
        });
        cause = source.source();
    }
    exceptions.reverse();

    let mut event = Event {
        level: Level::Error,
        exception: exceptions.into(),
        logger: details.get("logger").and_then(Value::as_str).map(ToString::to_string),
        ..Default::default()
    };

    if let Some(Value::Object(tags)) = details.get("tags") {
        for (key, value) in tags {
            let value = value.as_str().map_or_else(|| value.to_string(), ToString::to_string);
            event.tags.insert(key.clone(), value);
        }
    }
    event.tags.insert("stackId".to_string(), error.stack_id().to_string());

    if let Some(Value::Object(extra)) = details.get("extra") {
        for (key, value) in extra {
            event.extra.insert(key.clone(), value.clone());
        }
    }
    event.extra.insert(
        error.name().to_string(),
        serde_json::json!({
            "stackId": plain.stack_id,
            "originalMessage": error.original_message(),
            "details": plain.details,
        }),
    );

    event
}

/// Sentry stack trace from stack text, oldest frame first.
pub fn stacktrace_from_text(stack: &str) -> Option<Stacktrace> {
    let mut frames: Vec<Frame> = parse_frames(stack)
        .into_iter()
        .map(|frame| Frame {
            function: Some(frame.function),
            filename: frame.file,
            lineno: frame.line.map(u64::from),
            colno: frame.column.map(u64::from),
            ..Default::default()
        })
        .collect();

    if frames.is_empty() {
        return None;
    }
    frames.reverse();
    Some(Stacktrace {
        frames,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LogRecord;
    use error_common::ErrorDetails;
    use serde_json::json;

    #[test]
    fn test_invalid_dsn() {
        let options = SentryOptions::default().with_dsn("not a dsn");
        assert!(matches!(
            SentryClient::init(&options),
            Err(crate::error::SinkError::InvalidDsn(_))
        ));
    }

    #[test]
    fn test_empty_dsn_builds_disabled_client() {
        let options = SentryOptions::default().with_dsn("");
        let client = SentryClient::init(&options).unwrap();
        assert!(client.flush(Duration::from_millis(10)));
    }

    #[test]
    fn test_exception_event_shape() {
        let details = ErrorDetails::from(json!({
            "tags": { "service": "billing" },
            "extra": { "invoice_id": 7 }
        }));
        let error = EnrichedError::builder("charge failed")
            .details(details)
            .name("PaymentError")
            .build();

        let event = exception_event(&error);
        let exception = &event.exception.values[0];

        assert_eq!(event.level, Level::Error);
        assert_eq!(exception.ty, "PaymentError");
        assert_eq!(exception.value.as_deref(), Some(error.to_string().as_str()));
        assert_eq!(event.tags["service"], "billing");
        assert_eq!(event.tags["stackId"], error.stack_id());
        assert_eq!(event.extra["invoice_id"], 7);
        assert_eq!(event.extra["PaymentError"]["stackId"], error.stack_id());
    }

    #[test]
    fn test_exception_event_includes_causes() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
        let error = EnrichedError::wrap(io);

        let event = exception_event(&error);
        let types: Vec<&str> = event.exception.values.iter().map(|e| e.ty.as_str()).collect();
        assert_eq!(types, ["Error", "EnrichedError"]);
    }

    #[test]
    fn test_meta_event_shape() {
        let record = LogRecord::new(LogLevel::Warn, "disk at 91%").with_tag("host", "db-1");
        let event = meta_event(&EventMeta::from_record(&record));

        assert_eq!(event.level, Level::Warning);
        assert_eq!(event.message.as_deref(), Some("disk at 91%"));
        assert_eq!(event.tags["host"], "db-1");
    }

    #[test]
    fn test_stacktrace_is_oldest_first() {
        let stack = "EnrichedError: x\n    at app::inner (src/a.rs:2:1)\n    at app::main (src/main.rs:9:5)";
        let trace = stacktrace_from_text(stack).unwrap();

        assert_eq!(trace.frames[0].function.as_deref(), Some("app::main"));
        assert_eq!(trace.frames[1].lineno, Some(2));
        assert!(stacktrace_from_text("EnrichedError: x").is_none());
    }
}
