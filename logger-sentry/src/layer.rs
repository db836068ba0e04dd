//! `tracing` integration: every event reaching the layer becomes a
//! [`LogRecord`] handed to a [`LogSink`].
//!
//! Field conventions:
//! - `message`: the formatted message
//! - `name`, `stack`, `stack_id`: error identity, as emitted by
//!   [`error_common::report`]
//! - `tags.<key>`: a tag
//! - `log.*`: metadata of records bridged from the `log` crate, not reported
//! - anything else: extra data

use serde_json::{Number, Value};
use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::record::{LogLevel, LogRecord};
use crate::sink::LogSink;

/// Targets whose events never reach the sink: the reporting path itself and
/// the HTTP stack its transport runs on.
const INTERNAL_TARGETS: &[&str] = &[
    "logger_sentry",
    "sentry",
    "error_common::types",
    "reqwest",
    "hyper",
    "hyper_util",
    "h2",
    "rustls",
    "tokio",
    "mio",
    "want",
];

thread_local! {
    static IN_SINK: Cell<bool> = const { Cell::new(false) };
}

/// A layer forwarding `tracing` events to a sink.
///
/// Events raised while the sink is handling a record on the same thread are
/// dropped.
#[derive(Clone)]
pub struct SentryLayer {
    sink: Arc<dyn LogSink>,
    max_level: LevelFilter,
}

impl SentryLayer {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink,
            max_level: LevelFilter::TRACE,
        }
    }

    /// Forwards only events at `level` or more severe.
    pub fn with_max_level(mut self, level: LogLevel) -> Self {
        self.max_level = LevelFilter::from_level(level.into());
        self
    }
}

impl<S> Layer<S> for SentryLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() > self.max_level || is_internal(metadata.target()) {
            return;
        }
        if IN_SINK.with(Cell::get) {
            return;
        }

        let mut visitor = RecordVisitor::new(LogLevel::from(*metadata.level()));
        event.record(&mut visitor);
        let target = visitor.log_target.take();
        let target = target.as_deref().unwrap_or_else(|| metadata.target());
        if is_internal(target) {
            return;
        }
        let record = visitor.record.with_logger(target);

        IN_SINK.with(|flag| flag.set(true));
        self.sink.log(&record, Box::new(|| {}));
        IN_SINK.with(|flag| flag.set(false));
    }
}

fn is_internal(target: &str) -> bool {
    INTERNAL_TARGETS
        .iter()
        .any(|internal| target == *internal || target.starts_with(&format!("{internal}::")))
}

struct RecordVisitor {
    record: LogRecord,
    log_target: Option<String>,
}

impl RecordVisitor {
    fn new(level: LogLevel) -> Self {
        Self {
            record: LogRecord::new(level, String::new()),
            log_target: None,
        }
    }

    fn store(&mut self, field: &Field, value: Value) {
        match field.name() {
            "log.target" => self.log_target = Some(as_text(&value)),
            name if name.starts_with("log.") => {}
            "message" => self.record.message = as_text(&value),
            "name" => self.record.name = Some(as_text(&value)),
            "stack" => self.record.stack = Some(as_text(&value)),
            "stack_id" | "stackId" => self.record.stack_id = Some(as_text(&value)),
            name => match name.strip_prefix("tags.") {
                Some(tag) => {
                    self.record.tags.insert(tag.to_string(), as_text(&value));
                }
                None => {
                    self.record.fields.insert(name.to_string(), value);
                }
            },
        }
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl Visit for RecordVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        let value = Number::from_f64(value).map_or(Value::Null, Value::Number);
        self.store(field, value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.store(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.store(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.store(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.store(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.store(field, Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.store(field, Value::from(format!("{value:?}")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockMonitoringClient;
    use crate::config::SentryOptions;
    use crate::sink::SentrySink;
    use tracing_subscriber::layer::SubscriberExt;

    fn with_layer(client: MockMonitoringClient, f: impl FnOnce()) {
        let sink = SentrySink::new(Arc::new(client), &SentryOptions::default());
        let subscriber = tracing_subscriber::registry().with(SentryLayer::new(Arc::new(sink)));
        tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn test_error_event_becomes_exception() {
        let mut client = MockMonitoringClient::new();
        client
            .expect_capture_exception()
            .withf(|error| {
                error.message() == "charge failed"
                    && error.name() == "PaymentError"
                    && error.details()["tags"]["tenant"] == "acme"
                    && error.details()["extra"]["attempt"] == 3
            })
            .times(1)
            .return_const(());
        client.expect_capture_event().never();

        with_layer(client, || {
            tracing::error!(
                target: "billing",
                name = "PaymentError",
                tags.tenant = "acme",
                attempt = 3,
                "charge failed"
            );
        });
    }

    #[test]
    fn test_info_event_becomes_generic_event() {
        let mut client = MockMonitoringClient::new();
        client
            .expect_capture_event()
            .withf(|meta| {
                meta.message == "worker started"
                    && meta.level == LogLevel::Info
                    && meta.logger.as_deref() == Some("billing::worker")
                    && meta.extra["ready"] == true
            })
            .times(1)
            .return_const(());
        client.expect_capture_exception().never();

        with_layer(client, || {
            tracing::info!(target: "billing::worker", ready = true, "worker started");
        });
    }

    #[test]
    fn test_reported_error_keeps_stack_id() {
        let original = error_common::EnrichedError::new("lease expired");
        let expected = original.stack_id().to_string();

        let mut client = MockMonitoringClient::new();
        client
            .expect_capture_exception()
            .withf(move |error| error.stack_id() == expected && error.message() == "lease expired")
            .times(1)
            .return_const(());

        with_layer(client, || error_common::report(&original));
    }

    #[test]
    fn test_internal_targets_are_skipped() {
        let mut client = MockMonitoringClient::new();
        client.expect_capture_exception().never();
        client.expect_capture_event().never();

        with_layer(client, || {
            tracing::error!(target: "logger_sentry::client", "capture failed");
            tracing::info!(target: "sentry", "queue flushed");
        });
        assert!(is_internal("error_common::types"));
        assert!(!is_internal("error_common::reporting"));
        assert!(!is_internal("sentry_like_app"));
    }

    #[test]
    fn test_transport_targets_are_skipped() {
        let mut client = MockMonitoringClient::new();
        client.expect_capture_exception().never();
        client.expect_capture_event().never();

        with_layer(client, || {
            tracing::debug!(target: "hyper::client::pool", "pooling idle connection");
            tracing::error!(target: "reqwest::connect", "connection refused");
            tracing::info!(target: "h2::codec", "frame sent");
        });
    }

    #[test]
    fn test_bridged_log_target_is_checked() {
        let mut client = MockMonitoringClient::new();
        client.expect_capture_event().never();

        with_layer(client, || {
            tracing::info!(target: "log", { log.target = "hyper::proto::h1", log.line = 12 }, "flushed 0 bytes");
        });
    }

    #[test]
    fn test_bridged_log_record_reports_its_own_target() {
        let mut client = MockMonitoringClient::new();
        client
            .expect_capture_event()
            .withf(|meta| meta.logger.as_deref() == Some("billing::legacy") && meta.extra.is_empty())
            .times(1)
            .return_const(());

        with_layer(client, || {
            tracing::warn!(target: "log", { log.target = "billing::legacy", log.line = 40 }, "retrying");
        });
    }

    #[test]
    fn test_events_below_max_level_are_skipped() {
        let mut client = MockMonitoringClient::new();
        client
            .expect_capture_event()
            .withf(|meta| meta.level == LogLevel::Warn)
            .times(1)
            .return_const(());

        let sink = SentrySink::new(Arc::new(client), &SentryOptions::default());
        let layer = SentryLayer::new(Arc::new(sink)).with_max_level(LogLevel::Warn);
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!(target: "billing", "cache miss");
            tracing::info!(target: "billing", "invoice sent");
            tracing::warn!(target: "billing", "retrying");
        });
    }

    struct ChattySink {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl LogSink for ChattySink {
        fn name(&self) -> &str {
            "chatty"
        }

        fn log(&self, _record: &LogRecord, done: crate::sink::Done<'_>) {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            tracing::info!(target: "billing", "emitted while reporting");
            done();
        }
    }

    #[test]
    fn test_events_raised_by_the_sink_are_dropped() {
        let sink = Arc::new(ChattySink {
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let subscriber = tracing_subscriber::registry().with(SentryLayer::new(sink.clone()));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "billing", "invoice sent");
        });

        assert_eq!(sink.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
