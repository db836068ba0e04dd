use error_common::{EnrichedError, ErrorInput, StackCleaner, DEFAULT_ERROR_NAME};
use std::sync::Arc;

use crate::client::MonitoringClient;
use crate::config::SentryOptions;
use crate::record::{EventMeta, LogLevel, LogRecord};

/// Completion callback handed to a sink with each record.
pub type Done<'a> = Box<dyn FnOnce() + Send + 'a>;

/// An endpoint of the log pipeline.
pub trait LogSink: Send + Sync {
    fn name(&self) -> &str;

    /// Handles one record and calls `done` once the record was dispatched.
    fn log(&self, record: &LogRecord, done: Done<'_>);
}

/// Forwards log records to a monitoring client.
///
/// Error records become [`EnrichedError`]s captured as exceptions, every other
/// record is captured as a generic event.
#[derive(Clone)]
pub struct SentrySink {
    client: Arc<dyn MonitoringClient>,
    silent: bool,
    cleaner: Option<Arc<dyn StackCleaner>>,
}

impl SentrySink {
    pub const NAME: &'static str = "Sentry";

    pub fn new(client: Arc<dyn MonitoringClient>, options: &SentryOptions) -> Self {
        Self {
            client,
            silent: options.silent,
            cleaner: None,
        }
    }

    /// Stack cleaner used for the errors built from records, instead of the
    /// default frame filter.
    pub fn with_cleaner(mut self, cleaner: Arc<dyn StackCleaner>) -> Self {
        self.cleaner = Some(cleaner);
        self
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    fn error_from_record(&self, record: &LogRecord, meta: &EventMeta) -> EnrichedError {
        let name = record
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_ERROR_NAME.to_string());
        let builder = EnrichedError::builder(ErrorInput::from(record))
            .details(meta.to_details())
            .name(name);

        match &self.cleaner {
            Some(cleaner) => builder.shared_cleaner(Arc::clone(cleaner)).build(),
            None => builder.build(),
        }
    }
}

impl LogSink for SentrySink {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn log(&self, record: &LogRecord, done: Done<'_>) {
        if self.silent {
            return done();
        }

        let meta = EventMeta::from_record(record);
        if record.level == LogLevel::Error {
            let error = self.error_from_record(record, &meta);
            self.client.capture_exception(&error);
        } else {
            self.client.capture_event(&meta);
        }

        done();
    }
}
