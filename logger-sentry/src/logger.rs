use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::client::SentryClient;
use crate::config::SentryOptions;
use crate::error::{Result, SinkError};
use crate::layer::SentryLayer;
use crate::sink::SentrySink;

/// Process logging with Sentry reporting.
///
/// Installs a global subscriber made of an `EnvFilter`, a console formatter
/// and a [`SentryLayer`] feeding a [`SentrySink`]. Only events at
/// `report_level` or above reach the sink. Keep the returned value
/// around to flush pending events on shutdown.
pub struct SentryLogger {
    client: SentryClient,
}

impl SentryLogger {
    /// Initializes the client and installs the global subscriber.
    ///
    /// # Errors
    ///
    /// Fails when the DSN is invalid or a global subscriber is already set.
    pub fn init(options: &SentryOptions) -> Result<Self> {
        let client = SentryClient::init(options)?;
        let sink = SentrySink::new(Arc::new(client.clone()), options);

        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true))
            .with(SentryLayer::new(Arc::new(sink)).with_max_level(options.report_level))
            .try_init()
            .map_err(|e| SinkError::Subscriber(e.to_string()))?;

        tracing::debug!(silent = options.silent, "Sentry logger installed");
        Ok(Self { client })
    }

    pub fn client(&self) -> &SentryClient {
        &self.client
    }

    /// Waits up to `timeout` for queued events to be sent.
    pub fn flush(&self, timeout: Duration) -> bool {
        self.client.flush(timeout)
    }
}
