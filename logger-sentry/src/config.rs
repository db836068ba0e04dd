// Sink configuration
use sentry::types::Dsn;
use sentry::{ClientOptions, Integration};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, SinkError};
use crate::integrations::{ExtraErrorData, RedactionIntegration};
use crate::record::LogLevel;

/// Depth used by the default nested error data integration.
pub const DEFAULT_ERROR_DATA_DEPTH: usize = 6;

/// Options of the Sentry client plus the sink's own `silent` flag.
///
/// Values left unset fall back to the SDK defaults. `integrations` replaces the
/// default integration list entirely when it is set.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentryOptions {
    /// Project DSN. Missing or empty disables reporting.
    pub dsn: Option<String>,
    /// Defaults to `SENTRY_ENVIRONMENT`, then `APP_ENV`.
    pub environment: Option<String>,
    pub release: Option<String>,
    pub server_name: Option<String>,
    pub debug: bool,
    pub sample_rate: f32,
    /// Attach a stack trace to events that are not exceptions.
    pub attach_stacktrace: bool,
    /// Tags set on every captured event.
    pub tags: BTreeMap<String, String>,
    /// Extra data set on every captured event.
    pub extra: BTreeMap<String, Value>,
    /// Scrub PII from events before they are sent.
    pub redact_pii: bool,
    /// Drop every record without reporting it.
    pub silent: bool,
    /// Least severe level forwarded by the logger's layer.
    pub report_level: LogLevel,
    #[serde(skip)]
    pub integrations: Option<Vec<Arc<dyn Integration>>>,
}

impl Default for SentryOptions {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: default_environment(),
            release: None,
            server_name: None,
            debug: false,
            sample_rate: 1.0,
            attach_stacktrace: true,
            tags: BTreeMap::new(),
            extra: BTreeMap::new(),
            redact_pii: false,
            silent: false,
            report_level: LogLevel::Info,
            integrations: None,
        }
    }
}

impl SentryOptions {
    /// Load options from `SENTRY_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            dsn: std::env::var("SENTRY_DSN").ok().filter(|value| !value.is_empty()),
            release: std::env::var("SENTRY_RELEASE").ok(),
            server_name: std::env::var("SENTRY_SERVER_NAME").ok(),
            debug: env_flag("SENTRY_DEBUG").unwrap_or(defaults.debug),
            sample_rate: std::env::var("SENTRY_SAMPLE_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sample_rate),
            attach_stacktrace: env_flag("SENTRY_ATTACH_STACKTRACE")
                .unwrap_or(defaults.attach_stacktrace),
            redact_pii: env_flag("SENTRY_REDACT_PII").unwrap_or(defaults.redact_pii),
            silent: env_flag("SENTRY_SILENT").unwrap_or(defaults.silent),
            report_level: std::env::var("SENTRY_REPORT_LEVEL")
                .ok()
                .and_then(|s| serde_json::from_value(Value::String(s.to_lowercase())).ok())
                .unwrap_or(defaults.report_level),
            ..defaults
        }
    }

    pub fn with_dsn<S: Into<String>>(mut self, dsn: S) -> Self {
        self.dsn = Some(dsn.into());
        self
    }

    pub fn with_environment<S: Into<String>>(mut self, environment: S) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_tag<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_extra<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn with_integration<I: Integration>(mut self, integration: I) -> Self {
        self.integrations
            .get_or_insert_with(Vec::new)
            .push(Arc::new(integration));
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// SDK client options for these settings.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::InvalidDsn`] when the DSN cannot be parsed.
    pub fn to_client_options(&self) -> Result<ClientOptions> {
        let dsn = self
            .dsn
            .as_deref()
            .filter(|dsn| !dsn.is_empty())
            .map(str::parse::<Dsn>)
            .transpose()
            .map_err(|e| SinkError::InvalidDsn(e.to_string()))?;

        Ok(ClientOptions {
            dsn,
            environment: self.environment.clone().map(Cow::Owned),
            release: self.release.clone().map(Cow::Owned),
            server_name: self.server_name.clone().map(Cow::Owned),
            debug: self.debug,
            sample_rate: self.sample_rate,
            attach_stacktrace: self.attach_stacktrace,
            integrations: self.effective_integrations(),
            ..ClientOptions::default()
        })
    }

    /// Caller-supplied integrations, or the defaults: nested error data and,
    /// with `redact_pii`, PII scrubbing.
    pub fn effective_integrations(&self) -> Vec<Arc<dyn Integration>> {
        if let Some(integrations) = &self.integrations {
            return integrations.clone();
        }

        let mut integrations: Vec<Arc<dyn Integration>> = vec![Arc::new(ExtraErrorData::default())];
        if self.redact_pii {
            integrations.push(Arc::new(RedactionIntegration::default()));
        }
        integrations
    }
}

impl fmt::Debug for SentryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentryOptions")
            .field("dsn", &self.dsn.as_ref().map(|_| "[set]"))
            .field("environment", &self.environment)
            .field("release", &self.release)
            .field("server_name", &self.server_name)
            .field("debug", &self.debug)
            .field("sample_rate", &self.sample_rate)
            .field("attach_stacktrace", &self.attach_stacktrace)
            .field("tags", &self.tags)
            .field("extra", &self.extra)
            .field("redact_pii", &self.redact_pii)
            .field("silent", &self.silent)
            .field("report_level", &self.report_level)
            .field(
                "integrations",
                &self
                    .integrations
                    .as_ref()
                    .map(|list| list.iter().map(|i| i.name()).collect::<Vec<_>>()),
            )
            .finish()
    }
}

fn default_environment() -> Option<String> {
    std::env::var("SENTRY_ENVIRONMENT")
        .ok()
        .filter(|value| !value.is_empty())
        .or_else(|| std::env::var("APP_ENV").ok())
        .filter(|value| !value.is_empty())
}

fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
