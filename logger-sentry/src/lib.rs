//! Log sink forwarding records to Sentry
//!
//! Error-level records are turned into [`EnrichedError`]s, carrying a stack id
//! that survives re-wrapping, and captured as exceptions. Every other record is
//! captured as a generic event.
//!
//! # Key Features
//!
//! - **Explicit client handle**: [`SentryClient`] owns its own hub, created once
//!   and shared with the sink
//! - **Silent mode**: records are acknowledged without being reported
//! - **Nested error data**: [`ExtraErrorData`] keeps error data up to 6 levels deep
//! - **PII scrubbing**: [`RedactionIntegration`] removes emails, phone numbers,
//!   SSNs, card numbers and IP addresses before events leave the process
//! - **tracing integration**: [`SentryLayer`] feeds `tracing` events to the sink
//!
//! # Example
//!
//! ```rust,no_run
//! use logger_sentry::{SentryLogger, SentryOptions};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = SentryOptions::from_env()
//!         .with_tag("service", "billing");
//!     let logger = SentryLogger::init(&options)?;
//!
//!     tracing::info!(tags.region = "eu-west-1", "billing worker started");
//!     tracing::error!(name = "PaymentError", invoice_id = 7, "charge declined");
//!
//!     logger.flush(Duration::from_secs(2));
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! ```yaml
//! sentry:
//!   dsn: "https://public@o0.ingest.sentry.io/1"
//!   environment: production
//!   attach_stacktrace: true
//!   redact_pii: true
//!   silent: false
//!   tags:
//!     service: billing
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod integrations;
pub mod layer;
pub mod logger;
pub mod macros;
pub mod record;
pub mod redactor;
pub mod sink;

pub use client::*;
pub use config::*;
pub use error::*;
pub use integrations::*;
pub use layer::SentryLayer;
pub use logger::SentryLogger;
pub use record::*;
pub use redactor::*;
pub use sink::*;

pub use error_common::{EnrichedError, ErrorDetails};

#[doc(hidden)]
pub use tracing;
