//! Traceable errors for services that report to an error-monitoring backend
//!
//! This crate provides [`EnrichedError`], an error that carries a unique stack
//! id, caller-supplied [`ErrorDetails`] and a textual stack trace, and that
//! serializes to a plain `{ message, stackId, details, stack }` structure.
//!
//! # Key Features
//!
//! - **Stack ids**: a time-ordered UUID minted per error occurrence and
//!   propagated when an error is wrapped again
//! - **Stack inheritance**: a wrapped error keeps the call chain of its cause,
//!   with its own header line
//! - **Stack cleaning**: runtime-internal frames are dropped on serialization
//! - **Lenient construction**: building an error never fails
//!
//! # Example
//!
//! ```rust
//! use error_common::{EnrichedError, ErrorDetails};
//!
//! fn load_invoice(id: u64) -> Result<(), EnrichedError> {
//!     Err(EnrichedError::with_details(
//!         "invoice not found",
//!         ErrorDetails::new().with("invoice_id", id),
//!     ))
//! }
//!
//! let error = load_invoice(7).unwrap_err();
//! assert_eq!(error.details()["invoice_id"], 7);
//!
//! let json = error.to_json();
//! assert_eq!(json["stackId"], error.stack_id());
//! ```

pub mod codes;
pub mod details;
pub mod error;
pub mod input;
pub mod reporting;
pub mod sanitization;
pub mod stack;
pub mod types;

pub use codes::*;
pub use details::*;
pub use error::*;
pub use input::*;
pub use reporting::*;
pub use sanitization::*;
pub use types::*;
pub use stack::{inherit_stack_trace, parse_frames, StackFrame};
