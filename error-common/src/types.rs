use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::codes::DEFAULT_ERROR_NAME;
use crate::details::ErrorDetails;
use crate::error::Result;
use crate::input::ErrorInput;
use crate::reporting::PlainError;
use crate::sanitization::{InternalFrameFilter, StackCleaner};
use crate::stack::{capture_stack, inherit_stack_trace, splice_header, strip_stack_id};

type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// An error tagged with a stack id, structured details and a stack trace.
///
/// The stack id survives re-wrapping: building an enriched error from another
/// one reuses its id and inherits its stack trace, while the message drops the
/// previous ` (stackId: ...)` suffix so suffixes never pile up.
///
/// ```rust
/// use error_common::{EnrichedError, ErrorDetails};
///
/// let first = EnrichedError::new("disk full");
/// assert_eq!(first.message(), "disk full");
/// assert_eq!(first.to_string(), format!("disk full (stackId: {})", first.stack_id()));
///
/// let wrapped = EnrichedError::with_details(&first, ErrorDetails::new().with("volume", "/data"));
/// assert_eq!(wrapped.stack_id(), first.stack_id());
/// assert_eq!(wrapped.message(), "disk full");
/// ```
#[derive(Clone)]
pub struct EnrichedError {
    stack_id: String,
    message: String,
    original_message: String,
    name: String,
    details: ErrorDetails,
    stack: String,
    cleaner: Option<Arc<dyn StackCleaner>>,
    source: Option<Cause>,
}

impl EnrichedError {
    pub fn new<I: Into<ErrorInput>>(input: I) -> Self {
        Self::builder(input).build()
    }

    pub fn with_details<I, D>(input: I, details: D) -> Self
    where
        I: Into<ErrorInput>,
        D: Into<ErrorDetails>,
    {
        Self::builder(input).details(details).build()
    }

    pub fn builder<I: Into<ErrorInput>>(input: I) -> EnrichedErrorBuilder {
        EnrichedErrorBuilder::new(input.into())
    }

    /// Wraps an owned error, keeping it as the source of the new one.
    pub fn wrap<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let input = ErrorInput::from_error(&error);
        Self::builder(input).source(error).build()
    }

    pub fn stack_id(&self) -> &str {
        &self.stack_id
    }

    /// Message without the stack id suffix.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn original_message(&self) -> &str {
        &self.original_message
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    /// First line of the stack trace: `<name>: <displayed message>`.
    pub fn header(&self) -> String {
        format!("{}: {}", self.name, self)
    }

    /// Renames the error, rewriting the stack trace header to match.
    pub fn with_name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self.stack = splice_header(&self.header(), &self.stack);
        self
    }

    /// Plain `{ message, stackId, details, stack }` form of this error.
    ///
    /// The stack goes through the stack cleaner when one is installed. A
    /// cleaner failure leaves the raw stack in place.
    pub fn to_plain_object(&self) -> PlainError {
        PlainError {
            message: self.to_string(),
            stack_id: self.stack_id.clone(),
            details: self.details.clone(),
            stack: self.cleaned_stack(),
        }
    }

    /// JSON value of [`Self::to_plain_object`].
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.to_plain_object()).unwrap_or(Value::Null)
    }

    /// JSON text of [`Self::to_plain_object`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::CommonError::Serialization`] if the details cannot be
    /// rendered as JSON text.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_plain_object())?)
    }

    fn cleaned_stack(&self) -> String {
        let Some(cleaner) = &self.cleaner else {
            return self.stack.clone();
        };
        match cleaner.clean(&self.stack) {
            Ok(stack) => stack,
            Err(error) => {
                tracing::trace!(stack_id = %self.stack_id, error = %error, "Stack cleaning skipped");
                self.stack.clone()
            }
        }
    }
}

impl fmt::Display for EnrichedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (stackId: {})", self.message, self.stack_id)
    }
}

impl fmt::Debug for EnrichedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnrichedError")
            .field("name", &self.name)
            .field("stack_id", &self.stack_id)
            .field("message", &self.message)
            .field("original_message", &self.original_message)
            .field("details", &self.details)
            .field("stack", &self.stack)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl std::error::Error for EnrichedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

impl miette::Diagnostic for EnrichedError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.name))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("stackId: {}", self.stack_id)))
    }
}

impl Serialize for EnrichedError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_plain_object().serialize(serializer)
    }
}

impl From<&str> for EnrichedError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for EnrichedError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Step-by-step construction of an [`EnrichedError`].
pub struct EnrichedErrorBuilder {
    input: ErrorInput,
    details: ErrorDetails,
    name: Option<String>,
    cleaner: Option<Arc<dyn StackCleaner>>,
    source: Option<Cause>,
}

impl EnrichedErrorBuilder {
    fn new(input: ErrorInput) -> Self {
        Self {
            input,
            details: ErrorDetails::default(),
            name: None,
            cleaner: Some(Arc::new(InternalFrameFilter::default())),
            source: None,
        }
    }

    pub fn details<D: Into<ErrorDetails>>(mut self, details: D) -> Self {
        self.details = details.into();
        self
    }

    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn cleaner<C: StackCleaner + 'static>(mut self, cleaner: C) -> Self {
        self.cleaner = Some(Arc::new(cleaner));
        self
    }

    pub fn shared_cleaner(mut self, cleaner: Arc<dyn StackCleaner>) -> Self {
        self.cleaner = Some(cleaner);
        self
    }

    pub fn without_cleaner(mut self) -> Self {
        self.cleaner = None;
        self
    }

    pub fn source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn build(self) -> EnrichedError {
        let Self {
            input,
            details,
            name,
            cleaner,
            source,
        } = self;

        let generated = Uuid::now_v7().to_string();
        let adopted_id = input
            .stack_id()
            .or_else(|| details.stack_id())
            .map(ToString::to_string);
        let inherited_stack = input
            .stack()
            .or_else(|| details.stack())
            .map(ToString::to_string);

        let (message, original_message, stack_id) = match input {
            ErrorInput::Error { message, .. } => (
                strip_stack_id(&message).to_string(),
                message,
                adopted_id.unwrap_or(generated),
            ),
            ErrorInput::Text(text) => (text.clone(), text, adopted_id.unwrap_or(generated)),
            ErrorInput::Empty => (String::new(), String::new(), generated),
        };

        let mut error = EnrichedError {
            stack_id,
            message,
            original_message,
            name: name.unwrap_or_else(|| DEFAULT_ERROR_NAME.to_string()),
            details,
            stack: String::new(),
            cleaner,
            source,
        };
        error.stack = match inherited_stack {
            Some(inherited) => inherit_stack_trace(&error, &inherited),
            None => capture_stack(&error.header()),
        };
        error
    }
}
