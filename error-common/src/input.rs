use std::fmt::Display;

use crate::types::EnrichedError;

/// What an [`EnrichedError`] is built from.
///
/// - [`ErrorInput::Error`] is anything carrying a message, possibly with the
///   stack id and stack trace of an earlier error. Its message is stripped of
///   a previous stack id suffix.
/// - [`ErrorInput::Text`] is a plain textual representation, used verbatim.
/// - [`ErrorInput::Empty`] has nothing usable; the message stays empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ErrorInput {
    Error {
        message: String,
        stack_id: Option<String>,
        stack: Option<String>,
    },
    Text(String),
    #[default]
    Empty,
}

impl ErrorInput {
    /// Input carrying a message only.
    pub fn message<M: Into<String>>(message: M) -> Self {
        Self::Error {
            message: message.into(),
            stack_id: None,
            stack: None,
        }
    }

    /// Input from any displayable value.
    pub fn display<T: Display + ?Sized>(value: &T) -> Self {
        Self::Text(value.to_string())
    }

    /// Input from an arbitrary error. An enriched error keeps its identity.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        match error.downcast_ref::<EnrichedError>() {
            Some(enriched) => Self::from(enriched),
            None => Self::message(error.to_string()),
        }
    }

    /// Stack id carried by the input, if any.
    pub fn stack_id(&self) -> Option<&str> {
        match self {
            Self::Error { stack_id, .. } => stack_id.as_deref().filter(|id| !id.is_empty()),
            _ => None,
        }
    }

    /// Stack trace carried by the input, if any.
    pub fn stack(&self) -> Option<&str> {
        match self {
            Self::Error { stack, .. } => stack.as_deref().filter(|stack| !stack.is_empty()),
            _ => None,
        }
    }
}

impl From<&EnrichedError> for ErrorInput {
    fn from(error: &EnrichedError) -> Self {
        Self::Error {
            message: error.to_string(),
            stack_id: Some(error.stack_id().to_string()),
            stack: Some(error.stack().to_string()),
        }
    }
}

impl From<&anyhow::Error> for ErrorInput {
    fn from(error: &anyhow::Error) -> Self {
        match error.downcast_ref::<EnrichedError>() {
            Some(enriched) => Self::from(enriched),
            None => Self::message(error.to_string()),
        }
    }
}

impl From<&str> for ErrorInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ErrorInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl<T: Into<ErrorInput>> From<Option<T>> for ErrorInput {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

impl From<()> for ErrorInput {
    fn from((): ()) -> Self {
        Self::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enriched_error_keeps_identity() {
        let error = EnrichedError::new("disk full");
        let input = ErrorInput::from(&error);

        assert_eq!(input.stack_id(), Some(error.stack_id()));
        assert_eq!(input.stack(), Some(error.stack()));
    }

    #[test]
    fn test_foreign_error_uses_display() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
        let input = ErrorInput::from_error(&io);

        assert_eq!(input, ErrorInput::message("socket closed"));
        assert_eq!(input.stack_id(), None);
    }

    #[test]
    fn test_none_is_empty() {
        assert_eq!(ErrorInput::from(None::<&str>), ErrorInput::Empty);
        assert_eq!(ErrorInput::from(Some("x")), ErrorInput::Text("x".to_string()));
    }
}
