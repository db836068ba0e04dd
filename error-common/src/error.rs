use thiserror::Error;

/// Failures of the optional helpers around an enriched error.
///
/// Constructing an [`crate::EnrichedError`] never fails; these only surface from
/// stack cleaners and from JSON text rendering.
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Stack cleaning failed: {0}")]
    StackClean(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CommonError>;
