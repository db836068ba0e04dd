use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Invalid Sentry DSN: {0}")]
    InvalidDsn(String),

    #[error("Subscriber installation failed: {0}")]
    Subscriber(String),
}

pub type Result<T> = std::result::Result<T, SinkError>;
