use thiserror::Error;

/// Result type used across the EGP core crate.
pub type Result<T> = std::result::Result<T, EgpError>;

/// Failures of the shared node plumbing: JSON encoding, configuration and
/// subscriber setup.
#[derive(Debug, Error)]
pub enum EgpError {
    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("deserialization error: {0}")]
    DeserializationError(String),

    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("logging setup failed: {0}")]
    LoggingError(String),
}

/// A node setting that could not be read from the environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}
