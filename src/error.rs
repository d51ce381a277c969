//! Error types for the sliding quota limiters.

use thiserror::Error;

use crate::ratelimit::UserId;

/// Main error type for admission control operations.
#[derive(Error, Debug)]
pub enum QuotaError {
    /// `add_user` was called for a key that is already registered
    #[error("user {0} is already registered")]
    DuplicateKey(UserId),

    /// A call was made against a key that was never registered (or was removed)
    #[error("user {0} is not registered; register the user before calling the service")]
    UnknownKey(UserId),

    /// Quota parameters that cannot drive a window
    #[error("Invalid quota configuration: {0}")]
    InvalidConfig(String),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for quota operations.
pub type Result<T> = std::result::Result<T, QuotaError>;
