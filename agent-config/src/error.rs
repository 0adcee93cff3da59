//! Shared error definitions for configuration loading.

use thiserror::Error;

/// Result alias used by configuration helpers.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while reading configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required key was absent or empty.
    #[error("missing required configuration `{key}`")]
    Missing {
        /// The key that was looked up.
        key: String,
    },

    /// A key was present but its value could not be used.
    #[error("invalid value for `{key}`: {reason}")]
    Invalid {
        /// The offending key.
        key: String,
        /// Human-readable reason for rejection.
        reason: String,
    },
}

impl ConfigError {
    /// Convenience constructor for invalid values.
    #[must_use]
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
