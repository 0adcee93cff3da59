//! Shared error definitions for the telemetry pipeline.

use agent_config::ConfigError;
use opentelemetry_otlp::ExporterBuildError;
use opentelemetry_sdk::error::OTelSdkError;
use thiserror::Error;

use crate::settings::Signal;

/// Result alias used by the telemetry crate.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors raised while configuring or tearing down telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Settings are inconsistent or unsupported.
    #[error("telemetry misconfigured: {reason}")]
    Configuration {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A configuration value failed to load.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An OTLP exporter could not be constructed.
    #[error("failed to build OTLP exporter: {0}")]
    Exporter(#[from] ExporterBuildError),

    /// Pending telemetry could not be flushed.
    #[error("failed to flush {signal}: {source}")]
    Flush {
        /// Signal whose provider failed.
        signal: Signal,
        /// SDK failure.
        #[source]
        source: OTelSdkError,
    },

    /// A provider failed to shut down cleanly.
    #[error("failed to shut down {signal}: {source}")]
    Shutdown {
        /// Signal whose provider failed.
        signal: Signal,
        /// SDK failure.
        #[source]
        source: OTelSdkError,
    },

    /// Global providers were already installed by this process.
    #[error("telemetry already initialized for this process")]
    AlreadyInitialized,
}

impl TelemetryError {
    /// Convenience constructor for configuration issues.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}
