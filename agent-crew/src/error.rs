//! Shared error definitions for crews.

use agent_adapters::traits::AdapterError;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type CrewResult<T> = Result<T, CrewError>;

/// Errors raised while assembling or running a crew.
#[derive(Debug, Error)]
pub enum CrewError {
    /// Agent definition failed validation.
    #[error("invalid agent: {reason}")]
    InvalidAgent {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Crew definition failed validation.
    #[error("invalid crew: {reason}")]
    InvalidCrew {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// A task was assigned to a role no agent plays.
    #[error("no agent with role `{role}`")]
    UnknownAgent {
        /// The role named by the task.
        role: String,
    },

    /// A `{name}` placeholder had no matching input.
    #[error("missing input `{name}`")]
    MissingInput {
        /// The placeholder name.
        name: String,
    },

    /// The model call backing a task failed.
    #[error("task `{task}` failed: {source}")]
    TaskFailed {
        /// Interpolated description of the failed task.
        task: String,
        /// Adapter failure.
        #[source]
        source: AdapterError,
    },
}

impl CrewError {
    /// Stable name of the failure class, suitable for an `error.type` attribute.
    ///
    /// Task failures report the underlying adapter failure.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAgent { .. } => "InvalidAgentError",
            Self::InvalidCrew { .. } => "InvalidCrewError",
            Self::UnknownAgent { .. } => "UnknownAgentError",
            Self::MissingInput { .. } => "MissingInputError",
            Self::TaskFailed { source, .. } => source.kind(),
        }
    }
}
