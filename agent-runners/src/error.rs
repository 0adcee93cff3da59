use agent_adapters::traits::AdapterError;
use agent_crew::CrewError;
use thiserror::Error;

/// Result alias for instrumented runs.
pub type RunResult<T> = Result<T, RunError>;

/// Failure of an instrumented agent run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The model call failed.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// The crew could not complete its tasks.
    #[error(transparent)]
    Crew(#[from] CrewError),
}

impl RunError {
    /// Failure class recorded as the `error.type` attribute.
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Adapter(err) => err.kind(),
            Self::Crew(err) => err.kind(),
        }
    }
}
