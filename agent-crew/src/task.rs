use agent_adapters::traits::TokenUsage;
use serde::Serialize;

/// A unit of work handed to one agent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    description: String,
    expected_output: String,
    agent: Option<String>,
}

impl Task {
    /// Creates a task; both texts may contain `{name}` placeholders.
    #[must_use]
    pub fn new(description: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            expected_output: expected_output.into(),
            agent: None,
        }
    }

    /// Assigns the task to the agent playing `role`.
    ///
    /// Unassigned tasks go to the crew's first agent.
    #[must_use]
    pub fn assigned_to(mut self, role: impl Into<String>) -> Self {
        self.agent = Some(role.into());
        self
    }

    /// Returns the raw description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the raw expected-output criteria.
    #[must_use]
    pub fn expected_output(&self) -> &str {
        &self.expected_output
    }

    /// Returns the assigned role, if any.
    #[must_use]
    pub fn agent(&self) -> Option<&str> {
        self.agent.as_deref()
    }
}

/// Result of one executed task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TaskOutput {
    /// Interpolated task description.
    pub description: String,
    /// Role of the agent that ran the task.
    pub agent: String,
    /// Text produced by the model.
    pub raw: String,
    /// Token usage reported for the call.
    pub usage: Option<TokenUsage>,
}
