use std::fmt;
use std::sync::Arc;

use agent_adapters::traits::ModelAdapter;

use crate::error::{CrewError, CrewResult};

/// A persona that performs tasks through a model adapter.
#[derive(Clone)]
pub struct Agent {
    role: String,
    goal: String,
    backstory: String,
    adapter: Arc<dyn ModelAdapter>,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("role", &self.role)
            .field("goal", &self.goal)
            .field("provider", &self.adapter.metadata().provider())
            .field("model", &self.adapter.metadata().model())
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Starts building an agent that plays `role`.
    #[must_use]
    pub fn builder(role: impl Into<String>) -> AgentBuilder {
        AgentBuilder {
            role: role.into(),
            goal: String::new(),
            backstory: String::new(),
            adapter: None,
            temperature: None,
            max_output_tokens: None,
        }
    }

    /// Returns the agent's role.
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Returns the agent's goal.
    #[must_use]
    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// Returns the adapter the agent calls.
    #[must_use]
    pub fn adapter(&self) -> &Arc<dyn ModelAdapter> {
        &self.adapter
    }

    pub(crate) const fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    pub(crate) const fn max_output_tokens(&self) -> Option<u32> {
        self.max_output_tokens
    }

    /// System prompt describing the persona.
    #[must_use]
    pub fn persona(&self) -> String {
        format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role, self.backstory, self.goal
        )
    }
}

/// Builder for [`Agent`].
pub struct AgentBuilder {
    role: String,
    goal: String,
    backstory: String,
    adapter: Option<Arc<dyn ModelAdapter>>,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl AgentBuilder {
    /// Sets what the agent is trying to achieve.
    #[must_use]
    pub fn goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    /// Sets the background that shapes the agent's answers.
    #[must_use]
    pub fn backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = backstory.into();
        self
    }

    /// Binds the agent to a model adapter.
    #[must_use]
    pub fn adapter(mut self, adapter: Arc<dyn ModelAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Sets the sampling temperature used for every task.
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Caps the tokens generated per task.
    #[must_use]
    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Validates and builds the agent.
    ///
    /// # Errors
    ///
    /// Returns [`CrewError::InvalidAgent`] if the role, goal or backstory is
    /// blank or no adapter was supplied.
    pub fn build(self) -> CrewResult<Agent> {
        for (field, value) in [
            ("role", &self.role),
            ("goal", &self.goal),
            ("backstory", &self.backstory),
        ] {
            if value.trim().is_empty() {
                return Err(CrewError::InvalidAgent {
                    reason: format!("{field} must not be empty"),
                });
            }
        }

        let adapter = self.adapter.ok_or_else(|| CrewError::InvalidAgent {
            reason: format!("agent `{}` has no model adapter", self.role),
        })?;

        Ok(Agent {
            role: self.role,
            goal: self.goal,
            backstory: self.backstory,
            adapter,
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        })
    }
}
