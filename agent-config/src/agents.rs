//! Settings for the two example agents.

use std::fmt;

use crate::error::ConfigResult;
use crate::source::{ConfigSource, optional, required};

const DEFAULT_CREW_SERVICE: &str = "crewai-agent";
const DEFAULT_CREW_MODEL: &str = "gpt-4o-mini";
const DEFAULT_CREW_PROMPT: &str = "Why is observability critical for AI agents?";

const DEFAULT_GOOGLE_SERVICE: &str = "google-adk-agent";
const DEFAULT_GOOGLE_MODEL: &str = "gemini-1.5-pro";
const DEFAULT_GOOGLE_PROMPT: &str = "Explain observability for AI agents in 3 bullets.";

/// Settings for the crew agent backed by an OpenAI-compatible chat model.
#[derive(Clone)]
pub struct CrewAgentSettings {
    /// `service.name` reported on every signal.
    pub service_name: String,
    /// Chat model identifier.
    pub model: String,
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Optional override for the API base URL.
    pub base_url: Option<String>,
    /// Prompt used when none is given on the command line.
    pub default_prompt: String,
}

impl CrewAgentSettings {
    /// Reads `SERVICE_NAME_CREW`, `OPENAI_MODEL`, `OPENAI_API_KEY`,
    /// `OPENAI_BASE_URL` and `PROMPT`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::Missing`] if `OPENAI_API_KEY` is not set.
    pub fn from_source(source: &impl ConfigSource) -> ConfigResult<Self> {
        Ok(Self {
            service_name: optional(source, "SERVICE_NAME_CREW")
                .unwrap_or_else(|| DEFAULT_CREW_SERVICE.to_owned()),
            model: optional(source, "OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_CREW_MODEL.to_owned()),
            api_key: required(source, "OPENAI_API_KEY")?,
            base_url: optional(source, "OPENAI_BASE_URL"),
            default_prompt: optional(source, "PROMPT")
                .unwrap_or_else(|| DEFAULT_CREW_PROMPT.to_owned()),
        })
    }
}

impl fmt::Debug for CrewAgentSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrewAgentSettings")
            .field("service_name", &self.service_name)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("default_prompt", &self.default_prompt)
            .finish()
    }
}

/// Settings for the Google agent backed by Gemini.
#[derive(Clone)]
pub struct GoogleAgentSettings {
    /// `service.name` reported on every signal.
    pub service_name: String,
    /// Gemini model identifier.
    pub model: String,
    /// API key passed to the Generative Language API.
    pub api_key: String,
    /// Optional override for the API base URL.
    pub base_url: Option<String>,
    /// Prompt used when none is given on the command line.
    pub default_prompt: String,
}

impl GoogleAgentSettings {
    /// Reads `SERVICE_NAME_GOOGLE`, `GOOGLE_MODEL`, `GOOGLE_API_KEY`
    /// (falling back to `GEMINI_API_KEY`), `GOOGLE_BASE_URL` and `PROMPT`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::Missing`] if neither API key variable is set.
    pub fn from_source(source: &impl ConfigSource) -> ConfigResult<Self> {
        let api_key = match optional(source, "GEMINI_API_KEY") {
            Some(key) if optional(source, "GOOGLE_API_KEY").is_none() => key,
            _ => required(source, "GOOGLE_API_KEY")?,
        };

        Ok(Self {
            service_name: optional(source, "SERVICE_NAME_GOOGLE")
                .unwrap_or_else(|| DEFAULT_GOOGLE_SERVICE.to_owned()),
            model: optional(source, "GOOGLE_MODEL")
                .unwrap_or_else(|| DEFAULT_GOOGLE_MODEL.to_owned()),
            api_key,
            base_url: optional(source, "GOOGLE_BASE_URL"),
            default_prompt: optional(source, "PROMPT")
                .unwrap_or_else(|| DEFAULT_GOOGLE_PROMPT.to_owned()),
        })
    }
}

impl fmt::Debug for GoogleAgentSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleAgentSettings")
            .field("service_name", &self.service_name)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("default_prompt", &self.default_prompt)
            .finish()
    }
}
