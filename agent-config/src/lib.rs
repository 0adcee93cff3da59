//! Configuration management for the observed agents.
//!
//! Settings are read from a [`ConfigSource`], which is the process
//! environment in the binaries and a plain map in tests. A `.env` file is
//! merged into the environment by [`load_dotenv`] before anything is read; the
//! returned [`DotenvStatus`] is logged once a subscriber is installed.

#![warn(missing_docs, clippy::pedantic)]

mod agents;
mod error;
mod source;

/// Per-agent settings loaded at startup.
pub use agents::{CrewAgentSettings, GoogleAgentSettings};
/// Error type and result alias for configuration lookups.
pub use error::{ConfigError, ConfigResult};
/// Configuration sources and typed lookup helpers.
pub use source::{
    ConfigSource, DotenvStatus, ProcessEnv, load_dotenv, load_dotenv_from, optional, parse_or,
    required,
};
