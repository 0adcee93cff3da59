//! Instrumented entry points for the crew and Gemini agents.
//!
//! Each run opens one span, annotates start, error and completion, and
//! reports latency, tokens and outcome through [`agent_telemetry`].

#![warn(missing_docs, clippy::pedantic)]

mod crew;
mod error;
mod google;
mod profile;

pub use crew::{CREW_PROFILE, TOPIC_INPUT, run_crew};
pub use error::{RunError, RunResult};
pub use google::{GOOGLE_PROFILE, run_google};
pub use profile::{AgentReply, RunProfile};
