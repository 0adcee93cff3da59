//! Role-playing agents that execute a list of tasks in order.
//!
//! A [`Crew`] pairs [`Agent`]s (a role, a goal and a backstory bound to a
//! model adapter) with [`Task`]s. Kickoff interpolates the caller's inputs
//! into every task, runs the tasks sequentially and feeds earlier outputs to
//! later tasks as context.

#![warn(missing_docs, clippy::pedantic)]

mod agent;
mod crew;
mod error;
mod interpolate;
mod task;

/// Persona bound to a model adapter.
pub use agent::{Agent, AgentBuilder};
/// Crew assembly and sequential execution.
pub use crew::{Crew, CrewBuilder, CrewOutput};
/// Error type and result alias shared across the crate.
pub use error::{CrewError, CrewResult};
/// `{name}` placeholder substitution.
pub use interpolate::interpolate;
/// Units of work and their results.
pub use task::{Task, TaskOutput};
