//! Model adapters used by the observed agents.
//!
//! Each module exposes an implementation for a specific provider while sharing
//! a common trait-based interface defined in [`traits`]. Adapters report token
//! usage alongside the generated text so call sites can attach it to telemetry.

#![warn(missing_docs, clippy::pedantic)]

pub mod gemini;
pub mod openai;
pub mod traits;

mod http_client;
