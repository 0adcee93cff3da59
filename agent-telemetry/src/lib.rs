//! OpenTelemetry traces, metrics and logs for agent runs.
//!
//! [`Observability::init`] wires OTLP exporters for all three signals and a
//! console subscriber; [`Observability::span`] opens one span per run and
//! [`AgentSpan::record_run`] reports the run's metrics and log record.

#![warn(missing_docs, clippy::pedantic)]

mod error;
pub mod instruments;
mod logging;
mod observability;
pub mod pipeline;
pub mod settings;
mod stopwatch;

pub use error::{TelemetryError, TelemetryResult};
pub use instruments::AgentInstruments;
pub use logging::init_console_logging;
pub use observability::{AgentSpan, METRIC_ATTRIBUTE_KEYS, Observability, RunRecord};
pub use opentelemetry::KeyValue;
pub use opentelemetry::logs::Severity;
pub use pipeline::TelemetryProviders;
pub use settings::{DEFAULT_ENDPOINT, OtlpProtocol, Signal, TelemetrySettings, parse_headers};
pub use stopwatch::Stopwatch;
