//! Metric instruments recorded for every agent run.

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Counter incremented once per finished run.
pub const RUNS_TOTAL: &str = "agent_runs_total";
/// Counter accumulating tokens reported by the model.
pub const TOKENS_TOTAL: &str = "agent_tokens_total";
/// Histogram of end-to-end run latency.
pub const LATENCY_MS: &str = "agent_latency_ms";

/// The three run instruments, created from one meter.
#[derive(Clone, Debug)]
pub struct AgentInstruments {
    runs: Counter<u64>,
    tokens: Counter<u64>,
    latency: Histogram<f64>,
}

impl AgentInstruments {
    /// Registers the instruments on `meter`.
    #[must_use]
    pub fn new(meter: &Meter) -> Self {
        Self {
            runs: meter
                .u64_counter(RUNS_TOTAL)
                .with_description("Number of agent runs")
                .build(),
            tokens: meter
                .u64_counter(TOKENS_TOTAL)
                .with_description("Total tokens used by agent runs")
                .build(),
            latency: meter
                .f64_histogram(LATENCY_MS)
                .with_description("End-to-end agent latency")
                .with_unit("ms")
                .build(),
        }
    }

    /// Records one run. Tokens are added only when the model reported them.
    pub fn record(&self, latency_ms: f64, tokens: Option<u64>, attributes: &[KeyValue]) {
        self.runs.add(1, attributes);
        self.latency.record(latency_ms, attributes);
        if let Some(tokens) = tokens {
            self.tokens.add(tokens, attributes);
        }
    }
}
