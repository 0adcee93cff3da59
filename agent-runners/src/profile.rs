//! The instrumentation wrapped around every agent call.

use std::future::Future;

use agent_adapters::traits::TokenUsage;
use agent_telemetry::{KeyValue, Observability, RunRecord, Severity, Stopwatch};
use tracing::debug;

use crate::error::RunResult;

const RESULT_EVENT: &str = "agent_result";

/// Span and event names for one kind of agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunProfile {
    /// Name of the run span.
    pub span_name: &'static str,
    /// Value of the `framework` attribute.
    pub framework: &'static str,
    /// Event added before the agent is called.
    pub start_event: &'static str,
    /// Event added when the agent fails.
    pub error_event: &'static str,
    /// Event added once the run is recorded.
    pub complete_event: &'static str,
}

/// Text and usage returned by an agent call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AgentReply {
    /// Final answer.
    pub text: String,
    /// Token usage, when the provider reported it.
    pub usage: Option<TokenUsage>,
}

impl RunProfile {
    /// Runs `call` inside a span and records its latency, tokens and outcome.
    ///
    /// The span is closed on every path; an error from `call` is returned
    /// unchanged after it has been recorded.
    ///
    /// # Errors
    ///
    /// Returns whatever `call` fails with.
    pub async fn run<F>(
        &self,
        observability: &Observability,
        model: &str,
        prompt: &str,
        call: F,
    ) -> RunResult<String>
    where
        F: Future<Output = RunResult<AgentReply>>,
    {
        let mut attributes = vec![
            KeyValue::new("framework", self.framework),
            KeyValue::new("model", model.to_owned()),
            KeyValue::new("input.prompt", prompt.to_owned()),
        ];

        let span = observability.span(self.span_name, attributes.clone());
        span.annotate(
            self.start_event,
            vec![KeyValue::new("prompt", prompt.to_owned())],
        );

        let stopwatch = Stopwatch::start();
        let outcome = span.in_context(call).await;
        let latency_ms = stopwatch.elapsed_ms();

        let mut tokens = None;
        match &outcome {
            Ok(reply) => {
                if let Some(usage) = reply.usage {
                    let usage_attributes = token_attributes(usage);
                    span.set_attributes(usage_attributes.clone());
                    attributes.extend(usage_attributes);
                    tokens = Some(usage.total());
                }
            }
            Err(err) => {
                let message = err.to_string();
                let error_attributes = vec![
                    KeyValue::new("error.type", err.error_type()),
                    KeyValue::new("error.message", message.clone()),
                ];
                attributes.extend(error_attributes.iter().cloned());
                span.annotate(self.error_event, error_attributes);
                span.fail(err.error_type(), &message);
            }
        }

        span.record_run(&RunRecord {
            latency_ms,
            tokens,
            success: outcome.is_ok(),
            attributes,
        });
        span.annotate(
            self.complete_event,
            vec![KeyValue::new("latency_ms", latency_ms)],
        );

        let reply = outcome?;
        debug!(framework = self.framework, chars = reply.text.len(), "agent replied");
        span.log(
            RESULT_EVENT,
            Severity::Info,
            reply.text.clone(),
            vec![
                KeyValue::new("framework", self.framework),
                KeyValue::new("model", model.to_owned()),
            ],
        );
        Ok(reply.text)
    }
}

fn token_attributes(usage: TokenUsage) -> Vec<KeyValue> {
    let count = |value: u64| i64::try_from(value).unwrap_or(i64::MAX);
    vec![
        KeyValue::new("tokens.prompt", count(usage.prompt_tokens)),
        KeyValue::new("tokens.completion", count(usage.completion_tokens)),
        KeyValue::new("tokens.total", count(usage.total())),
    ]
}
