use agent_adapters::traits::{InferenceRequest, ModelAdapter, collect_response};
use agent_telemetry::Observability;

use crate::error::{RunError, RunResult};
use crate::profile::{AgentReply, RunProfile};

/// Span and events of a Gemini run.
pub const GOOGLE_PROFILE: RunProfile = RunProfile {
    span_name: "google_adk.run",
    framework: "GoogleADK",
    start_event: "adk_start",
    error_event: "adk_error",
    complete_event: "adk_complete",
};

/// Sends `prompt` to `adapter` inside a `google_adk.run` span.
///
/// # Errors
///
/// Returns [`crate::RunError::Adapter`] if the request is rejected or the
/// call fails.
pub async fn run_google(
    observability: &Observability,
    adapter: &dyn ModelAdapter,
    prompt: &str,
) -> RunResult<String> {
    GOOGLE_PROFILE
        .run(observability, adapter.metadata().model(), prompt, async {
            let request = InferenceRequest::from_prompt(prompt)?;
            let response = collect_response(adapter.infer(request).await?).await?;
            Ok::<_, RunError>(AgentReply {
                text: response.text,
                usage: response.usage,
            })
        })
        .await
}
