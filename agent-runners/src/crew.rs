use std::collections::HashMap;

use agent_crew::Crew;
use agent_telemetry::Observability;

use crate::error::{RunError, RunResult};
use crate::profile::{AgentReply, RunProfile};

/// Span and events of a crew run.
pub const CREW_PROFILE: RunProfile = RunProfile {
    span_name: "crew.run",
    framework: "CrewAI",
    start_event: "crew_start",
    error_event: "crew_error",
    complete_event: "crew_complete",
};

/// Input name the prompt is bound to when the crew is kicked off.
pub const TOPIC_INPUT: &str = "topic";

/// Kicks off `crew` with `topic = prompt` inside a `crew.run` span.
///
/// # Errors
///
/// Returns [`crate::RunError::Crew`] if any task fails.
pub async fn run_crew(
    observability: &Observability,
    crew: &Crew,
    prompt: &str,
) -> RunResult<String> {
    let inputs = HashMap::from([(TOPIC_INPUT.to_owned(), prompt.to_owned())]);

    CREW_PROFILE
        .run(observability, crew.model(), prompt, async {
            let output = crew.kickoff(&inputs).await?;
            Ok::<_, RunError>(AgentReply {
                text: output.raw,
                usage: output.token_usage,
            })
        })
        .await
}
