//! Single-agent research crew reporting traces, metrics and logs over OTLP.

use std::sync::Arc;

use agent_adapters::openai::{OpenAiAdapter, OpenAiConfig};
use agent_config::{CrewAgentSettings, ProcessEnv, load_dotenv};
use agent_crew::{Agent, Crew, Task};
use agent_runners::run_crew;
use agent_telemetry::{Observability, TelemetrySettings};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;

#[derive(Debug, Parser)]
#[command(name = "crew-agent", about = "Ask a research crew a question")]
struct Cli {
    /// Chat model to use instead of `OPENAI_MODEL`.
    #[arg(long)]
    model: Option<String>,

    /// Question for the crew; defaults to `PROMPT` or a built-in question.
    prompt: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let dotenv = load_dotenv();

    let mut settings =
        CrewAgentSettings::from_source(&ProcessEnv).with_context(|| dotenv.to_string())?;
    if let Some(model) = cli.model {
        settings.model = model;
    }
    let prompt = if cli.prompt.is_empty() {
        settings.default_prompt.clone()
    } else {
        cli.prompt.join(" ")
    };

    let telemetry = TelemetrySettings::from_source(settings.service_name.clone(), &ProcessEnv)?;
    let observability = Observability::init(&telemetry).context("telemetry setup failed")?;
    dotenv.log();

    let outcome = match build_crew(&settings) {
        Ok(crew) => run_crew(&observability, &crew, &prompt)
            .await
            .context("crew run failed"),
        Err(err) => Err(err),
    };

    if let Ok(answer) = &outcome {
        println!("{answer}");
    }
    if let Err(err) = observability.shutdown() {
        warn!(error = %err, "telemetry shutdown failed");
    }

    outcome.map(drop)
}

fn build_crew(settings: &CrewAgentSettings) -> Result<Crew> {
    let mut config = OpenAiConfig::new(&settings.model).with_api_key(&settings.api_key);
    if let Some(base_url) = &settings.base_url {
        config = config.with_base_url(base_url)?;
    }
    let llm = Arc::new(OpenAiAdapter::new(config)?);

    let researcher = Agent::builder("Researcher")
        .goal("Explain concepts concisely")
        .backstory("Senior engineer who teaches clearly.")
        .adapter(llm)
        .build()?;

    let crew = Crew::builder()
        .agent(researcher)
        .task(
            Task::new(
                "Answer the user question: {topic}",
                "A short, precise answer with 2-3 bullet points.",
            )
            .assigned_to("Researcher"),
        )
        .build()?;

    Ok(crew)
}
