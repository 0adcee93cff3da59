//! Gemini agent reporting traces, metrics and logs over OTLP.

use agent_adapters::gemini::{GeminiAdapter, GeminiConfig};
use agent_config::{GoogleAgentSettings, ProcessEnv, load_dotenv};
use agent_runners::run_google;
use agent_telemetry::{Observability, TelemetrySettings};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;

#[derive(Debug, Parser)]
#[command(name = "google-adk-agent", about = "Ask Gemini a question")]
struct Cli {
    /// Gemini model to use instead of `GOOGLE_MODEL`.
    #[arg(long)]
    model: Option<String>,

    /// Prompt to send; defaults to `PROMPT` or a built-in prompt.
    prompt: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let dotenv = load_dotenv();

    let mut settings =
        GoogleAgentSettings::from_source(&ProcessEnv).with_context(|| dotenv.to_string())?;
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

    let outcome = match build_adapter(&settings) {
        Ok(adapter) => run_google(&observability, &adapter, &prompt)
            .await
            .context("Gemini run failed"),
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

fn build_adapter(settings: &GoogleAgentSettings) -> Result<GeminiAdapter> {
    let mut config = GeminiConfig::new(&settings.model).with_api_key(&settings.api_key);
    if let Some(base_url) = &settings.base_url {
        config = config.with_base_url(base_url)?;
    }
    Ok(GeminiAdapter::new(config)?)
}
