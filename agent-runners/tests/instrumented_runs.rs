use std::sync::{Arc, Mutex};

use agent_adapters::traits::{
    AdapterError, AdapterMetadata, AdapterResult, AdapterStream, InferenceChunk, InferenceRequest,
    ModelAdapter, TokenUsage,
};
use agent_crew::{Agent, Crew, Task};
use agent_runners::{RunError, run_crew, run_google};
use agent_telemetry::{Observability, TelemetryProviders};
use async_trait::async_trait;
use futures::stream;
use opentelemetry::trace::{Status, TraceContextExt, TraceId};
use opentelemetry::{Context, Value};
use opentelemetry_sdk::logs::{InMemoryLogExporter, SdkLoggerProvider};
use opentelemetry_sdk::metrics::data::{AggregatedMetrics, MetricData};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};

struct FakeAdapter {
    metadata: AdapterMetadata,
    replies: Mutex<Vec<AdapterResult<(String, Option<TokenUsage>)>>>,
    prompts: Mutex<Vec<String>>,
    active_traces: Mutex<Vec<TraceId>>,
}

impl FakeAdapter {
    fn new(model: &str, replies: Vec<AdapterResult<(String, Option<TokenUsage>)>>) -> Arc<Self> {
        Arc::new(Self {
            metadata: AdapterMetadata::new("fake", model),
            replies: Mutex::new(replies),
            prompts: Mutex::new(Vec::new()),
            active_traces: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ModelAdapter for FakeAdapter {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream> {
        let prompt = request
            .messages()
            .iter()
            .map(|message| message.content().to_owned())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().unwrap().push(prompt);
        let active = Context::current().span().span_context().trace_id();
        self.active_traces.lock().unwrap().push(active);

        let (text, usage) = self.replies.lock().unwrap().remove(0)?;
        let chunk = InferenceChunk::new(text, true).with_usage(usage);
        Ok(Box::pin(stream::once(async move { Ok(chunk) })))
    }
}

struct Capture {
    observability: Observability,
    spans: InMemorySpanExporter,
    metrics: InMemoryMetricExporter,
    logs: InMemoryLogExporter,
}

impl Capture {
    fn new(service: &str) -> Self {
        let spans = InMemorySpanExporter::default();
        let metrics = InMemoryMetricExporter::default();
        let logs = InMemoryLogExporter::default();
        let providers = TelemetryProviders::from_parts(
            SdkTracerProvider::builder()
                .with_simple_exporter(spans.clone())
                .build(),
            SdkMeterProvider::builder()
                .with_reader(PeriodicReader::builder(metrics.clone()).build())
                .build(),
            SdkLoggerProvider::builder()
                .with_simple_exporter(logs.clone())
                .build(),
        );

        Self {
            observability: Observability::from_providers(service, providers),
            spans,
            metrics,
            logs,
        }
    }

    fn finished_spans(&self) -> Vec<SpanData> {
        self.spans.get_finished_spans().unwrap()
    }

    fn counter(&self, name: &str) -> u64 {
        self.observability.force_flush().unwrap();
        let exported = self.metrics.get_finished_metrics().unwrap();
        exported
            .last()
            .into_iter()
            .flat_map(|resource| resource.scope_metrics())
            .flat_map(|scope| scope.metrics())
            .filter(|metric| metric.name() == name)
            .map(|metric| match metric.data() {
                AggregatedMetrics::U64(MetricData::Sum(sum)) => {
                    sum.data_points().map(|point| point.value()).sum()
                }
                _ => 0,
            })
            .sum()
    }
}

fn attribute(span: &SpanData, key: &str) -> Option<Value> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.clone())
}

fn event_names(span: &SpanData) -> Vec<String> {
    span.events
        .events
        .iter()
        .map(|event| event.name.to_string())
        .collect()
}

fn research_crew(adapter: Arc<FakeAdapter>) -> Crew {
    let researcher = Agent::builder("Researcher")
        .goal("Explain concepts concisely")
        .backstory("Senior engineer who teaches clearly.")
        .adapter(adapter)
        .build()
        .unwrap();

    Crew::builder()
        .agent(researcher)
        .task(
            Task::new(
                "Answer the user question: {topic}",
                "A short, precise answer with 2-3 bullet points.",
            )
            .assigned_to("Researcher"),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn crew_run_is_traced_counted_and_logged() {
    let capture = Capture::new("crewai-agent");
    let adapter = FakeAdapter::new(
        "gpt-4o-mini",
        vec![Ok((
            "- traces\n- metrics".to_owned(),
            Some(TokenUsage::new(30, 12)),
        ))],
    );
    let crew = research_crew(adapter.clone());

    let text = run_crew(&capture.observability, &crew, "Why observe agents?")
        .await
        .unwrap();
    assert_eq!(text, "- traces\n- metrics");
    let prompts = adapter.prompts.lock().unwrap();
    assert!(prompts[0].contains("Answer the user question: Why observe agents?"));
    drop(prompts);

    let spans = capture.finished_spans();
    assert_eq!(spans.len(), 1);
    let span = &spans[0];
    assert_eq!(span.name, "crew.run");
    assert_eq!(attribute(span, "framework"), Some(Value::from("CrewAI")));
    assert_eq!(attribute(span, "model"), Some(Value::from("gpt-4o-mini")));
    assert_eq!(
        attribute(span, "input.prompt"),
        Some(Value::from("Why observe agents?"))
    );
    assert_eq!(attribute(span, "tokens.total"), Some(Value::I64(42)));
    assert_eq!(event_names(span), ["crew_start", "crew_complete"]);
    assert!(!matches!(span.status, Status::Error { .. }));

    assert_eq!(capture.counter("agent_runs_total"), 1);
    assert_eq!(capture.counter("agent_tokens_total"), 42);

    let active = adapter.active_traces.lock().unwrap();
    assert_eq!(active.as_slice(), [span.span_context.trace_id()]);
    drop(active);

    let logs = capture.logs.get_emitted_logs().unwrap();
    let events: Vec<_> = logs.iter().filter_map(|log| log.record.event_name()).collect();
    assert_eq!(events, ["agent_run_complete", "agent_result"]);
    for log in &logs {
        let trace = log.record.trace_context().expect("correlated");
        assert_eq!(trace.trace_id, span.span_context.trace_id());
        assert_eq!(trace.span_id, span.span_context.span_id());
    }
}

#[tokio::test]
async fn crew_failure_marks_span_and_propagates() {
    let capture = Capture::new("crewai-agent");
    let adapter = FakeAdapter::new(
        "gpt-4o-mini",
        vec![Err(AdapterError::transport("connection refused"))],
    );
    let crew = research_crew(adapter);

    let err = run_crew(&capture.observability, &crew, "Why?")
        .await
        .expect_err("adapter failure");
    assert!(matches!(err, RunError::Crew(_)));
    assert_eq!(err.error_type(), "TransportError");

    let spans = capture.finished_spans();
    assert_eq!(spans.len(), 1);
    let span = &spans[0];
    assert!(matches!(span.status, Status::Error { .. }));
    assert_eq!(
        attribute(span, "error.type"),
        Some(Value::from("TransportError"))
    );
    assert_eq!(
        event_names(span),
        ["crew_start", "crew_error", "crew_complete"]
    );

    assert_eq!(capture.counter("agent_runs_total"), 1);
    assert_eq!(capture.counter("agent_tokens_total"), 0);

    let logs = capture.logs.get_emitted_logs().unwrap();
    assert_eq!(logs.len(), 1);
    let success = logs[0]
        .record
        .attributes_iter()
        .find(|(key, _)| key.as_str() == "success")
        .map(|(_, value)| value.clone());
    assert_eq!(success, Some(opentelemetry::logs::AnyValue::Boolean(false)));
}

#[tokio::test]
async fn google_runs_accumulate_metrics() {
    let capture = Capture::new("google-adk-agent");
    let adapter = FakeAdapter::new(
        "gemini-1.5-pro",
        vec![
            Ok(("first".to_owned(), Some(TokenUsage::new(5, 5)))),
            Ok(("second".to_owned(), None)),
        ],
    );

    let first = run_google(&capture.observability, adapter.as_ref(), "one")
        .await
        .unwrap();
    let second = run_google(&capture.observability, adapter.as_ref(), "two")
        .await
        .unwrap();
    assert_eq!((first.as_str(), second.as_str()), ("first", "second"));

    let spans = capture.finished_spans();
    assert_eq!(spans.len(), 2);
    assert!(spans.iter().all(|span| span.name == "google_adk.run"));
    assert_ne!(
        spans[0].span_context.trace_id(),
        spans[1].span_context.trace_id()
    );
    assert_eq!(
        attribute(&spans[0], "framework"),
        Some(Value::from("GoogleADK"))
    );
    assert_eq!(attribute(&spans[1], "tokens.total"), None);
    assert_eq!(
        event_names(&spans[0]),
        ["adk_start", "adk_complete"]
    );

    assert_eq!(capture.counter("agent_runs_total"), 2);
    assert_eq!(capture.counter("agent_tokens_total"), 10);
}

#[tokio::test]
async fn google_rejects_blank_prompt_inside_span() {
    let capture = Capture::new("google-adk-agent");
    let adapter = FakeAdapter::new("gemini-1.5-pro", Vec::new());

    let err = run_google(&capture.observability, adapter.as_ref(), "   ")
        .await
        .expect_err("blank prompt");
    assert!(matches!(err, RunError::Adapter(_)));
    assert_eq!(err.error_type(), "InvalidRequestError");
    assert!(adapter.prompts.lock().unwrap().is_empty());

    let spans = capture.finished_spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(
        event_names(&spans[0]),
        ["adk_start", "adk_error", "adk_complete"]
    );
    assert_eq!(capture.counter("agent_runs_total"), 1);
}
