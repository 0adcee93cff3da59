//! Per-process telemetry handle and per-run spans.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use opentelemetry::logs::{AnyValue, LogRecord as _, Logger as _, LoggerProvider as _, Severity};
use opentelemetry::metrics::MeterProvider as _;
use opentelemetry::trace::{
    FutureExt as _, SpanKind, Status, TraceContextExt as _, TraceId, Tracer as _,
    TracerProvider as _,
};
use opentelemetry::{Context, InstrumentationScope, KeyValue, Value, global};
use opentelemetry_sdk::logs::SdkLogger;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracer;
use tracing::{debug, error, info};

use crate::error::{TelemetryError, TelemetryResult};
use crate::instruments::AgentInstruments;
use crate::logging::init_console_logging;
use crate::pipeline::TelemetryProviders;
use crate::settings::TelemetrySettings;

/// Attribute keys allowed on metrics; everything else stays on spans and logs.
pub const METRIC_ATTRIBUTE_KEYS: [&str; 4] = ["framework", "model", "success", "error.type"];

const RUN_COMPLETE_EVENT: &str = "agent_run_complete";

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Outcome of one agent run, as handed to [`AgentSpan::record_run`].
#[derive(Clone, Debug)]
pub struct RunRecord {
    /// End-to-end latency in milliseconds.
    pub latency_ms: f64,
    /// Total tokens, when the model reported usage.
    pub tokens: Option<u64>,
    /// Whether the run produced a result.
    pub success: bool,
    /// Run attributes; only [`METRIC_ATTRIBUTE_KEYS`] reach the metrics.
    pub attributes: Vec<KeyValue>,
}

/// Tracer, meter instruments and logger of one service.
pub struct Observability {
    service_name: String,
    providers: TelemetryProviders,
    tracer: SdkTracer,
    logger: SdkLogger,
    instruments: AgentInstruments,
}

impl Observability {
    /// Sets up console logging and OTLP export, then installs the global
    /// tracer provider, meter provider and W3C trace-context propagator.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::AlreadyInitialized`] on a second call in the
    /// same process, or the pipeline error if an exporter cannot be built.
    pub fn init(settings: &TelemetrySettings) -> TelemetryResult<Self> {
        if INITIALIZED.swap(true, Ordering::SeqCst) {
            return Err(TelemetryError::AlreadyInitialized);
        }

        if !init_console_logging(settings.console_filter()) {
            debug!("console subscriber already installed");
        }

        let providers = match TelemetryProviders::otlp(settings) {
            Ok(providers) => providers,
            Err(err) => {
                INITIALIZED.store(false, Ordering::SeqCst);
                return Err(err);
            }
        };

        global::set_tracer_provider(providers.tracer_provider().clone());
        global::set_meter_provider(providers.meter_provider().clone());
        global::set_text_map_propagator(TraceContextPropagator::new());

        Ok(Self::from_providers(settings.service_name(), providers))
    }

    /// Wraps existing providers without touching process-wide state.
    #[must_use]
    pub fn from_providers(service_name: impl Into<String>, providers: TelemetryProviders) -> Self {
        let service_name = service_name.into();
        let scope = InstrumentationScope::builder(service_name.clone())
            .with_version(env!("CARGO_PKG_VERSION"))
            .build();

        let tracer = providers.tracer_provider().tracer_with_scope(scope.clone());
        let meter = providers.meter_provider().meter_with_scope(scope.clone());
        let logger = providers.logger_provider().logger_with_scope(scope);

        Self {
            service_name,
            instruments: AgentInstruments::new(&meter),
            providers,
            tracer,
            logger,
        }
    }

    /// Returns the service name used for the instrumentation scope.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Starts a root span carrying `attributes`.
    pub fn span(
        &self,
        name: impl Into<Cow<'static, str>>,
        attributes: Vec<KeyValue>,
    ) -> AgentSpan<'_> {
        let span = self
            .tracer
            .span_builder(name)
            .with_kind(SpanKind::Internal)
            .with_attributes(attributes)
            .start_with_context(&self.tracer, &Context::new());

        AgentSpan {
            observability: self,
            cx: Context::current_with_span(span),
        }
    }

    /// Exports everything buffered so far.
    ///
    /// # Errors
    ///
    /// Returns the first provider failure.
    pub fn force_flush(&self) -> TelemetryResult<()> {
        self.providers.force_flush()
    }

    /// Flushes and stops traces, metrics and logs.
    ///
    /// # Errors
    ///
    /// Returns the first provider failure; the others are still attempted.
    pub fn shutdown(&self) -> TelemetryResult<()> {
        debug!(service = %self.service_name, "shutting down telemetry");
        self.providers.shutdown()
    }
}

impl fmt::Debug for Observability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observability")
            .field("service_name", &self.service_name)
            .finish_non_exhaustive()
    }
}

/// An open span for one agent run. Ends when dropped.
pub struct AgentSpan<'a> {
    observability: &'a Observability,
    cx: Context,
}

impl AgentSpan<'_> {
    /// Adds a span event and mirrors it on the console.
    pub fn annotate(&self, message: &'static str, attributes: Vec<KeyValue>) {
        info!(
            service = %self.observability.service_name,
            attributes = %DisplayAttributes(&attributes),
            "{message}"
        );
        self.cx.span().add_event(message, attributes);
    }

    /// Adds attributes to the span.
    pub fn set_attributes(&self, attributes: impl IntoIterator<Item = KeyValue>) {
        self.cx.span().set_attributes(attributes);
    }

    /// Marks the span failed and attaches `error.type` and `error.message`.
    pub fn fail(&self, error_type: &str, message: &str) {
        let span = self.cx.span();
        span.set_attributes([
            KeyValue::new("error.type", error_type.to_owned()),
            KeyValue::new("error.message", message.to_owned()),
        ]);
        span.set_status(Status::error(message.to_owned()));
    }

    /// Records run metrics and emits the `agent_run_complete` log record.
    pub fn record_run(&self, run: &RunRecord) {
        let success = KeyValue::new("success", run.success);

        let metric_attributes: Vec<KeyValue> = run
            .attributes
            .iter()
            .filter(|kv| METRIC_ATTRIBUTE_KEYS.contains(&kv.key.as_str()))
            .cloned()
            .chain(std::iter::once(success.clone()))
            .collect();
        self.observability
            .instruments
            .record(run.latency_ms, run.tokens, &metric_attributes);

        let mut attributes = vec![KeyValue::new("latency_ms", run.latency_ms), success];
        if let Some(tokens) = run.tokens {
            attributes.push(KeyValue::new(
                "tokens",
                i64::try_from(tokens).unwrap_or(i64::MAX),
            ));
        }
        attributes.extend(run.attributes.iter().cloned());

        let severity = if run.success {
            Severity::Info
        } else {
            Severity::Error
        };
        if run.success {
            info!(
                service = %self.observability.service_name,
                latency_ms = run.latency_ms,
                tokens = run.tokens,
                "agent run complete"
            );
        } else {
            error!(
                service = %self.observability.service_name,
                latency_ms = run.latency_ms,
                "agent run failed"
            );
        }
        self.log(RUN_COMPLETE_EVENT, severity, "agent run complete", attributes);
    }

    /// Emits an OTel log record correlated with this span.
    pub fn log(
        &self,
        event: &'static str,
        severity: Severity,
        body: impl Into<String>,
        attributes: Vec<KeyValue>,
    ) {
        let logger = &self.observability.logger;
        let _guard = self.cx.clone().attach();

        let mut record = logger.create_log_record();
        record.set_event_name(event);
        record.set_timestamp(SystemTime::now());
        record.set_severity_number(severity);
        record.set_severity_text(severity.name());
        record.set_body(AnyValue::String(body.into().into()));
        record.add_attributes(
            attributes
                .into_iter()
                .map(|kv| (kv.key, any_value(kv.value))),
        );
        logger.emit(record);
    }

    /// Polls `future` with this span as the current span, so spans and
    /// propagation headers created inside it belong to this run.
    pub fn in_context<F: Future>(&self, future: F) -> impl Future<Output = F::Output> {
        future.with_context(self.cx.clone())
    }

    /// Returns the context holding this span.
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.cx
    }

    /// Returns the trace id of this span.
    #[must_use]
    pub fn trace_id(&self) -> TraceId {
        self.cx.span().span_context().trace_id()
    }

    /// Ends the span now.
    pub fn end(self) {
        drop(self);
    }
}

impl Drop for AgentSpan<'_> {
    fn drop(&mut self) {
        self.cx.span().end();
    }
}

impl fmt::Debug for AgentSpan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentSpan")
            .field("trace_id", &self.trace_id())
            .finish_non_exhaustive()
    }
}

fn any_value(value: Value) -> AnyValue {
    match value {
        Value::Bool(value) => AnyValue::Boolean(value),
        Value::I64(value) => AnyValue::Int(value),
        Value::F64(value) => AnyValue::Double(value),
        other => AnyValue::String(other.as_str().into_owned().into()),
    }
}

struct DisplayAttributes<'a>(&'a [KeyValue]);

impl fmt::Display for DisplayAttributes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, kv) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", kv.key, kv.value)?;
        }
        Ok(())
    }
}
