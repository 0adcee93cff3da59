//! Provider construction: one OTLP exporter per signal, one shared resource.

use opentelemetry::KeyValue;
use opentelemetry_otlp::{
    LogExporter, MetricExporter, Protocol, SpanExporter, WithExportConfig, WithHttpConfig,
};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing::{debug, info, warn};

use crate::error::{TelemetryError, TelemetryResult};
use crate::settings::{OtlpProtocol, Signal, TelemetrySettings};

/// Builds an OTLP exporter of the given type for one signal.
///
/// HTTP exporters post to `/v1/<signal>` with the configured headers. The gRPC
/// exporter only reads `OTEL_EXPORTER_OTLP_HEADERS` on its own, so headers set
/// through [`TelemetrySettings::with_header`] are dropped with a warning.
macro_rules! otlp_exporter {
    ($exporter:ty, $settings:expr, $signal:expr) => {{
        let settings: &TelemetrySettings = $settings;
        let endpoint = settings.signal_endpoint($signal);
        debug!(
            signal = %$signal,
            %endpoint,
            protocol = %settings.protocol(),
            "building OTLP exporter"
        );
        match settings.http_headers() {
            None => {
                if !settings.headers().is_empty() {
                    warn!(
                        signal = %$signal,
                        count = settings.headers().len(),
                        "OTLP headers are not applied to gRPC export"
                    );
                }
                <$exporter>::builder()
                    .with_tonic()
                    .with_endpoint(endpoint)
                    .with_timeout(settings.export_timeout())
                    .build()?
            }
            Some(headers) => <$exporter>::builder()
                .with_http()
                .with_protocol(http_protocol(settings.protocol()))
                .with_endpoint(endpoint)
                .with_timeout(settings.export_timeout())
                .with_headers(headers.clone())
                .build()?,
        }
    }};
}

/// The trace, metric and log providers of one process.
#[derive(Clone, Debug)]
pub struct TelemetryProviders {
    tracer: SdkTracerProvider,
    meter: SdkMeterProvider,
    logger: SdkLoggerProvider,
}

impl TelemetryProviders {
    /// Wraps providers built elsewhere, e.g. with in-memory exporters.
    #[must_use]
    pub fn from_parts(
        tracer: SdkTracerProvider,
        meter: SdkMeterProvider,
        logger: SdkLoggerProvider,
    ) -> Self {
        Self {
            tracer,
            meter,
            logger,
        }
    }

    /// Builds providers that export every enabled signal over OTLP.
    ///
    /// Spans and logs go through batch processors, metrics through a periodic
    /// reader. A disabled signal still gets a provider, without an exporter.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Exporter`] if an exporter cannot be built.
    pub fn otlp(settings: &TelemetrySettings) -> TelemetryResult<Self> {
        let resource = resource(settings);

        let mut tracer = SdkTracerProvider::builder().with_resource(resource.clone());
        if settings.signal_enabled(Signal::Traces) {
            let exporter = otlp_exporter!(SpanExporter, settings, Signal::Traces);
            tracer = tracer.with_batch_exporter(exporter);
        }

        let mut meter = SdkMeterProvider::builder().with_resource(resource.clone());
        if settings.signal_enabled(Signal::Metrics) {
            let exporter = otlp_exporter!(MetricExporter, settings, Signal::Metrics);
            let reader = PeriodicReader::builder(exporter)
                .with_interval(settings.metric_interval())
                .build();
            meter = meter.with_reader(reader);
        }

        let mut logger = SdkLoggerProvider::builder().with_resource(resource);
        if settings.signal_enabled(Signal::Logs) {
            let exporter = otlp_exporter!(LogExporter, settings, Signal::Logs);
            logger = logger.with_batch_exporter(exporter);
        }

        info!(
            service = settings.service_name(),
            endpoint = settings.endpoint(),
            protocol = %settings.protocol(),
            traces = settings.signal_enabled(Signal::Traces),
            metrics = settings.signal_enabled(Signal::Metrics),
            logs = settings.signal_enabled(Signal::Logs),
            "OTLP telemetry configured"
        );

        Ok(Self {
            tracer: tracer.build(),
            meter: meter.build(),
            logger: logger.build(),
        })
    }

    /// Returns the trace provider.
    #[must_use]
    pub fn tracer_provider(&self) -> &SdkTracerProvider {
        &self.tracer
    }

    /// Returns the meter provider.
    #[must_use]
    pub fn meter_provider(&self) -> &SdkMeterProvider {
        &self.meter
    }

    /// Returns the logger provider.
    #[must_use]
    pub fn logger_provider(&self) -> &SdkLoggerProvider {
        &self.logger
    }

    /// Exports everything buffered so far.
    ///
    /// # Errors
    ///
    /// Every provider is flushed; the first failure is returned.
    pub fn force_flush(&self) -> TelemetryResult<()> {
        first_failure(
            [
                (Signal::Traces, self.tracer.force_flush()),
                (Signal::Metrics, self.meter.force_flush()),
                (Signal::Logs, self.logger.force_flush()),
            ],
            |signal, source| TelemetryError::Flush { signal, source },
        )
    }

    /// Flushes and stops every provider.
    ///
    /// # Errors
    ///
    /// Every provider is shut down; the first failure is returned.
    pub fn shutdown(&self) -> TelemetryResult<()> {
        first_failure(
            [
                (Signal::Traces, self.tracer.shutdown()),
                (Signal::Metrics, self.meter.shutdown()),
                (Signal::Logs, self.logger.shutdown()),
            ],
            |signal, source| TelemetryError::Shutdown { signal, source },
        )
    }
}

/// Resource shared by all three providers.
#[must_use]
pub fn resource(settings: &TelemetrySettings) -> Resource {
    Resource::builder()
        .with_service_name(settings.service_name().to_owned())
        .with_attributes([
            KeyValue::new(
                "service.instance.id",
                settings.service_instance_id().to_owned(),
            ),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])
        .build()
}

const fn http_protocol(protocol: OtlpProtocol) -> Protocol {
    match protocol {
        OtlpProtocol::HttpJson => Protocol::HttpJson,
        OtlpProtocol::HttpProtobuf | OtlpProtocol::Grpc => Protocol::HttpBinary,
    }
}

fn first_failure<const N: usize>(
    results: [(Signal, OTelSdkResult); N],
    wrap: impl Fn(Signal, opentelemetry_sdk::error::OTelSdkError) -> TelemetryError,
) -> TelemetryResult<()> {
    let mut first = None;
    for (signal, result) in results {
        if let Err(source) = result {
            warn!(%signal, error = %source, "telemetry provider failed");
            first.get_or_insert_with(|| wrap(signal, source));
        }
    }
    first.map_or(Ok(()), Err)
}
