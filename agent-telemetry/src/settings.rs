//! OTLP exporter settings resolved from the environment.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use agent_config::{ConfigSource, optional, parse_or};
use uuid::Uuid;

use crate::error::{TelemetryError, TelemetryResult};

/// Collector address used when `OTEL_EXPORTER_OTLP_ENDPOINT` is unset (Phoenix).
pub const DEFAULT_ENDPOINT: &str = "http://localhost:6006";

const DEFAULT_EXPORT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_METRIC_INTERVAL_MS: u64 = 60_000;
const DEFAULT_CONSOLE_FILTER: &str = "info,opentelemetry=warn,hyper=warn";

/// Wire protocol used to reach the collector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OtlpProtocol {
    /// Protobuf over HTTP, posted to `/v1/<signal>`.
    #[default]
    HttpProtobuf,
    /// JSON over HTTP, posted to `/v1/<signal>`.
    HttpJson,
    /// gRPC to the bare endpoint.
    Grpc,
}

impl OtlpProtocol {
    /// Whether signals are posted to per-signal HTTP paths.
    #[must_use]
    pub const fn is_http(self) -> bool {
        matches!(self, Self::HttpProtobuf | Self::HttpJson)
    }
}

impl FromStr for OtlpProtocol {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "http/protobuf" | "http" => Ok(Self::HttpProtobuf),
            "http/json" => Ok(Self::HttpJson),
            "grpc" => Ok(Self::Grpc),
            other => Err(format!(
                "unsupported protocol `{other}` (expected http/protobuf, http/json or grpc)"
            )),
        }
    }
}

impl fmt::Display for OtlpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HttpProtobuf => "http/protobuf",
            Self::HttpJson => "http/json",
            Self::Grpc => "grpc",
        })
    }
}

/// The three telemetry signals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    /// Spans.
    Traces,
    /// Counters and histograms.
    Metrics,
    /// Log records.
    Logs,
}

impl Signal {
    /// Path segment appended to the endpoint for HTTP export.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Traces => "traces",
            Self::Metrics => "metrics",
            Self::Logs => "logs",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Everything needed to build the OTLP pipeline for one service.
#[derive(Clone, Debug)]
pub struct TelemetrySettings {
    service_name: String,
    service_instance_id: String,
    endpoint: String,
    headers: HashMap<String, String>,
    protocol: OtlpProtocol,
    export_timeout: Duration,
    metric_interval: Duration,
    traces_enabled: bool,
    metrics_enabled: bool,
    logs_enabled: bool,
    console_filter: String,
}

impl TelemetrySettings {
    /// Creates settings with defaults and a fresh `service.instance.id`.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_instance_id: Uuid::new_v4().to_string(),
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            headers: HashMap::new(),
            protocol: OtlpProtocol::default(),
            export_timeout: Duration::from_millis(DEFAULT_EXPORT_TIMEOUT_MS),
            metric_interval: Duration::from_millis(DEFAULT_METRIC_INTERVAL_MS),
            traces_enabled: true,
            metrics_enabled: true,
            logs_enabled: true,
            console_filter: DEFAULT_CONSOLE_FILTER.to_owned(),
        }
    }

    /// Reads the standard `OTEL_*` variables plus `SERVICE_INSTANCE_ID`.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Configuration`] for an endpoint without an
    /// http(s) scheme or an unknown exporter name, and [`TelemetryError::Config`]
    /// for values that fail to parse.
    pub fn from_source(
        service_name: impl Into<String>,
        source: &impl ConfigSource,
    ) -> TelemetryResult<Self> {
        let mut settings = Self::new(service_name);

        if let Some(id) = optional(source, "SERVICE_INSTANCE_ID") {
            settings.service_instance_id = id;
        }
        if let Some(endpoint) = optional(source, "OTEL_EXPORTER_OTLP_ENDPOINT") {
            settings = settings.with_endpoint(endpoint)?;
        }
        if let Some(raw) = optional(source, "OTEL_EXPORTER_OTLP_HEADERS") {
            settings.headers = parse_headers(&raw);
        }

        settings.protocol = parse_or(source, "OTEL_EXPORTER_OTLP_PROTOCOL", settings.protocol)?;
        settings.export_timeout = Duration::from_millis(parse_or(
            source,
            "OTEL_EXPORTER_OTLP_TIMEOUT",
            DEFAULT_EXPORT_TIMEOUT_MS,
        )?);
        settings.metric_interval = Duration::from_millis(parse_or(
            source,
            "OTEL_METRIC_EXPORT_INTERVAL",
            DEFAULT_METRIC_INTERVAL_MS,
        )?);

        settings.traces_enabled = exporter_enabled(source, "OTEL_TRACES_EXPORTER")?;
        settings.metrics_enabled = exporter_enabled(source, "OTEL_METRICS_EXPORTER")?;
        settings.logs_enabled = exporter_enabled(source, "OTEL_LOGS_EXPORTER")?;

        if let Some(filter) = optional(source, "RUST_LOG") {
            settings.console_filter = filter;
        }

        Ok(settings)
    }

    /// Sets the collector base URL; a trailing `/` is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Configuration`] unless the URL is http(s).
    pub fn with_endpoint(mut self, endpoint: impl AsRef<str>) -> TelemetryResult<Self> {
        let endpoint = endpoint.as_ref().trim().trim_end_matches('/');
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(TelemetryError::configuration(format!(
                "OTLP endpoint `{endpoint}` must start with http:// or https://"
            )));
        }
        self.endpoint = endpoint.to_owned();
        Ok(self)
    }

    /// Adds a header sent with every HTTP export request.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Selects the wire protocol.
    #[must_use]
    pub fn with_protocol(mut self, protocol: OtlpProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    /// Enables or disables export of one signal.
    #[must_use]
    pub fn with_signal(mut self, signal: Signal, enabled: bool) -> Self {
        match signal {
            Signal::Traces => self.traces_enabled = enabled,
            Signal::Metrics => self.metrics_enabled = enabled,
            Signal::Logs => self.logs_enabled = enabled,
        }
        self
    }

    /// Returns the `service.name` resource attribute.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Returns the `service.instance.id` resource attribute.
    #[must_use]
    pub fn service_instance_id(&self) -> &str {
        &self.service_instance_id
    }

    /// Returns the collector base URL without a trailing slash.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the configured export headers, whatever the protocol.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Returns the headers the HTTP exporters send.
    ///
    /// `None` over gRPC: the tonic exporters take their metadata from
    /// `OTEL_EXPORTER_OTLP_HEADERS` directly and never see these.
    #[must_use]
    pub fn http_headers(&self) -> Option<&HashMap<String, String>> {
        self.protocol.is_http().then_some(&self.headers)
    }

    /// Returns the wire protocol.
    #[must_use]
    pub const fn protocol(&self) -> OtlpProtocol {
        self.protocol
    }

    /// Returns the per-export timeout.
    #[must_use]
    pub const fn export_timeout(&self) -> Duration {
        self.export_timeout
    }

    /// Returns the interval between metric exports.
    #[must_use]
    pub const fn metric_interval(&self) -> Duration {
        self.metric_interval
    }

    /// Returns the console log filter directive.
    #[must_use]
    pub fn console_filter(&self) -> &str {
        &self.console_filter
    }

    /// Whether `signal` is exported.
    #[must_use]
    pub const fn signal_enabled(&self, signal: Signal) -> bool {
        match signal {
            Signal::Traces => self.traces_enabled,
            Signal::Metrics => self.metrics_enabled,
            Signal::Logs => self.logs_enabled,
        }
    }

    /// Export URL for `signal`: `<endpoint>/v1/<signal>` over HTTP, the bare
    /// endpoint over gRPC.
    #[must_use]
    pub fn signal_endpoint(&self, signal: Signal) -> String {
        if self.protocol.is_http() {
            format!("{}/v1/{}", self.endpoint, signal.path())
        } else {
            self.endpoint.clone()
        }
    }
}

/// Parses OTLP headers written as `key=value,foo=bar`.
///
/// Pairs without `=` or with an empty key are skipped; only the first `=`
/// separates key from value.
#[must_use]
pub fn parse_headers(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}

fn exporter_enabled(source: &impl ConfigSource, key: &str) -> TelemetryResult<bool> {
    match optional(source, key).map(|value| value.to_ascii_lowercase()) {
        None => Ok(true),
        Some(value) if value == "otlp" => Ok(true),
        Some(value) if value == "none" => Ok(false),
        Some(value) => Err(TelemetryError::configuration(format!(
            "{key}=`{value}` is not supported (expected otlp or none)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn parse_headers_handles_edge_cases() {
        let headers = parse_headers(" api_key = abc , broken, token=a=b,=orphan,");
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["api_key"], "abc");
        assert_eq!(headers["token"], "a=b");
        assert!(parse_headers("").is_empty());
    }

    #[test]
    fn defaults_target_local_phoenix() {
        let settings = TelemetrySettings::from_source("svc", &source(&[])).unwrap();

        assert_eq!(settings.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(settings.protocol(), OtlpProtocol::HttpProtobuf);
        assert_eq!(
            settings.signal_endpoint(Signal::Traces),
            "http://localhost:6006/v1/traces"
        );
        assert_eq!(settings.export_timeout(), Duration::from_secs(10));
        assert_eq!(settings.metric_interval(), Duration::from_secs(60));
        assert!(settings.signal_enabled(Signal::Metrics));
        assert!(Uuid::parse_str(settings.service_instance_id()).is_ok());
    }

    #[test]
    fn reads_environment_overrides() {
        let settings = TelemetrySettings::from_source(
            "svc",
            &source(&[
                ("OTEL_EXPORTER_OTLP_ENDPOINT", "https://collector.example:4318/"),
                ("OTEL_EXPORTER_OTLP_HEADERS", "authorization=Bearer x"),
                ("OTEL_EXPORTER_OTLP_TIMEOUT", "2500"),
                ("OTEL_METRICS_EXPORTER", "none"),
                ("OTEL_LOGS_EXPORTER", "OTLP"),
                ("SERVICE_INSTANCE_ID", "instance-7"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.endpoint(), "https://collector.example:4318");
        assert_eq!(
            settings.signal_endpoint(Signal::Logs),
            "https://collector.example:4318/v1/logs"
        );
        assert_eq!(settings.headers()["authorization"], "Bearer x");
        assert_eq!(settings.export_timeout(), Duration::from_millis(2500));
        assert!(!settings.signal_enabled(Signal::Metrics));
        assert!(settings.signal_enabled(Signal::Logs));
        assert_eq!(settings.service_instance_id(), "instance-7");
    }

    #[test]
    fn grpc_uses_bare_endpoint() {
        let settings = TelemetrySettings::from_source(
            "svc",
            &source(&[
                ("OTEL_EXPORTER_OTLP_PROTOCOL", "grpc"),
                ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.protocol(), OtlpProtocol::Grpc);
        assert_eq!(
            settings.signal_endpoint(Signal::Metrics),
            "http://localhost:4317"
        );
    }

    #[test]
    fn headers_reach_http_exporters_only() {
        let settings = TelemetrySettings::new("svc").with_header("api_key", "abc");
        let http = settings.http_headers().expect("http/protobuf by default");
        assert_eq!(http["api_key"], "abc");

        let grpc = settings.with_protocol(OtlpProtocol::Grpc);
        assert!(grpc.http_headers().is_none());
        assert_eq!(grpc.headers()["api_key"], "abc");
    }

    #[test]
    fn rejects_bad_values() {
        let err = TelemetrySettings::from_source(
            "svc",
            &source(&[("OTEL_EXPORTER_OTLP_ENDPOINT", "localhost:6006")]),
        )
        .expect_err("scheme required");
        assert!(matches!(err, TelemetryError::Configuration { .. }));

        let err = TelemetrySettings::from_source(
            "svc",
            &source(&[("OTEL_EXPORTER_OTLP_PROTOCOL", "carrier-pigeon")]),
        )
        .expect_err("unknown protocol");
        assert!(matches!(err, TelemetryError::Config(_)));

        let err = TelemetrySettings::from_source(
            "svc",
            &source(&[("OTEL_TRACES_EXPORTER", "zipkin")]),
        )
        .expect_err("unknown exporter");
        assert!(matches!(err, TelemetryError::Configuration { .. }));
    }
}
