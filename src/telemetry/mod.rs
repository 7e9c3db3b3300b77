//! Logging, tracing and metrics setup.
//!
//! Human-readable logs always go to stderr so stdout carries only command
//! output. With `OTEL_ENDPOINT` set, spans, metric instruments and log
//! records are also shipped over OTLP/gRPC.

pub mod metrics;
pub mod queue;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;

use crate::error::{Error, Result};

pub struct TelemetryConfig {
    /// OTLP collector, e.g. "http://localhost:4317". `None` logs locally only.
    pub endpoint: Option<String>,
    pub service_name: String,
    /// Filter directive used when `RUST_LOG` is unset (e.g. "info").
    pub log_level: String,
}

/// Keeps the OTLP pipelines alive. Dropping it shuts them down.
pub struct TelemetryGuard {
    otlp: Option<OtlpPipelines>,
}

impl TelemetryGuard {
    /// Push out anything still buffered. Call before a CLI command exits.
    pub fn force_flush(&self) {
        if let Some(otlp) = &self.otlp {
            otlp.flush();
        }
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(otlp) = self.otlp.take() {
            otlp.shutdown();
        }
    }
}

struct OtlpPipelines {
    traces: SdkTracerProvider,
    metrics: SdkMeterProvider,
    logs: SdkLoggerProvider,
}

impl OtlpPipelines {
    fn connect(endpoint: &str, service_name: String) -> Result<Self> {
        use opentelemetry_otlp::WithExportConfig as _;

        let resource = Resource::builder()
            .with_service_name(service_name)
            .with_attribute(opentelemetry::KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            ))
            .build();

        let spans = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .map_err(|e| exporter_error("spans", endpoint, e))?;
        let traces = SdkTracerProvider::builder()
            .with_batch_exporter(spans)
            .with_resource(resource.clone())
            .build();

        let instruments = opentelemetry_otlp::MetricExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .map_err(|e| exporter_error("metrics", endpoint, e))?;
        let metrics = SdkMeterProvider::builder()
            .with_periodic_exporter(instruments)
            .with_resource(resource.clone())
            .build();
        opentelemetry::global::set_meter_provider(metrics.clone());

        let records = opentelemetry_otlp::LogExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .map_err(|e| exporter_error("logs", endpoint, e))?;
        let logs = SdkLoggerProvider::builder()
            .with_batch_exporter(records)
            .with_resource(resource)
            .build();

        Ok(Self {
            traces,
            metrics,
            logs,
        })
    }

    fn flush(&self) {
        let _ = self.traces.force_flush();
        let _ = self.metrics.force_flush();
        let _ = self.logs.force_flush();
    }

    /// Log pipeline closes first, trace pipeline last.
    fn shutdown(self) {
        let _ = self.logs.shutdown();
        let _ = self.metrics.shutdown();
        let _ = self.traces.shutdown();
    }
}

fn exporter_error(signal: &str, endpoint: &str, e: impl std::fmt::Display) -> Error {
    Error::Config(format!("cannot export {signal} to {endpoint}: {e}"))
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if an OTLP exporter cannot be built or a global subscriber is
/// already installed (as happens when several tests initialize telemetry
/// in one process).
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let otlp = config
        .endpoint
        .as_deref()
        .map(|endpoint| OtlpPipelines::connect(endpoint, config.service_name.clone()))
        .transpose()?;

    let span_layer = otlp
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.traces.tracer("waitlist")));
    let log_layer = otlp.as_ref().map(|p| {
        opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge::new(&p.logs)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .with(span_layer)
        .with(log_layer)
        .try_init()
        .map_err(|e| Error::Other(format!("cannot install tracing subscriber: {e}")))?;

    Ok(TelemetryGuard { otlp })
}
