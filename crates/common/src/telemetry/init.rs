use anyhow::{Context, Result};
use opentelemetry::trace::TracerProvider;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{LogExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::{
    logs::LoggerProvider,
    propagation::TraceContextPropagator,
    runtime,
    trace::{RandomIdGenerator, Sampler, TracerProvider as SdkTracerProvider},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use super::TelemetryConfig;

/// OTLP exporters, kept alive until [`shutdown_telemetry`] flushes them
pub struct TelemetryProviders {
    tracer_provider: SdkTracerProvider,
    logger_provider: LoggerProvider,
}

impl TelemetryProviders {
    fn start(config: &TelemetryConfig, endpoint: &str) -> Result<Self> {
        let resource = config.resource();

        let span_exporter = SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .with_context(|| format!("failed to build span exporter for {endpoint}"))?;
        let tracer_provider = SdkTracerProvider::builder()
            .with_batch_exporter(span_exporter, runtime::Tokio)
            .with_sampler(Sampler::AlwaysOn)
            .with_id_generator(RandomIdGenerator::default())
            .with_resource(resource.clone())
            .build();

        let log_exporter = LogExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .with_context(|| format!("failed to build log exporter for {endpoint}"))?;
        let logger_provider = LoggerProvider::builder()
            .with_batch_exporter(log_exporter, runtime::Tokio)
            .with_resource(resource)
            .build();

        Ok(Self {
            tracer_provider,
            logger_provider,
        })
    }

    fn shutdown(self) {
        if let Err(e) = self.tracer_provider.shutdown() {
            eprintln!("error shutting down tracer provider: {:?}", e);
        }
        if let Err(e) = self.logger_provider.shutdown() {
            eprintln!("error shutting down logger provider: {:?}", e);
        }
    }
}

/// Install the global tracing subscriber.
///
/// Every line goes to stdout as JSON with the span list attached, so events
/// logged while a delta is processed carry its `context_id`, subject and
/// sequence. With an OTLP endpoint, spans and events are exported as well and
/// W3C trace context is carried through NATS headers.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<Option<TelemetryProviders>> {
    let stdout = tracing_subscriber::fmt::layer()
        .json()
        .with_span_list(true)
        .with_current_span(true);
    let registry = tracing_subscriber::registry()
        .with(config.env_filter())
        .with(stdout);

    let Some(endpoint) = config.otlp_endpoint.as_deref() else {
        registry.try_init()?;
        return Ok(None);
    };

    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());
    let providers = TelemetryProviders::start(config, endpoint)?;

    let tracer = providers
        .tracer_provider
        .tracer(config.service_name.clone());

    // span layer before the log bridge, so exported records see the span context
    registry
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(OpenTelemetryTracingBridge::new(&providers.logger_provider))
        .try_init()?;

    Ok(Some(providers))
}

/// Flush and stop the exporters, if any were started
pub fn shutdown_telemetry(providers: Option<TelemetryProviders>) {
    if let Some(providers) = providers {
        providers.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_without_providers_is_noop() {
        shutdown_telemetry(None);
    }

    #[test]
    fn test_stdout_only_init_installs_once() {
        let config = TelemetryConfig::new("charges-delta-consumer", "0.1.0").with_log_level("warn");

        let first = init_telemetry(&config);
        let second = init_telemetry(&config);

        assert!(matches!(first, Ok(None)));
        assert!(second.is_err());
    }
}
