use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use tracing_subscriber::EnvFilter;

/// Settings for [`init_telemetry`](super::init_telemetry).
///
/// Stdout JSON logging is always on. Spans and log records are exported over
/// OTLP only when a collector endpoint is set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    /// OTLP/gRPC collector address
    pub otlp_endpoint: Option<String>,
    /// Filter directive used when `RUST_LOG` is not set
    pub log_level: String,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>, service_version: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: service_version.into(),
            otlp_endpoint: None,
            log_level: "info".to_string(),
        }
    }

    pub fn with_log_level(mut self, log_level: impl Into<String>) -> Self {
        self.log_level = log_level.into();
        self
    }

    pub fn with_otlp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = Some(endpoint.into());
        self
    }

    pub fn exports_otlp(&self) -> bool {
        self.otlp_endpoint.is_some()
    }

    /// `RUST_LOG` wins; an unparseable `log_level` falls back to `info`
    pub(crate) fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.log_level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }

    /// Resource attached to every exported span and log record
    pub(crate) fn resource(&self) -> Resource {
        Resource::new(vec![
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                self.service_name.clone(),
            ),
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                self.service_version.clone(),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_config_logs_to_stdout_only() {
        let config = TelemetryConfig::new("charges-delta-consumer", "0.1.0");

        assert_eq!(config.log_level, "info");
        assert!(!config.exports_otlp());
    }

    #[test]
    fn test_builder_sets_endpoint_and_level() {
        let config = TelemetryConfig::new("charges-delta-consumer", "0.1.0")
            .with_log_level("debug")
            .with_otlp_endpoint("http://collector:4317");

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.otlp_endpoint.as_deref(), Some("http://collector:4317"));
        assert!(config.exports_otlp());
    }

    #[test]
    fn test_resource_names_service_and_version() {
        let resource = TelemetryConfig::new("charges-delta-consumer", "1.2.3").resource();

        let value = |key: &'static str| {
            resource
                .get(opentelemetry::Key::from_static_str(key))
                .map(|v| v.to_string())
        };
        assert_eq!(
            value(opentelemetry_semantic_conventions::resource::SERVICE_NAME).as_deref(),
            Some("charges-delta-consumer")
        );
        assert_eq!(
            value(opentelemetry_semantic_conventions::resource::SERVICE_VERSION).as_deref(),
            Some("1.2.3")
        );
    }
}
