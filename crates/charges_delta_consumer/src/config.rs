use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Loaded from `CHARGES_DELTA_*` environment variables
#[derive(Deserialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // NATS configuration
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    #[serde(default = "default_nats_connect_timeout_secs")]
    pub nats_connect_timeout_secs: u64,

    /// Source channel the deltas are published to
    #[serde(default = "default_delta_topic")]
    pub delta_topic: String,

    /// Consumer group; also names the retry and error channels
    #[serde(default = "default_group_id")]
    pub group_id: String,

    /// Number of `{delta_topic}.{n}` partition subjects to consume
    #[serde(default = "default_partitions")]
    pub partitions: u32,

    /// Batch size for consumer
    #[serde(default = "default_nats_batch_size")]
    pub nats_batch_size: usize,

    /// Max wait time for batches in seconds
    #[serde(default = "default_nats_batch_wait_secs")]
    pub nats_batch_wait_secs: u64,

    /// Seconds JetStream waits for an ack before redelivering
    #[serde(default = "default_ack_wait_secs")]
    pub ack_wait_secs: u64,

    // Retry configuration
    /// Processing attempts per delta, the first one included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_delay_ms")]
    pub backoff_delay_ms: u64,

    // Identifier salts
    #[serde(default)]
    pub charge_id_salt: String,

    #[serde(default)]
    pub transaction_id_salt: String,

    // Charges data api
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,

    /// Bind address of the `/healthcheck` endpoint
    #[serde(default = "default_health_addr")]
    pub health_addr: String,

    // OpenTelemetry configuration
    #[serde(default = "default_otel_enabled")]
    pub otel_enabled: bool,

    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_nats_connect_timeout_secs() -> u64 {
    10
}

fn default_delta_topic() -> String {
    "charges-delta".to_string()
}

fn default_group_id() -> String {
    "charges-delta-consumer".to_string()
}

fn default_partitions() -> u32 {
    1
}

fn default_nats_batch_size() -> usize {
    10
}

fn default_nats_batch_wait_secs() -> u64 {
    5
}

fn default_ack_wait_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    4
}

fn default_backoff_delay_ms() -> u64 {
    100
}

fn default_api_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_api_timeout_secs() -> u64 {
    10
}

fn default_health_addr() -> String {
    "0.0.0.0:8081".to_string()
}

fn default_otel_enabled() -> bool {
    false
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_service_name() -> String {
    "charges-delta-consumer".to_string()
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .add_source(Environment::with_prefix("CHARGES_DELTA"))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Message(msg.to_string()));

        if self.max_attempts < 1 {
            return invalid("max_attempts must be at least 1");
        }
        if self.partitions < 1 {
            return invalid("partitions must be at least 1");
        }
        if self.nats_batch_size < 1 {
            return invalid("nats_batch_size must be at least 1");
        }
        if self.charge_id_salt.is_empty() || self.transaction_id_salt.is_empty() {
            return invalid("charge_id_salt and transaction_id_salt must be set");
        }
        if self.charge_id_salt == self.transaction_id_salt {
            return invalid("charge_id_salt and transaction_id_salt must differ");
        }
        if self.api_url.trim().is_empty() {
            return invalid("api_url must be set");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure tests run serially and don't interfere with each other
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 5] = [
        "CHARGES_DELTA_LOG_LEVEL",
        "CHARGES_DELTA_MAX_ATTEMPTS",
        "CHARGES_DELTA_PARTITIONS",
        "CHARGES_DELTA_CHARGE_ID_SALT",
        "CHARGES_DELTA_TRANSACTION_ID_SALT",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    fn set_salts() {
        std::env::set_var("CHARGES_DELTA_CHARGE_ID_SALT", "sometest");
        std::env::set_var("CHARGES_DELTA_TRANSACTION_ID_SALT", "sometest2");
    }

    #[test]
    fn test_default_config() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();
        set_salts();

        let config = ServiceConfig::from_env().unwrap();

        assert_eq!(config.log_level, "info");
        assert_eq!(config.delta_topic, "charges-delta");
        assert_eq!(config.group_id, "charges-delta-consumer");
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.backoff_delay_ms, 100);
        assert_eq!(config.partitions, 1);
        assert_eq!(config.health_addr, "0.0.0.0:8081");

        clear_env();
    }

    #[test]
    fn test_custom_config() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();
        set_salts();
        std::env::set_var("CHARGES_DELTA_LOG_LEVEL", "debug");
        std::env::set_var("CHARGES_DELTA_MAX_ATTEMPTS", "2");
        std::env::set_var("CHARGES_DELTA_PARTITIONS", "3");

        let config = ServiceConfig::from_env().unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.partitions, 3);

        clear_env();
    }

    #[test]
    fn test_missing_salts_rejected() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();

        assert!(ServiceConfig::from_env().is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let _lock = TEST_LOCK.lock().unwrap();
        clear_env();
        set_salts();
        std::env::set_var("CHARGES_DELTA_MAX_ATTEMPTS", "0");

        let err = ServiceConfig::from_env().err().unwrap();
        assert!(err.to_string().contains("max_attempts"));

        std::env::set_var("CHARGES_DELTA_MAX_ATTEMPTS", "4");
        std::env::set_var("CHARGES_DELTA_TRANSACTION_ID_SALT", "sometest");
        let err = ServiceConfig::from_env().err().unwrap();
        assert!(err.to_string().contains("must differ"));

        clear_env();
    }
}
