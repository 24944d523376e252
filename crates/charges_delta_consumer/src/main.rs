mod config;
mod health;

use charges_worker::charges_worker::{ChargesWorker, ChargesWorkerConfig};
use charges_worker::domain::IdentifierEncoder;
use charges_worker::http::HttpChargesApiClient;
use common::nats::NatsClient;
use common::telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig, TelemetryProviders};
use config::ServiceConfig;
use delta_runner::Runner;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let mut telemetry_config =
        TelemetryConfig::new(config.otel_service_name.clone(), env!("CARGO_PKG_VERSION"))
            .with_log_level(config.log_level.clone());
    if config.otel_enabled {
        telemetry_config = telemetry_config.with_otlp_endpoint(config.otel_endpoint.clone());
    }
    let telemetry_providers: Option<TelemetryProviders> = match init_telemetry(&telemetry_config) {
        Ok(providers) => providers,
        Err(e) => {
            eprintln!("Failed to initialize telemetry: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        otel_enabled = config.otel_enabled,
        delta_topic = %config.delta_topic,
        group_id = %config.group_id,
        "Starting charges-delta-consumer service"
    );

    let nats_client = match NatsClient::connect(
        &config.nats_url,
        Duration::from_secs(config.nats_connect_timeout_secs),
    )
    .await
    {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to connect to NATS: {}", e);
            std::process::exit(1);
        }
    };

    let worker = match build_worker(&config, nats_client.clone()).await {
        Ok(worker) => worker,
        Err(e) => {
            error!("Failed to initialize charges delta worker: {:#}", e);
            std::process::exit(1);
        }
    };

    let health_addr = config.health_addr.clone();
    let mut runner =
        Runner::new().with_app_process("healthcheck", move |ctx| health::serve(health_addr, ctx));
    for (name, process) in worker.into_runner_processes() {
        runner = runner.with_boxed_process(name, process);
    }

    runner = runner
        .with_closer(move || async move {
            info!("Running cleanup tasks...");
            if let Err(e) = nats_client.close().await {
                warn!("Failed to flush NATS connection: {}", e);
            }

            // Flush pending traces and logs
            shutdown_telemetry(telemetry_providers);

            info!("Cleanup complete");
            Ok(())
        })
        .with_closer_timeout(Duration::from_secs(10));

    if let Err(e) = runner.run().await {
        error!("charges-delta-consumer stopped with error: {:#}", e);
        std::process::exit(1);
    }
}

async fn build_worker(
    config: &ServiceConfig,
    nats_client: Arc<NatsClient>,
) -> anyhow::Result<ChargesWorker> {
    let encoder = IdentifierEncoder::new(
        config.charge_id_salt.clone(),
        config.transaction_id_salt.clone(),
    )?;

    let api_client = Arc::new(HttpChargesApiClient::new(
        &config.api_url,
        config.api_key.clone(),
        Duration::from_secs(config.api_timeout_secs),
    )?);

    ChargesWorker::new(
        nats_client,
        api_client,
        encoder,
        ChargesWorkerConfig {
            delta_topic: config.delta_topic.clone(),
            group_id: config.group_id.clone(),
            partitions: config.partitions,
            max_attempts: config.max_attempts,
            backoff_delay: Duration::from_millis(config.backoff_delay_ms),
            nats_batch_size: config.nats_batch_size,
            nats_batch_wait_secs: config.nats_batch_wait_secs,
            ack_wait_secs: config.ack_wait_secs,
        },
    )
    .await
}
