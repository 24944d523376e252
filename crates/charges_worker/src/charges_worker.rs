use crate::domain::{
    partition_subjects, ChannelNames, ChargeDeltaProcessor, ChargesApiClient,
    DeltaChargeTransformer, IdentifierEncoder, RetryController, RetryPolicy,
};
use crate::nats::{ChargeDeltaConsumer, ConsumerTuning, NatsDeltaChannelProducer};
use common::nats::NatsClient;
use delta_runner::AppProcess;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct ChargesWorkerConfig {
    pub delta_topic: String,
    pub group_id: String,
    pub partitions: u32,
    pub max_attempts: u32,
    pub backoff_delay: Duration,
    pub nats_batch_size: usize,
    pub nats_batch_wait_secs: u64,
    pub ack_wait_secs: u64,
}

/// Source and retry consumers for every partition of the delta channel
pub struct ChargesWorker {
    consumers: Vec<(String, ChargeDeltaConsumer)>,
}

impl ChargesWorker {
    pub async fn new(
        nats_client: Arc<NatsClient>,
        api_client: Arc<dyn ChargesApiClient>,
        encoder: IdentifierEncoder,
        config: ChargesWorkerConfig,
    ) -> anyhow::Result<Self> {
        info!(
            topic = %config.delta_topic,
            group_id = %config.group_id,
            partitions = config.partitions,
            "Initializing charges delta worker"
        );

        let channels = ChannelNames::new(&config.delta_topic, &config.group_id);
        for (channel, description) in [
            (&channels.source, "charges deltas"),
            (&channels.retry, "charges deltas awaiting retry"),
            (&channels.dead_letter, "charges deltas that could not be processed"),
        ] {
            nats_client
                .ensure_stream(
                    channel,
                    description,
                    partition_subjects(channel, config.partitions),
                )
                .await?;
        }

        let transformer = Arc::new(DeltaChargeTransformer::new(encoder.clone()));
        let processor = Arc::new(ChargeDeltaProcessor::new(transformer, encoder, api_client));
        let producer = Arc::new(NatsDeltaChannelProducer::new(
            nats_client.create_publisher_client(),
        ));
        let controller = Arc::new(RetryController::new(
            processor,
            producer,
            channels,
            RetryPolicy {
                max_attempts: config.max_attempts,
                backoff: config.backoff_delay,
            },
        ));

        let tuning = ConsumerTuning {
            batch_size: config.nats_batch_size,
            max_wait: Duration::from_secs(config.nats_batch_wait_secs),
            ack_wait: Duration::from_secs(config.ack_wait_secs),
        };

        let mut consumers = Vec::with_capacity(config.partitions as usize * 2);
        for partition in 0..config.partitions {
            let source = ChargeDeltaConsumer::source(
                nats_client.create_consumer_client(),
                controller.clone(),
                &config.group_id,
                partition,
                tuning,
            )
            .await?;
            consumers.push((format!("charges-delta-{partition}"), source));

            let retry = ChargeDeltaConsumer::retry(
                nats_client.create_consumer_client(),
                controller.clone(),
                &config.group_id,
                partition,
                tuning,
                config.backoff_delay,
            )
            .await?;
            consumers.push((format!("charges-delta-retry-{partition}"), retry));
        }

        info!(consumers = consumers.len(), "Charges delta worker initialized");
        Ok(Self { consumers })
    }

    pub fn into_runner_processes(self) -> Vec<(String, AppProcess)> {
        self.consumers
            .into_iter()
            .map(|(name, consumer)| {
                let process: AppProcess =
                    Box::new(move |ctx| Box::pin(async move { consumer.run(ctx).await }));
                (name, process)
            })
            .collect()
    }
}
