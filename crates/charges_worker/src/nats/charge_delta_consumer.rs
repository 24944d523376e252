use crate::domain::RetryController;
use crate::nats::{logged_headers, ChargeDeltaConsumerService, RetryDelayLayer, RetryDelayService};
use anyhow::Result;
use common::nats::{
    ConsumerSettings, JetStreamConsumer, NatsConsumeLoggingLayer, NatsConsumeLoggingService,
    NatsConsumeTracingConfig, NatsConsumeTracingLayer, NatsConsumeTracingService, TowerConsumer,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tracing::debug;

type SourceService = NatsConsumeTracingService<NatsConsumeLoggingService<ChargeDeltaConsumerService>>;

type RetryService = NatsConsumeTracingService<
    NatsConsumeLoggingService<RetryDelayService<ChargeDeltaConsumerService>>,
>;

/// Fetch tuning shared by every partition consumer
#[derive(Debug, Clone, Copy)]
pub struct ConsumerTuning {
    pub batch_size: usize,
    pub max_wait: Duration,
    pub ack_wait: Duration,
}

/// One partition's worth of consuming, on either the source or the retry channel.
pub enum ChargeDeltaConsumer {
    Source(TowerConsumer<SourceService>),
    Retry(TowerConsumer<RetryService>),
}

impl ChargeDeltaConsumer {
    /// Durable consumer `{group_id}-{partition}` on `{source}.{partition}`
    pub async fn source(
        jetstream: Arc<dyn JetStreamConsumer>,
        controller: Arc<RetryController>,
        group_id: &str,
        partition: u32,
        tuning: ConsumerTuning,
    ) -> Result<Self> {
        let channel = controller.channels().source.clone();
        let settings = ConsumerSettings {
            consumer_name: format!("{group_id}-{partition}"),
            filter_subject: format!("{channel}.{partition}"),
            stream_name: channel,
            batch_size: tuning.batch_size,
            max_wait: tuning.max_wait,
            ack_wait: tuning.ack_wait,
        };
        debug!(consumer = %settings.consumer_name, "initializing charge delta consumer");

        let service = ServiceBuilder::new()
            .layer(NatsConsumeTracingLayer::new(NatsConsumeTracingConfig::new(
                "process_charge_delta",
            )))
            .layer(NatsConsumeLoggingLayer::new(logged_headers()))
            .service(ChargeDeltaConsumerService::new(controller));

        Ok(Self::Source(
            TowerConsumer::new(jetstream, settings, service).await?,
        ))
    }

    /// Durable consumer `{group_id}-retry-{partition}` on `{retry}.{partition}`.
    ///
    /// Pulls one message at a time since each may sleep out its backoff, and
    /// stretches the ack deadline by the backoff for the same reason.
    pub async fn retry(
        jetstream: Arc<dyn JetStreamConsumer>,
        controller: Arc<RetryController>,
        group_id: &str,
        partition: u32,
        tuning: ConsumerTuning,
        backoff: Duration,
    ) -> Result<Self> {
        let channel = controller.channels().retry.clone();
        let settings = ConsumerSettings {
            consumer_name: format!("{group_id}-retry-{partition}"),
            filter_subject: format!("{channel}.{partition}"),
            stream_name: channel,
            batch_size: 1,
            max_wait: tuning.max_wait,
            ack_wait: tuning.ack_wait + backoff,
        };
        debug!(consumer = %settings.consumer_name, "initializing charge delta retry consumer");

        let service = ServiceBuilder::new()
            .layer(NatsConsumeTracingLayer::new(NatsConsumeTracingConfig::new(
                "retry_charge_delta",
            )))
            .layer(NatsConsumeLoggingLayer::new(logged_headers()))
            .layer(RetryDelayLayer::new(backoff))
            .service(ChargeDeltaConsumerService::new(controller));

        Ok(Self::Retry(
            TowerConsumer::new(jetstream, settings, service).await?,
        ))
    }

    pub async fn run(self, ctx: CancellationToken) -> Result<()> {
        match self {
            Self::Source(consumer) => consumer.run(ctx).await,
            Self::Retry(consumer) => consumer.run(ctx).await,
        }
    }
}
