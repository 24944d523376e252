use crate::nats::{ConsumeRequest, ConsumeResponse, JetStreamConsumer, PullConsumer};
use anyhow::{Context, Result};
use async_nats::jetstream::{self};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::Service;
use tracing::{debug, error, info};

/// Where and how a [`TowerConsumer`] pulls its messages from.
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    pub stream_name: String,
    /// Durable consumer name; one per partition worker
    pub consumer_name: String,
    pub filter_subject: String,
    pub batch_size: usize,
    pub max_wait: Duration,
    /// How long JetStream waits for an ack before redelivering
    pub ack_wait: Duration,
}

/// Pulls from a durable JetStream consumer and drives each message through a
/// Tower service, strictly one at a time.
///
/// Messages of one consumer are never processed concurrently, so ordering
/// within a partition holds as long as each partition has its own consumer.
/// The service answers with a [`ConsumeResponse`]: `Ack` commits the message,
/// `Nak` leaves it for redelivery.
pub struct TowerConsumer<S> {
    consumer: Box<dyn PullConsumer>,
    settings: ConsumerSettings,
    service: S,
}

impl<S> TowerConsumer<S>
where
    S: Service<ConsumeRequest, Response = ConsumeResponse, Error = anyhow::Error>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    pub async fn new(
        jetstream: Arc<dyn JetStreamConsumer>,
        settings: ConsumerSettings,
        service: S,
    ) -> Result<Self> {
        debug!(
            stream = %settings.stream_name,
            consumer = %settings.consumer_name,
            filter_subject = %settings.filter_subject,
            "creating tower nats consumer"
        );

        let config = jetstream::consumer::pull::Config {
            name: Some(settings.consumer_name.clone()),
            durable_name: Some(settings.consumer_name.clone()),
            filter_subject: settings.filter_subject.clone(),
            ack_policy: jetstream::consumer::AckPolicy::Explicit,
            ack_wait: settings.ack_wait,
            ..Default::default()
        };

        let consumer = jetstream
            .create_consumer(config, &settings.stream_name)
            .await
            .context("failed to create consumer")?;

        Ok(Self {
            consumer,
            settings,
            service,
        })
    }

    /// Run the consumer loop until cancellation
    pub async fn run(mut self, ctx: CancellationToken) -> Result<()> {
        info!(
            stream = %self.settings.stream_name,
            consumer = %self.settings.consumer_name,
            filter_subject = %self.settings.filter_subject,
            "starting tower nats consumer"
        );

        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!(
                        consumer = %self.settings.consumer_name,
                        "received shutdown signal, stopping consumer"
                    );
                    break;
                }
                result = self.fetch_and_process_batch() => {
                    if let Err(e) = result {
                        error!(
                            consumer = %self.settings.consumer_name,
                            error = %e,
                            "error processing batch"
                        );
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }

        debug!(consumer = %self.settings.consumer_name, "consumer stopped");
        Ok(())
    }

    async fn fetch_and_process_batch(&mut self) -> Result<()> {
        let raw_messages = self
            .consumer
            .fetch_messages(self.settings.batch_size, self.settings.max_wait)
            .await?;

        if raw_messages.is_empty() {
            return Ok(());
        }

        debug!(message_count = raw_messages.len(), "received message batch");

        for msg in &raw_messages {
            let stream_sequence = msg.info().map(|i| i.stream_sequence).unwrap_or_default();
            let request = ConsumeRequest::new(
                msg.subject.to_string(),
                Bytes::copy_from_slice(&msg.payload),
                msg.headers.clone(),
                stream_sequence,
            );

            let response = match self.service.call(request).await {
                Ok(resp) => resp,
                Err(e) => {
                    error!(
                        subject = %msg.subject,
                        error = %e,
                        "service error processing message"
                    );
                    ConsumeResponse::nak(e.to_string())
                }
            };

            let outcome = match response {
                ConsumeResponse::Ack => msg.ack().await,
                ConsumeResponse::Nak(_) => msg.ack_with(jetstream::AckKind::Nak(None)).await,
            };

            if let Err(e) = outcome {
                error!(
                    subject = %msg.subject,
                    sequence = stream_sequence,
                    error = %e,
                    "failed to settle message"
                );
            }
        }

        Ok(())
    }
}
