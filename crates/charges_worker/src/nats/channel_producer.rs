use super::{logged_headers, metadata_headers};
use crate::domain::{encode_payload, ChannelMessage, DeltaChannelProducer, OutboundPayload};
use anyhow::{Context, Result};
use async_trait::async_trait;
use common::nats::{layered_publisher, JetStreamPublisher, LayeredPublisher, PublishRequest};
use std::sync::Arc;
use tower::ServiceExt;
use tracing::debug;

/// Publishes retried and dead-lettered deltas to `{channel}.{partition}`,
/// keeping the partition of the original message.
pub struct NatsDeltaChannelProducer {
    publisher: LayeredPublisher,
}

impl NatsDeltaChannelProducer {
    pub fn new(publisher: Arc<dyn JetStreamPublisher>) -> Self {
        Self {
            publisher: layered_publisher(publisher, logged_headers()),
        }
    }
}

#[async_trait]
impl DeltaChannelProducer for NatsDeltaChannelProducer {
    async fn publish(&self, message: ChannelMessage) -> Result<()> {
        let subject = format!("{}.{}", message.channel, message.partition);
        let payload = encode_payload(&OutboundPayload::Raw(message.payload))?;

        debug!(
            subject = %subject,
            attempt = message.metadata.attempt,
            "publishing charge delta"
        );

        let request =
            PublishRequest::new(subject.clone(), payload).with_headers(metadata_headers(&message.metadata));
        self.publisher
            .clone()
            .oneshot(request)
            .await
            .with_context(|| format!("failed to publish charge delta to {subject}"))?;

        Ok(())
    }
}
