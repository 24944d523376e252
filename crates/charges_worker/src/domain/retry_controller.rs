use super::{decode_delta, DeltaContext, DeltaEnvelope, DeltaError, DeltaProcessor, MessageProvenance};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, info_span, warn, Instrument};

/// The three channels one consumer group works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNames {
    pub source: String,
    /// `{source}-{group}-retry`
    pub retry: String,
    /// `{source}-{group}-error`
    pub dead_letter: String,
}

impl ChannelNames {
    pub fn new(source: &str, group_id: &str) -> Self {
        Self {
            source: source.to_string(),
            retry: format!("{source}-{group_id}-retry"),
            dead_letter: format!("{source}-{group_id}-error"),
        }
    }
}

/// `{channel}.0` up to `{channel}.{partitions - 1}`, the only subjects a channel stream accepts
pub fn partition_subjects(channel: &str, partitions: u32) -> Vec<String> {
    (0..partitions).map(|p| format!("{channel}.{p}")).collect()
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total processing attempts, the first delivery included
    pub max_attempts: u32,
    pub backoff: Duration,
}

/// A message as delivered on the source or retry channel
#[derive(Debug, Clone)]
pub struct DeltaMessage {
    pub payload: Bytes,
    /// Where the delta originally arrived; kept across retries
    pub provenance: MessageProvenance,
    /// 1 on the first delivery
    pub attempt: u32,
}

/// Bookkeeping carried with a re-published delta
#[derive(Debug, Clone, PartialEq)]
pub struct RetryMetadata {
    pub attempt: u32,
    pub original: MessageProvenance,
    /// Earliest time the retry consumer may process the message
    pub due_at: Option<DateTime<Utc>>,
    /// Set on dead-lettered messages only
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChannelMessage {
    pub channel: String,
    pub partition: u32,
    pub payload: Bytes,
    pub metadata: RetryMetadata,
}

/// Publishes to the retry and dead-letter channels
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeltaChannelProducer: Send + Sync {
    async fn publish(&self, message: ChannelMessage) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Succeeded,
    Retried { next_attempt: u32 },
    DeadLettered,
}

/// Drives one message through the processor and routes failures.
///
/// Retryable failures go to the retry channel until `max_attempts` is used
/// up, everything else ends on the dead-letter channel. Either way the
/// original message can then be committed. An `Err` means routing itself
/// failed and the message must be redelivered.
pub struct RetryController {
    processor: Arc<dyn DeltaProcessor>,
    producer: Arc<dyn DeltaChannelProducer>,
    channels: ChannelNames,
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(
        processor: Arc<dyn DeltaProcessor>,
        producer: Arc<dyn DeltaChannelProducer>,
        channels: ChannelNames,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            processor,
            producer,
            channels,
            policy,
        }
    }

    pub fn channels(&self) -> &ChannelNames {
        &self.channels
    }

    pub async fn handle(&self, message: DeltaMessage) -> anyhow::Result<Disposition> {
        let envelope = match decode_delta(&message.payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                let context = DeltaContext::new("", message.provenance.clone(), message.attempt);
                let span = delta_span(&context);
                return self
                    .dead_letter(&message, &DeltaError::from(err))
                    .instrument(span)
                    .await;
            }
        };

        let context = DeltaContext::new(
            &envelope.context_id,
            message.provenance.clone(),
            message.attempt,
        );
        let span = delta_span(&context);
        self.process(&message, &envelope, &context)
            .instrument(span)
            .await
    }

    async fn process(
        &self,
        message: &DeltaMessage,
        envelope: &DeltaEnvelope,
        context: &DeltaContext,
    ) -> anyhow::Result<Disposition> {
        let err = match self.processor.process(envelope, context).await {
            Ok(()) => {
                info!("charge delta processed");
                return Ok(Disposition::Succeeded);
            }
            Err(err) => err,
        };

        if !err.is_retryable() {
            error!(error = %err, "non-retryable failure processing charge delta");
            return self.dead_letter(message, &err).await;
        }

        if message.attempt >= self.policy.max_attempts {
            error!(
                error = %err,
                max_attempts = self.policy.max_attempts,
                "retry attempts exhausted for charge delta"
            );
            return self.dead_letter(message, &err).await;
        }

        let next_attempt = message.attempt + 1;
        let due_at = Utc::now()
            + chrono::Duration::from_std(self.policy.backoff).unwrap_or(chrono::Duration::zero());
        warn!(
            error = %err,
            next_attempt,
            due_at = %due_at,
            "retryable failure processing charge delta, scheduling retry"
        );

        self.producer
            .publish(ChannelMessage {
                channel: self.channels.retry.clone(),
                partition: message.provenance.partition,
                payload: message.payload.clone(),
                metadata: RetryMetadata {
                    attempt: next_attempt,
                    original: message.provenance.clone(),
                    due_at: Some(due_at),
                    failure_reason: None,
                },
            })
            .await?;

        Ok(Disposition::Retried { next_attempt })
    }

    async fn dead_letter(
        &self,
        message: &DeltaMessage,
        err: &DeltaError,
    ) -> anyhow::Result<Disposition> {
        self.producer
            .publish(ChannelMessage {
                channel: self.channels.dead_letter.clone(),
                partition: message.provenance.partition,
                payload: message.payload.clone(),
                metadata: RetryMetadata {
                    attempt: message.attempt,
                    original: message.provenance.clone(),
                    due_at: None,
                    failure_reason: Some(err.to_string()),
                },
            })
            .await?;

        warn!(channel = %self.channels.dead_letter, "charge delta moved to dead-letter channel");
        Ok(Disposition::DeadLettered)
    }
}

fn delta_span(context: &DeltaContext) -> tracing::Span {
    info_span!(
        "charge_delta",
        context_id = %context.context_id,
        topic = %context.provenance.topic,
        partition = context.provenance.partition,
        offset = context.provenance.offset,
        attempt = context.attempt,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{encode_payload, MockDeltaProcessor, OutboundPayload};

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 4,
            backoff: Duration::from_millis(100),
        }
    }

    fn channels() -> ChannelNames {
        ChannelNames::new("charges-delta", "charges-delta-consumer")
    }

    fn message(attempt: u32) -> DeltaMessage {
        let payload = encode_payload(&OutboundPayload::Delta(DeltaEnvelope::upsert(
            "{}",
            "context_id",
        )))
        .unwrap();
        DeltaMessage {
            payload,
            provenance: MessageProvenance::new("charges-delta", 2, 17),
            attempt,
        }
    }

    fn controller(
        processor: MockDeltaProcessor,
        producer: MockDeltaChannelProducer,
    ) -> RetryController {
        RetryController::new(Arc::new(processor), Arc::new(producer), channels(), policy())
    }

    #[test]
    fn test_partition_subjects_cover_only_configured_partitions() {
        assert_eq!(
            partition_subjects("charges-delta", 3),
            vec!["charges-delta.0", "charges-delta.1", "charges-delta.2"]
        );
        assert!(partition_subjects("charges-delta", 1)
            .iter()
            .all(|s| s != "charges-delta.foo" && s != "charges-delta.1"));
    }

    #[test]
    fn test_channel_names() {
        let names = channels();
        assert_eq!(names.retry, "charges-delta-charges-delta-consumer-retry");
        assert_eq!(names.dead_letter, "charges-delta-charges-delta-consumer-error");
    }

    #[tokio::test]
    async fn test_success_publishes_nothing() {
        // Arrange
        let mut processor = MockDeltaProcessor::new();
        processor
            .expect_process()
            .withf(|_, ctx| ctx.context_id == "context_id" && ctx.attempt == 1)
            .times(1)
            .returning(|_, _| Ok(()));
        let mut producer = MockDeltaChannelProducer::new();
        producer.expect_publish().times(0);

        // Act
        let disposition = controller(processor, producer).handle(message(1)).await;

        // Assert
        assert_eq!(disposition.unwrap(), Disposition::Succeeded);
    }

    #[tokio::test]
    async fn test_retryable_failure_goes_to_retry_channel() {
        let mut processor = MockDeltaProcessor::new();
        processor
            .expect_process()
            .times(1)
            .returning(|_, _| Err(DeltaError::ApiUnavailable(503)));

        let before = Utc::now();
        let mut producer = MockDeltaChannelProducer::new();
        producer
            .expect_publish()
            .withf(move |msg: &ChannelMessage| {
                msg.channel == "charges-delta-charges-delta-consumer-retry"
                    && msg.partition == 2
                    && msg.metadata.attempt == 2
                    && msg.metadata.original == MessageProvenance::new("charges-delta", 2, 17)
                    && msg.metadata.due_at.is_some_and(|due| due >= before)
                    && msg.metadata.failure_reason.is_none()
            })
            .times(1)
            .returning(|_| Ok(()));

        let disposition = controller(processor, producer).handle(message(1)).await;

        assert_eq!(
            disposition.unwrap(),
            Disposition::Retried { next_attempt: 2 }
        );
    }

    #[tokio::test]
    async fn test_exhausted_retries_go_to_dead_letter_channel() {
        let mut processor = MockDeltaProcessor::new();
        processor
            .expect_process()
            .times(1)
            .returning(|_, _| Err(DeltaError::ApiUnavailable(503)));
        let mut producer = MockDeltaChannelProducer::new();
        producer
            .expect_publish()
            .withf(|msg: &ChannelMessage| {
                msg.channel == "charges-delta-charges-delta-consumer-error"
                    && msg.metadata.attempt == 4
                    && msg.metadata.failure_reason.as_deref()
                        == Some("charges data api responded with status 503")
            })
            .times(1)
            .returning(|_| Ok(()));

        let disposition = controller(processor, producer).handle(message(4)).await;

        assert_eq!(disposition.unwrap(), Disposition::DeadLettered);
    }

    #[tokio::test]
    async fn test_non_retryable_failure_skips_retry_channel() {
        let mut processor = MockDeltaProcessor::new();
        processor
            .expect_process()
            .times(1)
            .returning(|_, _| Err(DeltaError::ApiRejected(400)));
        let mut producer = MockDeltaChannelProducer::new();
        producer
            .expect_publish()
            .withf(|msg: &ChannelMessage| {
                msg.channel == "charges-delta-charges-delta-consumer-error"
                    && msg.metadata.attempt == 1
            })
            .times(1)
            .returning(|_| Ok(()));

        let disposition = controller(processor, producer).handle(message(1)).await;

        assert_eq!(disposition.unwrap(), Disposition::DeadLettered);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_dead_lettered_without_processing() {
        let mut processor = MockDeltaProcessor::new();
        processor.expect_process().times(0);
        let mut producer = MockDeltaChannelProducer::new();
        producer
            .expect_publish()
            .withf(|msg: &ChannelMessage| {
                msg.channel.ends_with("-error") && msg.payload.as_ref() == [0x0a, 0x05, b'{']
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut bad = message(1);
        bad.payload = Bytes::from_static(&[0x0a, 0x05, b'{']);
        let disposition = controller(processor, producer).handle(bad).await;

        assert_eq!(disposition.unwrap(), Disposition::DeadLettered);
    }

    #[tokio::test]
    async fn test_failed_routing_surfaces_error() {
        let mut processor = MockDeltaProcessor::new();
        processor
            .expect_process()
            .times(1)
            .returning(|_, _| Err(DeltaError::ApiUnavailable(500)));
        let mut producer = MockDeltaChannelProducer::new();
        producer
            .expect_publish()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("no responders")));

        let result = controller(processor, producer).handle(message(2)).await;

        assert!(result.is_err());
    }
}
