use crate::nats::traits::{JetStreamConsumer, JetStreamPublisher, PullConsumer};
use anyhow::{Context, Result};
use async_nats::jetstream::{self, stream::Config as StreamConfig};
use async_nats::HeaderMap;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, error, info};

pub struct NatsClient {
    client: async_nats::Client,
    jetstream: jetstream::Context,
}

impl NatsClient {
    pub async fn connect(url: &str, timeout: std::time::Duration) -> Result<Self> {
        info!(url = %url, timeout_ms = timeout.as_millis(), "connecting to NATS");

        let client = async_nats::ConnectOptions::new()
            .connection_timeout(timeout)
            .connect(url)
            .await
            .context("failed to connect to NATS")?;

        let jetstream = jetstream::new(client.clone());

        info!("connected to NATS");
        Ok(Self { client, jetstream })
    }

    /// Make sure a stream named `stream_name` exists and captures exactly `subjects`.
    ///
    /// An existing stream whose subject set differs is updated in place, so
    /// publishes to subjects outside the set are rejected by the server
    /// instead of being stored where no consumer reads them.
    pub async fn ensure_stream(
        &self,
        stream_name: &str,
        description: &str,
        subjects: Vec<String>,
    ) -> Result<()> {
        debug!(stream = %stream_name, subjects = ?subjects, "ensuring stream exists");

        if let Ok(mut stream) = self.jetstream.get_stream(stream_name).await {
            let mut config = stream.info().await?.config.clone();
            if config.subjects == subjects {
                debug!(stream = %stream_name, "stream already exists");
                return Ok(());
            }

            config.subjects = subjects;
            self.jetstream
                .update_stream(&config)
                .await
                .with_context(|| format!("failed to update subjects of stream {stream_name}"))?;
            info!(stream = %stream_name, subjects = ?config.subjects, "updated stream subjects");
            return Ok(());
        }

        let stream_config = StreamConfig {
            name: stream_name.to_string(),
            subjects,
            description: Some(description.to_string()),
            ..Default::default()
        };

        self.jetstream
            .create_stream(stream_config)
            .await
            .with_context(|| format!("failed to create stream {stream_name}"))?;
        info!(stream = %stream_name, "created stream");

        Ok(())
    }

    pub fn jetstream(&self) -> &jetstream::Context {
        &self.jetstream
    }

    /// Create a JetStreamConsumer trait object from this client
    pub fn create_consumer_client(&self) -> Arc<dyn JetStreamConsumer> {
        Arc::new(NatsJetStreamConsumer::new(self.jetstream.clone()))
    }

    /// Create a JetStreamPublisher trait object from this client
    pub fn create_publisher_client(&self) -> Arc<dyn JetStreamPublisher> {
        Arc::new(NatsJetStreamPublisher::new(self.jetstream.clone()))
    }

    /// Flush anything still buffered before the connection is dropped
    pub async fn close(&self) -> Result<()> {
        info!("closing NATS connection");
        self.client
            .flush()
            .await
            .context("failed to flush NATS connection")?;
        Ok(())
    }
}

/// JetStreamConsumer backed by async-nats
pub struct NatsJetStreamConsumer {
    context: jetstream::Context,
}

impl NatsJetStreamConsumer {
    pub fn new(context: jetstream::Context) -> Self {
        Self { context }
    }
}

#[async_trait]
impl JetStreamConsumer for NatsJetStreamConsumer {
    async fn create_consumer(
        &self,
        config: jetstream::consumer::pull::Config,
        stream_name: &str,
    ) -> Result<Box<dyn PullConsumer>> {
        let consumer = self
            .context
            .create_consumer_on_stream(config, stream_name)
            .await
            .context("failed to create consumer")?;

        Ok(Box::new(NatsPullConsumer { consumer }))
    }
}

/// PullConsumer backed by async-nats
pub struct NatsPullConsumer {
    consumer: jetstream::consumer::PullConsumer,
}

#[async_trait]
impl PullConsumer for NatsPullConsumer {
    async fn fetch_messages(
        &self,
        max_messages: usize,
        expires: std::time::Duration,
    ) -> Result<Vec<jetstream::Message>> {
        use futures::StreamExt;

        let mut messages = self
            .consumer
            .fetch()
            .max_messages(max_messages)
            .expires(expires)
            .messages()
            .await
            .context("failed to fetch messages")?;

        let mut result = Vec::new();
        while let Some(msg) = messages.next().await {
            match msg {
                Ok(message) => result.push(message),
                Err(e) => {
                    // Skipped messages are redelivered once their ack wait lapses
                    error!(error = %e, "error receiving message");
                }
            }
        }
        Ok(result)
    }
}

/// JetStreamPublisher backed by async-nats
pub struct NatsJetStreamPublisher {
    context: jetstream::Context,
}

impl NatsJetStreamPublisher {
    pub fn new(context: jetstream::Context) -> Self {
        Self { context }
    }
}

#[async_trait]
impl JetStreamPublisher for NatsJetStreamPublisher {
    async fn get_stream(&self, stream_name: &str) -> Result<()> {
        self.context
            .get_stream(stream_name)
            .await
            .context("failed to get stream")?;
        Ok(())
    }

    async fn create_stream(&self, config: jetstream::stream::Config) -> Result<()> {
        self.context
            .create_stream(config)
            .await
            .context("failed to create stream")?;
        Ok(())
    }

    async fn publish_with_headers(
        &self,
        subject: String,
        headers: HeaderMap,
        payload: Bytes,
    ) -> Result<()> {
        let ack = self
            .context
            .publish_with_headers(subject, headers, payload)
            .await
            .context("failed to publish message to JetStream")?;

        ack.await
            .context("failed to receive JetStream acknowledgment")?;
        Ok(())
    }
}
