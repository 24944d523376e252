use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use super::log_fields::RecordedHeaders;
use super::publish_layers::{
    NatsPublishLoggingLayer, NatsPublishLoggingService, NatsPublishTracingLayer,
    NatsPublishTracingService,
};
use crate::nats::JetStreamPublisher;
use anyhow::Result;
use async_nats::HeaderMap;
use bytes::Bytes;
use tower::{Service, ServiceBuilder};

/// A message on its way out through the publish stack
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// `{channel}.{partition}`
    pub subject: String,
    pub payload: Bytes,
    /// Caller headers; the tracing layer adds trace context
    pub headers: HeaderMap,
}

impl PublishRequest {
    pub fn new(subject: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            subject: subject.into(),
            payload: payload.into(),
            headers: HeaderMap::new(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// Returned once JetStream acked the message
#[derive(Debug)]
pub struct PublishResponse {
    pub subject: String,
}

/// Innermost service: hands the request to JetStream and waits for the ack
#[derive(Clone)]
pub struct NatsPublishService {
    publisher: Arc<dyn JetStreamPublisher>,
}

impl NatsPublishService {
    pub fn new(publisher: Arc<dyn JetStreamPublisher>) -> Self {
        Self { publisher }
    }
}

impl Service<PublishRequest> for NatsPublishService {
    type Response = PublishResponse;
    type Error = anyhow::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: PublishRequest) -> Self::Future {
        let publisher = Arc::clone(&self.publisher);
        let subject = req.subject.clone();

        Box::pin(async move {
            publisher
                .publish_with_headers(subject.clone(), req.headers, req.payload)
                .await?;
            Ok(PublishResponse { subject })
        })
    }
}

/// Publish stack used by every producer: tracing -> logging -> publish
pub type LayeredPublisher = NatsPublishTracingService<NatsPublishLoggingService<NatsPublishService>>;

pub fn layered_publisher(
    publisher: Arc<dyn JetStreamPublisher>,
    recorded: RecordedHeaders,
) -> LayeredPublisher {
    ServiceBuilder::new()
        .layer(NatsPublishTracingLayer::new())
        .layer(NatsPublishLoggingLayer::new(recorded))
        .service(NatsPublishService::new(publisher))
}
