use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use super::log_fields::{split_partition, RecordedHeaders};
use super::publisher::{PublishRequest, PublishResponse};
use crate::nats::trace_context::inject_trace_context;
use tower::{Layer, Service};
use tracing::{error, field, info, info_span, Instrument, Span};

type BoxFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

/// Opens a producer span per publish and writes its context into the outgoing headers
#[derive(Clone, Default)]
pub struct NatsPublishTracingLayer;

impl NatsPublishTracingLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for NatsPublishTracingLayer {
    type Service = NatsPublishTracingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        NatsPublishTracingService { inner: service }
    }
}

#[derive(Clone)]
pub struct NatsPublishTracingService<S> {
    inner: S,
}

impl<S> Service<PublishRequest> for NatsPublishTracingService<S>
where
    S: Service<PublishRequest, Response = PublishResponse> + Clone + Send + 'static,
    S::Error: std::fmt::Display + Send,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: PublishRequest) -> Self::Future {
        let (channel, partition) = split_partition(&req.subject);
        let span = info_span!(
            target: "nats",
            "nats_publish",
            otel.name = %format!("{channel} publish"),
            otel.kind = "producer",
            messaging.system = "nats",
            messaging.operation = "publish",
            messaging.destination.name = %channel,
            messaging.destination.partition.id = %partition,
            messaging.message.body.size = req.payload.len(),
            otel.status_code = field::Empty,
            otel.status_description = field::Empty,
        );
        span.in_scope(|| inject_trace_context(&mut req.headers));

        let mut inner = self.inner.clone();
        Box::pin(
            async move {
                let result = inner.call(req).await;
                let span = Span::current();
                match &result {
                    Ok(_) => {
                        span.record("otel.status_code", "OK");
                    }
                    Err(e) => {
                        span.record("otel.status_code", "ERROR");
                        span.record("otel.status_description", field::display(e));
                    }
                }
                result
            }
            .instrument(span),
        )
    }
}

/// Logs one line per publish: where it went, how long the ack took, and the
/// recorded headers that say why the message was sent
#[derive(Clone, Default)]
pub struct NatsPublishLoggingLayer {
    recorded: RecordedHeaders,
}

impl NatsPublishLoggingLayer {
    pub fn new(recorded: RecordedHeaders) -> Self {
        Self { recorded }
    }
}

impl<S> Layer<S> for NatsPublishLoggingLayer {
    type Service = NatsPublishLoggingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        NatsPublishLoggingService {
            inner: service,
            recorded: self.recorded.clone(),
        }
    }
}

#[derive(Clone)]
pub struct NatsPublishLoggingService<S> {
    inner: S,
    recorded: RecordedHeaders,
}

impl<S> Service<PublishRequest> for NatsPublishLoggingService<S>
where
    S: Service<PublishRequest, Response = PublishResponse> + Clone + Send + 'static,
    S::Error: std::fmt::Display + Send,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: PublishRequest) -> Self::Future {
        let (channel, partition) = split_partition(&req.subject);
        let (channel, partition) = (channel.to_string(), partition.to_string());
        let headers = self.recorded.render(Some(&req.headers));
        let start = Instant::now();
        let mut inner = self.inner.clone();

        Box::pin(
            async move {
                let result = inner.call(req).await;
                let ack_ms = start.elapsed().as_millis() as u64;

                match &result {
                    Ok(_) => info!(
                        channel = %channel,
                        partition = %partition,
                        headers = %headers,
                        ack_ms,
                        "published to {channel}.{partition}"
                    ),
                    Err(e) => error!(
                        channel = %channel,
                        partition = %partition,
                        headers = %headers,
                        ack_ms,
                        error = %e,
                        "publish to {channel}.{partition} failed: {e}"
                    ),
                }
                result
            }
            .in_current_span(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::{service_fn, ServiceExt};

    async fn accept(req: PublishRequest) -> anyhow::Result<PublishResponse> {
        anyhow::ensure!(
            req.headers.get("delta-retry-attempt").map(|v| v.as_str()) == Some("3"),
            "retry attempt header lost"
        );
        Ok(PublishResponse {
            subject: req.subject,
        })
    }

    fn request() -> PublishRequest {
        let mut headers = async_nats::HeaderMap::new();
        headers.insert("delta-retry-attempt", "3");
        PublishRequest::new("charges-delta-charges-delta-consumer-error.1", "body")
            .with_headers(headers)
    }

    #[tokio::test]
    async fn test_logging_layer_passes_request_and_response_through() {
        let service = NatsPublishLoggingLayer::new(RecordedHeaders::new(&["delta-retry-attempt"]))
            .layer(service_fn(accept));

        let response = service.oneshot(request()).await.unwrap();

        assert_eq!(
            response.subject,
            "charges-delta-charges-delta-consumer-error.1"
        );
    }

    #[tokio::test]
    async fn test_tracing_layer_keeps_existing_headers() {
        let service = NatsPublishTracingLayer::new().layer(service_fn(accept));

        let response = service.oneshot(request()).await;

        assert!(response.is_ok());
    }

    #[tokio::test]
    async fn test_layers_return_inner_error_unchanged() {
        let failing = service_fn(|_: PublishRequest| async {
            Err::<PublishResponse, _>(anyhow::anyhow!("no responders"))
        });
        let service = NatsPublishTracingLayer::new()
            .layer(NatsPublishLoggingLayer::default().layer(failing));

        let err = service.oneshot(request()).await.unwrap_err();

        assert_eq!(err.to_string(), "no responders");
    }
}
