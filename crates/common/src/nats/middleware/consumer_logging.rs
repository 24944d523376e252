use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use super::consumer_types::{ConsumeRequest, ConsumeResponse};
use super::log_fields::{split_partition, RecordedHeaders};
use tower::{Layer, Service};
use tracing::{error, info, warn, Instrument};

/// Logs one line per consumed message: its position, the recorded headers,
/// whether it was committed, and how long handling took
#[derive(Clone, Default)]
pub struct NatsConsumeLoggingLayer {
    recorded: RecordedHeaders,
}

impl NatsConsumeLoggingLayer {
    pub fn new(recorded: RecordedHeaders) -> Self {
        Self { recorded }
    }
}

impl<S> Layer<S> for NatsConsumeLoggingLayer {
    type Service = NatsConsumeLoggingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        NatsConsumeLoggingService {
            inner: service,
            recorded: self.recorded.clone(),
        }
    }
}

#[derive(Clone)]
pub struct NatsConsumeLoggingService<S> {
    inner: S,
    recorded: RecordedHeaders,
}

impl<S> Service<ConsumeRequest> for NatsConsumeLoggingService<S>
where
    S: Service<ConsumeRequest, Response = ConsumeResponse> + Clone + Send + 'static,
    S::Error: std::fmt::Display + Send,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: ConsumeRequest) -> Self::Future {
        let (channel, partition) = split_partition(&req.subject);
        let position = format!("{channel}.{partition}@{}", req.stream_sequence);
        let headers = self.recorded.render(req.headers.as_ref());
        let start = Instant::now();
        let mut inner = self.inner.clone();

        Box::pin(
            async move {
                let result = inner.call(req).await;
                let handled_ms = start.elapsed().as_millis() as u64;

                match &result {
                    Ok(ConsumeResponse::Ack) => info!(
                        position = %position,
                        headers = %headers,
                        handled_ms,
                        "committed {position}"
                    ),
                    Ok(ConsumeResponse::Nak(reason)) => warn!(
                        position = %position,
                        headers = %headers,
                        handled_ms,
                        reason = reason.as_deref().unwrap_or_default(),
                        "left {position} for redelivery"
                    ),
                    Err(e) => error!(
                        position = %position,
                        headers = %headers,
                        handled_ms,
                        error = %e,
                        "handling {position} failed: {e}"
                    ),
                }
                result
            }
            .in_current_span(),
        )
    }
}
