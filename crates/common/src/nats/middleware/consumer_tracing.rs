use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::consumer_types::{ConsumeRequest, ConsumeResponse};
use crate::nats::trace_context::set_parent_from_headers;
use tower::{Layer, Service};
use tracing::{field, info_span, Instrument, Span};

/// Configuration for the consume tracing layer
#[derive(Clone, Debug, Default)]
pub struct NatsConsumeTracingConfig {
    /// Span name reported for every consumed message
    pub operation_name: String,
}

impl NatsConsumeTracingConfig {
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
        }
    }
}

/// Opens a span per consumed message, parented on the publisher's trace
#[derive(Clone)]
pub struct NatsConsumeTracingLayer {
    config: NatsConsumeTracingConfig,
}

impl NatsConsumeTracingLayer {
    pub fn new(config: NatsConsumeTracingConfig) -> Self {
        Self { config }
    }
}

impl<S> Layer<S> for NatsConsumeTracingLayer {
    type Service = NatsConsumeTracingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        NatsConsumeTracingService {
            inner: service,
            config: self.config.clone(),
        }
    }
}

#[derive(Clone)]
pub struct NatsConsumeTracingService<S> {
    inner: S,
    config: NatsConsumeTracingConfig,
}

impl<S> Service<ConsumeRequest> for NatsConsumeTracingService<S>
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
        let span = info_span!(
            target: "nats",
            "nats_consume",
            otel.name = %self.config.operation_name,
            messaging.system = "nats",
            messaging.operation = "process",
            messaging.destination.name = %req.subject,
            messaging.message.sequence = req.stream_sequence,
            messaging.message.body.size = req.payload.len(),
            otel.status_code = field::Empty,
        );

        {
            let _entered = span.enter();
            set_parent_from_headers(req.headers.as_ref());
        }

        let mut inner = self.inner.clone();

        Box::pin(
            async move {
                let result = inner.call(req).await;

                match &result {
                    Ok(ConsumeResponse::Ack) => {
                        Span::current().record("otel.status_code", "OK");
                    }
                    Ok(ConsumeResponse::Nak(_)) => {
                        Span::current().record("otel.status_code", "ERROR");
                    }
                    Err(e) => {
                        Span::current().record("otel.status_code", "ERROR");
                        tracing::error!(error = %e, "nats consume failed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}
