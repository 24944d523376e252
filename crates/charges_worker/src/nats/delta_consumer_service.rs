use super::delta_message;
use crate::domain::RetryController;
use common::nats::{ConsumeRequest, ConsumeResponse};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;
use tracing::{debug, error};

/// Tower service feeding consumed charge deltas to the [`RetryController`].
///
/// Used on both the source and the retry channel. Any message the controller
/// could settle (processed, retried or dead-lettered) is acked; a failure to
/// publish to the retry or dead-letter channel naks it for redelivery.
#[derive(Clone)]
pub struct ChargeDeltaConsumerService {
    controller: Arc<RetryController>,
}

impl ChargeDeltaConsumerService {
    pub fn new(controller: Arc<RetryController>) -> Self {
        Self { controller }
    }
}

impl Service<ConsumeRequest> for ChargeDeltaConsumerService {
    type Response = ConsumeResponse;
    type Error = anyhow::Error;
    type Future = BoxFuture<'static, Result<ConsumeResponse, anyhow::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ConsumeRequest) -> Self::Future {
        let controller = Arc::clone(&self.controller);

        Box::pin(async move {
            let message = delta_message(&req, &controller.channels().source);

            match controller.handle(message).await {
                Ok(disposition) => {
                    debug!(subject = %req.subject, ?disposition, "charge delta settled");
                    Ok(ConsumeResponse::ack())
                }
                Err(e) => {
                    error!(
                        subject = %req.subject,
                        error = format!("{e:#}"),
                        "failed to route charge delta, leaving it for redelivery"
                    );
                    Ok(ConsumeResponse::nak(e.to_string()))
                }
            }
        })
    }
}
