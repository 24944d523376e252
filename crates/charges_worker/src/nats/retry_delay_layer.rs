use super::retry_due_at;
use chrono::Utc;
use common::nats::{ConsumeRequest, ConsumeResponse};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tower::{Layer, Service};
use tracing::debug;

/// Holds a retried message back until its `delta-retry-due-at` time.
///
/// Sits on the retry consumer only, so the source partition keeps flowing
/// while a failed delta waits out its backoff. Messages without a due time
/// pass straight through.
#[derive(Clone, Debug)]
pub struct RetryDelayLayer {
    max_delay: Duration,
}

impl RetryDelayLayer {
    /// `max_delay` caps the wait if a due time lies implausibly far ahead
    pub fn new(max_delay: Duration) -> Self {
        Self { max_delay }
    }
}

impl<S> Layer<S> for RetryDelayLayer {
    type Service = RetryDelayService<S>;

    fn layer(&self, service: S) -> Self::Service {
        RetryDelayService {
            inner: service,
            max_delay: self.max_delay,
        }
    }
}

#[derive(Clone)]
pub struct RetryDelayService<S> {
    inner: S,
    max_delay: Duration,
}

impl<S> Service<ConsumeRequest> for RetryDelayService<S>
where
    S: Service<ConsumeRequest, Response = ConsumeResponse> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: ConsumeRequest) -> Self::Future {
        let delay = retry_due_at(&req)
            .and_then(|due| (due - Utc::now()).to_std().ok())
            .map(|delay| delay.min(self.max_delay));
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if let Some(delay) = delay {
                debug!(
                    subject = %req.subject,
                    delay_ms = delay.as_millis() as u64,
                    "waiting for retry backoff"
                );
                tokio::time::sleep(delay).await;
            }
            inner.call(req).await
        })
    }
}
