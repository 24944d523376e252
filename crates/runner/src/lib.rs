//! Process supervisor for the delta consumer.
//!
//! Every partition worker is registered as an app process. All of them share
//! one [`CancellationToken`]: a SIGINT/SIGTERM, or the first process to fail,
//! cancels the token and the remaining workers finish the message they are on
//! before returning. Closers (flushing NATS, telemetry) then run under a
//! timeout, whatever the outcome.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

type BoxedFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// A long-running process started with the shared cancellation token
pub type AppProcess = Box<dyn FnOnce(CancellationToken) -> BoxedFuture + Send>;

/// A cleanup step run once every app process has stopped
pub type Closer = Box<dyn FnOnce() -> BoxedFuture + Send>;

pub struct Runner {
    app_processes: Vec<(String, AppProcess)>,
    closers: Vec<Closer>,
    closer_timeout: Duration,
    cancellation_token: CancellationToken,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    pub fn new() -> Self {
        Self {
            app_processes: Vec::new(),
            closers: Vec::new(),
            closer_timeout: Duration::from_secs(10),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Register a named app process. The name shows up in failure logs.
    pub fn with_app_process<F, Fut>(mut self, name: impl Into<String>, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.app_processes
            .push((name.into(), Box::new(|token| Box::pin(process(token)))));
        self
    }

    /// Register an already boxed process, as produced by worker assembly code
    pub fn with_boxed_process(mut self, name: impl Into<String>, process: AppProcess) -> Self {
        self.app_processes.push((name.into(), process));
        self
    }

    pub fn with_closer<F, Fut>(mut self, closer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.closers.push(Box::new(|| Box::pin(closer())));
        self
    }

    pub fn with_closer_timeout(mut self, timeout: Duration) -> Self {
        self.closer_timeout = timeout;
        self
    }

    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Run until every process has returned, then run the closers.
    ///
    /// Returns the first process error, if any.
    pub async fn run(self) -> anyhow::Result<()> {
        let token = self.cancellation_token;
        spawn_signal_listener(token.clone());

        let mut join_set = JoinSet::new();
        for (name, process) in self.app_processes {
            let process_token = token.clone();
            join_set.spawn(async move { (name, process(process_token).await) });
        }

        let mut first_error = None;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((name, Ok(()))) => {
                    tracing::debug!(process = %name, "app process finished");
                }
                Ok((name, Err(err))) => {
                    tracing::error!(process = %name, error = format!("{err:#}"), "app process failed");
                    if first_error.is_none() {
                        first_error = Some(err.context(format!("process {name} failed")));
                    }
                    token.cancel();
                }
                Err(join_err) => {
                    tracing::error!(error = %join_err, "app process panicked");
                    if first_error.is_none() {
                        first_error = Some(anyhow::anyhow!("app process panicked: {join_err}"));
                    }
                    token.cancel();
                }
            }
        }

        run_closers(self.closers, self.closer_timeout).await;

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn spawn_signal_listener(token: CancellationToken) {
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("received SIGINT, shutting down");
                ctrl_c_token.cancel();
            }
            Err(err) => tracing::error!(error = %err, "failed to listen for SIGINT"),
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("received SIGTERM, shutting down");
                token.cancel();
            }
            Err(err) => tracing::error!(error = %err, "failed to listen for SIGTERM"),
        }
    });
}

async fn run_closers(closers: Vec<Closer>, timeout: Duration) {
    if closers.is_empty() {
        return;
    }

    let all = async {
        let mut closer_set = JoinSet::new();
        for closer in closers {
            closer_set.spawn(closer());
        }
        while let Some(result) = closer_set.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::error!(error = format!("{err:#}"), "closer failed"),
                Err(err) => tracing::error!(error = %err, "closer panicked"),
            }
        }
    };

    if tokio::time::timeout(timeout, all).await.is_err() {
        tracing::error!(timeout_ms = timeout.as_millis() as u64, "closers timed out");
    }
}
