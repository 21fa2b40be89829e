//! A concurrent application runner that supervises long-running processes.
//!
//! The runner owns every spawned process and a single [`CancellationToken`].
//! Whatever ends the run (a shutdown signal, a process failure, or external
//! cancellation), the same sequence follows:
//! - the token is cancelled so every process can stop at its next suspension point
//! - processes get a bounded drain window, after which stragglers are aborted
//! - closers run concurrently under their own timeout
//!
//! # Example
//!
//! ```no_run
//! use meterflow_runner::Runner;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let runner = Runner::new()
//!         .with_named_process("ticker", |ctx| async move {
//!             loop {
//!                 tokio::select! {
//!                     _ = ctx.cancelled() => {
//!                         tracing::info!("ticker stopping gracefully");
//!                         break;
//!                     }
//!                     _ = tokio::time::sleep(Duration::from_secs(1)) => {
//!                         tracing::info!("tick");
//!                     }
//!                 }
//!             }
//!             Ok(())
//!         })
//!         .with_closer(|| async move {
//!             tracing::info!("cleaning up resources");
//!             Ok(())
//!         })
//!         .with_closer_timeout(Duration::from_secs(5));
//!
//!     runner.run().await;
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Boxed future returned by app processes and closers.
pub type ProcessFuture = Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send>>;

/// An app process: takes the shared cancellation token and runs until it fires.
pub type AppProcess = Box<dyn FnOnce(CancellationToken) -> ProcessFuture + Send>;

/// A closer, executed once after all app processes have stopped.
pub type Closer = Box<dyn FnOnce() -> ProcessFuture + Send>;

struct NamedProcess {
    name: String,
    process: AppProcess,
}

/// How a run ended.
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Name of the first process that failed, if any.
    pub failed_process: Option<String>,
    /// The first error that triggered shutdown.
    pub error: Option<anyhow::Error>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Supervises named app processes and closers.
pub struct Runner {
    processes: Vec<NamedProcess>,
    closers: Vec<Closer>,
    closer_timeout: Duration,
    drain_timeout: Duration,
    cancellation_token: CancellationToken,
    handle_signals: bool,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// Creates a runner with a 10 second closer timeout, a 10 second drain
    /// timeout and signal handling enabled.
    pub fn new() -> Self {
        Self {
            processes: Vec::new(),
            closers: Vec::new(),
            closer_timeout: Duration::from_secs(10),
            drain_timeout: Duration::from_secs(10),
            cancellation_token: CancellationToken::new(),
            handle_signals: true,
        }
    }

    /// Adds an unnamed app process. It is labelled `process-<n>` in logs.
    pub fn with_app_process<F, Fut>(self, process: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        let name = format!("process-{}", self.processes.len());
        self.with_named_process(name, process)
    }

    /// Adds a named app process.
    ///
    /// App processes run concurrently. If any process returns an error, the
    /// shared token is cancelled and the remaining processes are drained.
    pub fn with_named_process<N, F, Fut>(mut self, name: N, process: F) -> Self
    where
        N: Into<String>,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        self.processes.push(NamedProcess {
            name: name.into(),
            process: Box::new(|token| Box::pin(process(token))),
        });
        self
    }

    /// Adds a closer. Closers run after all app processes have stopped,
    /// regardless of why they stopped. A failing closer does not stop the others.
    pub fn with_closer<F, Fut>(mut self, closer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), anyhow::Error>> + Send + 'static,
    {
        self.closers.push(Box::new(|| Box::pin(closer())));
        self
    }

    /// Sets the timeout for executing closers. Default is 10 seconds.
    pub fn with_closer_timeout(mut self, timeout: Duration) -> Self {
        self.closer_timeout = timeout;
        self
    }

    /// Sets how long cancelled processes may take to stop before they are
    /// aborted. Default is 10 seconds.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Sets a custom cancellation token, allowing external control over shutdown.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Disables SIGINT/SIGTERM handling. Shutdown then only happens through
    /// the cancellation token or a process failure.
    pub fn without_signal_handlers(mut self) -> Self {
        self.handle_signals = false;
        self
    }

    /// Runs until shutdown and exits the process with 0 on a clean stop, 1 otherwise.
    pub async fn run(self) -> ! {
        let outcome = self.run_until_stopped().await;

        match &outcome.error {
            Some(err) => error!(
                process = outcome.failed_process.as_deref().unwrap_or("unknown"),
                "application exiting with error: {:#}",
                err
            ),
            None => info!("application exiting normally"),
        }

        std::process::exit(outcome.exit_code());
    }

    /// Runs all processes until shutdown, drains them, runs closers, and
    /// reports how the run ended.
    pub async fn run_until_stopped(self) -> RunOutcome {
        let token = self.cancellation_token;
        let mut join_set = JoinSet::new();
        let mut outcome = RunOutcome::default();

        for NamedProcess { name, process } in self.processes {
            let process_token = token.clone();
            debug!(process = %name, "starting app process");
            join_set.spawn(async move {
                let result = process(process_token).await;
                (name, result)
            });
        }

        let signal_task = self
            .handle_signals
            .then(|| tokio::spawn(cancel_on_shutdown_signal(token.clone())));

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("cancellation requested, stopping app processes");
                    break;
                }
                joined = join_set.join_next() => {
                    match joined {
                        None => {
                            debug!("all app processes finished");
                            break;
                        }
                        Some(Ok((name, Ok(())))) => {
                            debug!(process = %name, "app process completed successfully");
                        }
                        Some(Ok((name, Err(err)))) => {
                            error!(process = %name, "app process error: {:#}", err);
                            outcome.failed_process = Some(name);
                            outcome.error = Some(err);
                            token.cancel();
                            break;
                        }
                        Some(Err(err)) => {
                            error!("app process panicked: {}", err);
                            outcome.error = Some(anyhow::anyhow!("app process panicked: {}", err));
                            token.cancel();
                            break;
                        }
                    }
                }
            }
        }

        token.cancel();
        Self::drain(&mut join_set, self.drain_timeout).await;

        if let Some(task) = signal_task {
            task.abort();
        }

        if !self.closers.is_empty() {
            info!("running closers with timeout of {:?}", self.closer_timeout);

            match tokio::time::timeout(self.closer_timeout, Self::run_closers(self.closers)).await
            {
                Ok(()) => info!("all closers completed"),
                Err(_) => error!("closers timed out after {:?}", self.closer_timeout),
            }
        }

        outcome
    }

    /// Waits for cancelled processes to return, aborting whatever is left
    /// when the drain window closes.
    async fn drain(join_set: &mut JoinSet<(String, Result<(), anyhow::Error>)>, timeout: Duration) {
        let drained = tokio::time::timeout(timeout, async {
            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((name, Ok(()))) => debug!(process = %name, "app process stopped"),
                    Ok((name, Err(err))) => {
                        warn!(process = %name, "app process returned error during shutdown: {:#}", err)
                    }
                    Err(err) if err.is_cancelled() => {}
                    Err(err) => error!("app process panicked during shutdown: {}", err),
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = join_set.len(),
                "app processes did not stop within {:?}, aborting", timeout
            );
            join_set.shutdown().await;
        }
    }

    /// Runs all closers concurrently.
    async fn run_closers(closers: Vec<Closer>) {
        let mut closer_set = JoinSet::new();

        for closer in closers {
            closer_set.spawn(async move { closer().await });
        }

        while let Some(result) = closer_set.join_next().await {
            match result {
                Ok(Ok(())) => debug!("closer completed successfully"),
                Ok(Err(err)) => error!("closer error: {:#}", err),
                Err(err) => error!("closer panicked: {}", err),
            }
        }
    }
}

/// Cancels `token` on the first SIGINT, or SIGTERM on Unix.
async fn cancel_on_shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("error setting up SIGINT handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("error setting up SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT signal"),
        _ = terminate => info!("received SIGTERM signal"),
    }

    token.cancel();
}
