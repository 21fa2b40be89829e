//! Basic example of using the meterflow runner
//!
//! This example demonstrates:
//! - Running multiple named processes concurrently
//! - Graceful shutdown on SIGTERM/SIGINT (Ctrl+C) with a drain window
//! - Cleanup with closers
//!
//! Run with: cargo run --example basic_runner

use meterflow_runner::Runner;
use std::time::Duration;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting runner example");

    let runner = Runner::new()
        .with_named_process("poller", |ctx| async move {
            let mut polls = 0;
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => {
                        tracing::info!(polls, "poller stopping gracefully");
                        break;
                    }
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {
                        polls += 1;
                        tracing::info!(polls, "polled");
                    }
                }
            }
            Ok(())
        })
        // Fails after 30 seconds unless cancelled first, which stops the poller too
        .with_named_process("flaky", |ctx| async move {
            tokio::select! {
                _ = ctx.cancelled() => Ok(()),
                _ = tokio::time::sleep(Duration::from_secs(30)) => {
                    Err(anyhow::anyhow!("simulated failure after 30 seconds"))
                }
            }
        })
        .with_closer(|| async move {
            tracing::info!("closing connections");
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok(())
        })
        .with_drain_timeout(Duration::from_secs(3))
        .with_closer_timeout(Duration::from_secs(5));

    tracing::info!("Press Ctrl+C to trigger graceful shutdown");
    runner.run().await;
}
