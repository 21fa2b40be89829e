use anyhow::{Context, Result};
use common::domain::{ClaimPosition, ClaimRequest, DomainError, GroupStart, RawMessage, ReadingLog};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};
use tracing::{debug, error, info, warn};

use super::{ConsumeRequest, ConsumeResponse};

/// Where and how a [`StreamConsumer`] claims messages.
#[derive(Debug, Clone)]
pub struct StreamConsumerConfig {
    pub stream: String,
    pub group: String,
    pub consumer: String,
    pub batch_size: usize,
    /// Longest wait for new messages per claim.
    pub block: Duration,
    /// Backoff after the log is unreachable.
    pub connection_retry: Duration,
    /// Backoff after any other claim failure, and before replaying naked messages.
    pub error_retry: Duration,
}

impl Default for StreamConsumerConfig {
    fn default() -> Self {
        Self {
            stream: "energy_readings".to_string(),
            group: "processing_group".to_string(),
            consumer: "processor-1".to_string(),
            batch_size: 10,
            block: Duration::from_millis(2000),
            connection_retry: Duration::from_secs(5),
            error_retry: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Default)]
struct BatchOutcome {
    last_message_id: Option<String>,
    naked: usize,
    unacked: usize,
    cancelled: bool,
}

/// Consumer-group reader that feeds claimed messages, one at a time, through
/// a Tower service and acknowledges the ones it acks.
///
/// Messages are delivered at least once. A naked message stays in this
/// consumer's pending set; after a backoff the consumer replays its pending
/// entries once, oldest first, then goes back to new messages. It also
/// replays on startup, which picks up whatever a previous run left behind.
pub struct StreamConsumer<S> {
    log: Arc<dyn ReadingLog>,
    config: StreamConsumerConfig,
    service: S,
}

impl<S> StreamConsumer<S>
where
    S: Service<ConsumeRequest, Response = ConsumeResponse, Error = anyhow::Error>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    /// Create the consumer, creating its group (and the stream) if missing.
    pub async fn new(
        log: Arc<dyn ReadingLog>,
        config: StreamConsumerConfig,
        service: S,
    ) -> Result<Self> {
        debug!(
            stream = %config.stream,
            group = %config.group,
            consumer = %config.consumer,
            "creating stream consumer"
        );

        match log
            .ensure_group(&config.stream, &config.group, GroupStart::Origin)
            .await
        {
            Ok(()) => info!(
                stream = %config.stream,
                group = %config.group,
                "created consumer group"
            ),
            Err(DomainError::GroupAlreadyExists(_)) => info!(
                stream = %config.stream,
                group = %config.group,
                "consumer group already exists"
            ),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "failed to create consumer group '{}' on stream '{}'",
                        config.group, config.stream
                    )
                })
            }
        }

        Ok(Self {
            log,
            config,
            service,
        })
    }

    /// Run the claim loop until cancellation.
    pub async fn run(self, ctx: CancellationToken) -> Result<()> {
        info!(
            stream = %self.config.stream,
            group = %self.config.group,
            consumer = %self.config.consumer,
            "starting stream consumer"
        );

        let mut position = ClaimPosition::pending_from_start();
        let mut replay_due = false;

        while !ctx.is_cancelled() {
            let request = self.claim_request(&position);

            let claimed = tokio::select! {
                _ = ctx.cancelled() => break,
                result = self.log.claim(&request) => result,
            };

            let messages = match claimed {
                Ok(messages) => messages,
                Err(e) => {
                    let delay = if e.is_unavailable() {
                        self.config.connection_retry
                    } else {
                        self.config.error_retry
                    };
                    error!(
                        stream = %self.config.stream,
                        consumer = %self.config.consumer,
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        "failed to claim messages"
                    );
                    if !sleep_or_cancel(&ctx, delay).await {
                        break;
                    }
                    continue;
                }
            };

            let replaying = matches!(position, ClaimPosition::PendingAfter(_));
            if replaying && messages.is_empty() {
                debug!(consumer = %self.config.consumer, "pending entries replayed");
                position = ClaimPosition::Undelivered;
                continue;
            }

            if !messages.is_empty() {
                debug!(
                    message_count = messages.len(),
                    replaying, "received message batch"
                );

                let batch = self.process_batch(messages, &ctx).await;
                if batch.naked > 0 || batch.unacked > 0 {
                    replay_due = true;
                }
                if batch.cancelled {
                    break;
                }
                if replaying {
                    if let Some(last) = batch.last_message_id {
                        position = ClaimPosition::PendingAfter(last);
                    }
                    continue;
                }
            }

            if replay_due {
                debug!(
                    consumer = %self.config.consumer,
                    retry_in_ms = self.config.error_retry.as_millis() as u64,
                    "replaying pending entries after backoff"
                );
                if !sleep_or_cancel(&ctx, self.config.error_retry).await {
                    break;
                }
                replay_due = false;
                position = ClaimPosition::pending_from_start();
            }
        }

        info!(
            stream = %self.config.stream,
            consumer = %self.config.consumer,
            "stream consumer stopped"
        );
        Ok(())
    }

    fn claim_request(&self, position: &ClaimPosition) -> ClaimRequest {
        ClaimRequest {
            stream: self.config.stream.clone(),
            group: self.config.group.clone(),
            consumer: self.config.consumer.clone(),
            count: self.config.batch_size,
            block: match position {
                ClaimPosition::Undelivered => Some(self.config.block),
                ClaimPosition::PendingAfter(_) => None,
            },
            position: position.clone(),
        }
    }

    async fn process_batch(&self, messages: Vec<RawMessage>, ctx: &CancellationToken) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for message in messages {
            // Whatever is left of the batch stays pending.
            if ctx.is_cancelled() {
                outcome.cancelled = true;
                break;
            }

            let message_id = message.message_id.clone();
            let response = match self
                .service
                .clone()
                .oneshot(ConsumeRequest::new(message))
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    error!(
                        message_id = %message_id,
                        error = %e,
                        "service error processing message"
                    );
                    ConsumeResponse::nak(e.to_string())
                }
            };

            match response {
                ConsumeResponse::Ack => {
                    if !self.acknowledge(&message_id).await {
                        outcome.unacked += 1;
                    }
                }
                ConsumeResponse::Nak(reason) => {
                    warn!(
                        message_id = %message_id,
                        reason = reason.as_deref().unwrap_or("none"),
                        "leaving message pending"
                    );
                    outcome.naked += 1;
                }
            }

            outcome.last_message_id = Some(message_id);
        }

        outcome
    }

    /// Returns `false` if the message may still be pending.
    async fn acknowledge(&self, message_id: &str) -> bool {
        match self
            .log
            .acknowledge(&self.config.stream, &self.config.group, message_id)
            .await
        {
            Ok(true) => {
                debug!(message_id = %message_id, "acknowledged message");
                true
            }
            Ok(false) => {
                warn!(message_id = %message_id, "message was no longer pending");
                true
            }
            Err(e) => {
                error!(
                    message_id = %message_id,
                    error = %e,
                    "failed to acknowledge message"
                );
                false
            }
        }
    }
}

/// Sleeps for `delay`; returns `false` if cancelled first.
async fn sleep_or_cancel(ctx: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = ctx.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
