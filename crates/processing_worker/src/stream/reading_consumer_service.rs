use crate::domain::{ProcessOutcome, ReadingService};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;
use tracing::{debug, warn};

use super::{ConsumeRequest, ConsumeResponse};

/// Tower service wrapping [`ReadingService`]: stored or skipped messages are
/// acked, failures are naked and stay pending.
#[derive(Clone)]
pub struct ReadingConsumerService {
    domain_service: Arc<ReadingService>,
}

impl ReadingConsumerService {
    pub fn new(domain_service: Arc<ReadingService>) -> Self {
        Self { domain_service }
    }
}

impl Service<ConsumeRequest> for ReadingConsumerService {
    type Response = ConsumeResponse;
    type Error = anyhow::Error;
    type Future = BoxFuture<'static, Result<ConsumeResponse, anyhow::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ConsumeRequest) -> Self::Future {
        let domain_service = Arc::clone(&self.domain_service);

        Box::pin(async move {
            let message_id = req.message.message_id.clone();

            match domain_service.process(&req.message).await {
                Ok(ProcessOutcome::Stored { key, .. }) => {
                    debug!(message_id = %message_id, key = %key, "reading processed");
                    Ok(ConsumeResponse::ack())
                }
                Ok(ProcessOutcome::Skipped { reason }) => {
                    debug!(message_id = %message_id, reason = %reason, "reading skipped");
                    Ok(ConsumeResponse::ack())
                }
                Err(e) => {
                    warn!(
                        message_id = %message_id,
                        error = %e,
                        "failed to process reading"
                    );
                    Ok(ConsumeResponse::nak(e.to_string()))
                }
            }
        })
    }
}
