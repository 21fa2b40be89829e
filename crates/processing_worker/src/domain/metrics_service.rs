use common::domain::{DomainResult, ReadingLog, StreamStats};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone, Serialize)]
pub struct ConsumerGroupSummary {
    pub name: String,
    pub consumers: usize,
    pub pending: usize,
}

/// Stream length and consumer-group backlog at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineMetrics {
    pub stream: StreamStats,
    pub consumer_groups: Vec<ConsumerGroupSummary>,
}

pub struct MetricsService {
    log: Arc<dyn ReadingLog>,
    stream: String,
}

impl MetricsService {
    pub fn new(log: Arc<dyn ReadingLog>, stream: impl Into<String>) -> Self {
        Self {
            log,
            stream: stream.into(),
        }
    }

    #[instrument(skip(self), fields(stream = %self.stream))]
    pub async fn snapshot(&self) -> DomainResult<PipelineMetrics> {
        let stream = self.log.stream_stats(&self.stream).await?;
        let groups = self.log.group_stats(&self.stream).await?;

        Ok(PipelineMetrics {
            stream,
            consumer_groups: groups
                .into_iter()
                .map(|group| ConsumerGroupSummary {
                    name: group.name,
                    consumers: group.consumers,
                    pending: group.pending,
                })
                .collect(),
        })
    }

    pub async fn log_connected(&self) -> bool {
        self.log.ping().await.is_ok()
    }
}
