use crate::domain::{MetricsService, ReadingService, SiteHistoryService};
use crate::http::{build_router, ProcessingApiState};
use crate::stream::{ReadingConsumerService, StreamConsumer, StreamConsumerConfig};
use common::domain::{ReadingLog, SiteIndexStore};
use common::http::{run_http_server, HttpServerConfig};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub type WorkerProcess = Box<
    dyn FnOnce(CancellationToken) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>
        + Send,
>;

pub struct ProcessingWorkerConfig {
    pub consumer: StreamConsumerConfig,
    pub http: HttpServerConfig,
}

/// The stream consumer plus the read API that serves what it stores.
pub struct ProcessingWorker {
    consumer: StreamConsumer<ReadingConsumerService>,
    api_state: ProcessingApiState,
    http_config: HttpServerConfig,
}

impl ProcessingWorker {
    pub async fn new(
        log: Arc<dyn ReadingLog>,
        store: Arc<dyn SiteIndexStore>,
        config: ProcessingWorkerConfig,
    ) -> anyhow::Result<Self> {
        info!("Initializing processing worker module");

        let reading_service = Arc::new(ReadingService::new(Arc::clone(&store)));
        let api_state = ProcessingApiState {
            history: Arc::new(SiteHistoryService::new(store)),
            metrics: Arc::new(MetricsService::new(
                Arc::clone(&log),
                config.consumer.stream.clone(),
            )),
            consumer_name: config.consumer.consumer.clone(),
            consumer_group: config.consumer.group.clone(),
        };

        let consumer = StreamConsumer::new(
            log,
            config.consumer,
            ReadingConsumerService::new(reading_service),
        )
        .await?;

        info!("Processing worker initialized");

        Ok(Self {
            consumer,
            api_state,
            http_config: config.http,
        })
    }

    /// Named runner processes: the stream consumer and the read API server.
    pub fn into_runner_processes(self) -> Vec<(&'static str, WorkerProcess)> {
        let consumer = self.consumer;
        let consumer_process: WorkerProcess =
            Box::new(move |ctx| Box::pin(async move { consumer.run(ctx).await }));

        let router = build_router(self.api_state);
        let http_config = self.http_config;
        let api_process: WorkerProcess = Box::new(move |ctx| {
            Box::pin(async move { run_http_server(http_config, router, ctx).await })
        });

        vec![
            ("stream_consumer", consumer_process),
            ("processing_api", api_process),
        ]
    }
}
