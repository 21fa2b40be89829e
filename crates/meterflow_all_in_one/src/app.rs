use anyhow::Context;
use common::domain::{ReadingLog, SiteIndexStore};
use common::http::HttpServerConfig;
use common::memory::{InMemoryReadingLog, InMemorySiteIndexStore};
use common::redis_store::RedisClient;
use ingestion_api::domain::IngestionService;
use ingestion_api::ingestion_api::IngestionApi;
use meterflow_runner::Runner;
use processing_worker::processing_worker::{ProcessingWorker, ProcessingWorkerConfig};
use processing_worker::stream::StreamConsumerConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{Backend, ServiceConfig};

/// The reading log and site index every module shares.
#[derive(Clone)]
pub struct Backends {
    pub log: Arc<dyn ReadingLog>,
    pub store: Arc<dyn SiteIndexStore>,
}

impl Backends {
    pub fn in_memory() -> Self {
        Self {
            log: Arc::new(InMemoryReadingLog::new()),
            store: Arc::new(InMemorySiteIndexStore::new()),
        }
    }

    /// Connect the configured backend within `startup_timeout_secs`.
    pub async fn connect(config: &ServiceConfig) -> anyhow::Result<Self> {
        match config.backend {
            Backend::Memory => {
                info!("Using in-memory backends");
                Ok(Self::in_memory())
            }
            Backend::Redis => {
                info!("Initializing Redis...");
                let client = RedisClient::connect(
                    &config.redis_url,
                    Duration::from_secs(config.startup_timeout_secs),
                )
                .await?;
                let log = client
                    .create_reading_log()
                    .await
                    .context("Failed to open blocking Redis connection")?;

                Ok(Self {
                    log: Arc::new(log),
                    store: Arc::new(client.create_site_index_store()),
                })
            }
        }
    }
}

/// Ingestion API and processing worker wired to shared backends.
pub struct Application {
    ingestion_api: IngestionApi,
    processing_worker: ProcessingWorker,
    shutdown_timeout: Duration,
}

impl Application {
    pub async fn new(config: &ServiceConfig, backends: Backends) -> anyhow::Result<Self> {
        let ingestion_service = Arc::new(IngestionService::new(
            Arc::clone(&backends.log),
            config.stream_name.clone(),
        ));
        let ingestion_api = IngestionApi::new(
            ingestion_service,
            HttpServerConfig {
                host: config.ingestion_http_host.clone(),
                port: config.ingestion_http_port,
            },
        );

        let processing_worker = ProcessingWorker::new(
            backends.log,
            backends.store,
            ProcessingWorkerConfig {
                consumer: stream_consumer_config(config),
                http: HttpServerConfig {
                    host: config.processing_http_host.clone(),
                    port: config.processing_http_port,
                },
            },
        )
        .await
        .context("Failed to initialize processing worker")?;

        Ok(Self {
            ingestion_api,
            processing_worker,
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
        })
    }

    /// Register every module process with `runner`.
    pub fn register(self, runner: Runner) -> Runner {
        let mut runner = runner
            .with_drain_timeout(self.shutdown_timeout)
            .with_named_process("ingestion_api", self.ingestion_api.into_runner_process());

        for (name, process) in self.processing_worker.into_runner_processes() {
            runner = runner.with_named_process(name, process);
        }

        runner
    }
}

fn stream_consumer_config(config: &ServiceConfig) -> StreamConsumerConfig {
    StreamConsumerConfig {
        stream: config.stream_name.clone(),
        group: config.consumer_group.clone(),
        consumer: config.consumer_name.clone(),
        batch_size: config.claim_batch_size,
        block: Duration::from_millis(config.claim_block_ms),
        connection_retry: Duration::from_secs(config.connection_retry_secs),
        error_retry: Duration::from_millis(config.error_retry_ms),
    }
}
