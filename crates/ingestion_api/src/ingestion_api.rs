use crate::domain::IngestionService;
use crate::http::build_router;
use common::http::{run_http_server, HttpServerConfig};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct IngestionApi {
    service: Arc<IngestionService>,
    config: HttpServerConfig,
}

impl IngestionApi {
    pub fn new(service: Arc<IngestionService>, config: HttpServerConfig) -> Self {
        debug!("Initializing ingestion API module");
        Self { service, config }
    }

    pub fn into_runner_process(
        self,
    ) -> impl FnOnce(
        CancellationToken,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
    > {
        move |ctx| {
            Box::pin(async move {
                run_http_server(self.config, build_router(self.service), ctx).await
            })
        }
    }
}
