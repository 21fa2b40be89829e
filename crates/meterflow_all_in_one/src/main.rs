use common::telemetry::{init_telemetry, TelemetryConfig};
use meterflow_all_in_one::{Application, Backends, ServiceConfig};
use meterflow_runner::Runner;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&TelemetryConfig {
        service_name: "meterflow".to_string(),
        log_level: config.log_level.clone(),
        json: config.log_json,
    }) {
        eprintln!("Failed to initialize telemetry: {}", e);
        std::process::exit(1);
    }

    info!(
        backend = ?config.backend,
        stream = %config.stream_name,
        consumer_group = %config.consumer_group,
        consumer_name = %config.consumer_name,
        "Starting meterflow service"
    );
    debug!("Configuration: {:?}", config);

    let backends = match Backends::connect(&config).await {
        Ok(backends) => backends,
        Err(e) => {
            error!("Failed to initialize backends: {:#}", e);
            std::process::exit(1);
        }
    };

    let shutdown_log = Arc::clone(&backends.log);

    let application = match Application::new(&config, backends).await {
        Ok(application) => application,
        Err(e) => {
            error!("Failed to initialize application: {:#}", e);
            std::process::exit(1);
        }
    };

    let runner = application
        .register(Runner::new())
        .with_closer({
            let stream = config.stream_name.clone();
            move || async move {
                match shutdown_log.group_stats(&stream).await {
                    Ok(groups) => {
                        for group in groups {
                            info!(
                                group = %group.name,
                                pending = group.pending,
                                "pending messages at shutdown"
                            );
                        }
                    }
                    Err(e) => warn!(error = %e, "could not read group state at shutdown"),
                }
                Ok(())
            }
        })
        .with_closer_timeout(Duration::from_secs(10));

    runner.run().await;
}
