use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dockdash::config::AppConfig;
use dockdash::db::services::settings_service;
use dockdash::docker::{ContainerRuntime, DockerRuntime};
use dockdash::http_server::{run_http_server, AppState};
use dockdash::monitor::MonitorService;
use dockdash::notifications::NotificationService;
use dockdash::scanner::ScannerService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    info!(?config, "starting dockdash");

    let pool = dockdash::db::connect(&config.database_path).await?;

    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerRuntime::connect(
        config.docker_host.as_deref(),
    )?);
    // The dashboard stays useful while the engine is down; handlers report
    // the outage per request.
    if let Err(err) = runtime.ping().await {
        warn!(error = %err, "container engine not reachable at startup");
    }

    let notifications = Arc::new(NotificationService::new());
    let monitor = Arc::new(MonitorService::new(
        pool.clone(),
        Arc::clone(&runtime),
        notifications.clone(),
        config.monitor_interval_seconds,
    ));

    // Resume the loop if it was running before the last shutdown, or when
    // auto-start is configured.
    let settings = settings_service::get_settings(&pool).await?;
    if settings.running || config.auto_start_monitoring {
        let transition = monitor.start().await;
        info!(?transition, "monitoring loop resumed at startup");
    }

    let state = Arc::new(AppState {
        pool,
        runtime,
        notifications,
        monitor,
        scanner: Arc::new(ScannerService::new()),
    });

    run_http_server(state, config.listen_addr).await
}
