use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::db::services::settings_service;
use crate::docker::ContainerRuntime;
use crate::notifications::Notifier;

use super::engine::{self, TickSummary};
use super::snapshot::{ContainerSnapshot, SnapshotStore};

/// Result of a start/stop request. Starting an already-running loop is a
/// no-op that reports as much, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopTransition {
    Started,
    AlreadyRunning,
    Stopped,
    NotRunning,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitoringStatus {
    pub running: bool,
    pub poll_interval_seconds: i64,
    pub cpu_threshold: i64,
    pub memory_threshold: i64,
    pub last_tick: Option<TickSummary>,
    pub containers: Vec<ContainerSnapshot>,
}

struct LoopHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Owns the background monitoring task. Exactly one ticking task exists at a
/// time; the web layer shares this service through `AppState` and may call
/// start/stop/status concurrently with an in-flight tick.
pub struct MonitorService {
    pool: SqlitePool,
    runtime: Arc<dyn ContainerRuntime>,
    notifier: Arc<dyn Notifier>,
    snapshots: Arc<RwLock<SnapshotStore>>,
    last_tick: Arc<RwLock<Option<TickSummary>>>,
    handle: Mutex<Option<LoopHandle>>,
    fallback_interval_seconds: u64,
}

impl MonitorService {
    pub fn new(
        pool: SqlitePool,
        runtime: Arc<dyn ContainerRuntime>,
        notifier: Arc<dyn Notifier>,
        fallback_interval_seconds: u64,
    ) -> Self {
        MonitorService {
            pool,
            runtime,
            notifier,
            snapshots: Arc::new(RwLock::new(SnapshotStore::new())),
            last_tick: Arc::new(RwLock::new(None)),
            handle: Mutex::new(None),
            fallback_interval_seconds: fallback_interval_seconds.max(1),
        }
    }

    /// Spawns the ticking task unless one is already alive.
    pub async fn start(&self) -> LoopTransition {
        let mut guard = self.handle.lock().await;
        if let Some(existing) = guard.as_ref() {
            if !existing.task.is_finished() {
                return LoopTransition::AlreadyRunning;
            }
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let pool = self.pool.clone();
        let runtime = Arc::clone(&self.runtime);
        let notifier = Arc::clone(&self.notifier);
        let snapshots = Arc::clone(&self.snapshots);
        let last_tick = Arc::clone(&self.last_tick);
        let fallback = self.fallback_interval_seconds;

        let task = tokio::spawn(async move {
            info!("monitoring loop started");
            loop {
                match engine::run_tick(&pool, runtime.as_ref(), &notifier, &snapshots).await {
                    Ok(summary) => {
                        *last_tick.write().await = Some(summary);
                    }
                    Err(err) => {
                        // Transient by definition: the next tick retries.
                        warn!(error = %err, "monitoring tick skipped");
                    }
                }

                // Re-read the interval every cycle so edits apply without a
                // restart.
                let interval = match settings_service::get_settings(&pool).await {
                    Ok(settings) => settings.poll_interval_seconds.max(1) as u64,
                    Err(err) => {
                        warn!(error = %err, "failed to load poll interval, using fallback");
                        fallback
                    }
                };

                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(interval)) => {}
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("monitoring loop stopped");
        });

        *guard = Some(LoopHandle { shutdown, task });
        drop(guard);

        if let Err(err) = settings_service::set_running(&self.pool, true).await {
            error!(error = %err, "failed to persist monitoring running flag");
        }
        LoopTransition::Started
    }

    /// Signals the task to stop and waits for the in-flight tick to finish.
    pub async fn stop(&self) -> LoopTransition {
        let handle = self.handle.lock().await.take();

        let transition = match handle {
            Some(LoopHandle { shutdown, task }) if !task.is_finished() => {
                // The receiver is alive as long as the task is; a send error
                // just means the task already exited.
                let _ = shutdown.send(true);
                if let Err(err) = task.await {
                    error!(error = %err, "monitoring task join failed");
                }
                LoopTransition::Stopped
            }
            _ => LoopTransition::NotRunning,
        };

        if let Err(err) = settings_service::set_running(&self.pool, false).await {
            error!(error = %err, "failed to persist monitoring running flag");
        }
        transition
    }

    pub async fn is_running(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .map(|h| !h.task.is_finished())
            .unwrap_or(false)
    }

    pub async fn status(&self) -> Result<MonitoringStatus, sqlx::Error> {
        let settings = settings_service::get_settings(&self.pool).await?;
        Ok(MonitoringStatus {
            running: self.is_running().await,
            poll_interval_seconds: settings.poll_interval_seconds,
            cpu_threshold: settings.cpu_threshold,
            memory_threshold: settings.memory_threshold,
            last_tick: self.last_tick.read().await.clone(),
            containers: self.snapshots.read().await.snapshots(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::db::models::Webhook;
    use crate::db::test_pool;
    use crate::docker::{
        ContainerBrief, ContainerInfo, ExecOutcome, ImageInfo, PruneReport, RecreateOutcome,
        RuntimeError, StatsSample,
    };
    use crate::notifications::{AlertEvent, SenderError};

    struct IdleRuntime;

    #[async_trait]
    impl ContainerRuntime for IdleRuntime {
        async fn ping(&self) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn list_containers(&self, _all: bool) -> Result<Vec<ContainerBrief>, RuntimeError> {
            Ok(Vec::new())
        }
        async fn inspect_container(&self, id: &str) -> Result<ContainerInfo, RuntimeError> {
            Err(RuntimeError::NotFound(id.to_string()))
        }
        async fn container_stats(&self, id: &str) -> Result<StatsSample, RuntimeError> {
            Err(RuntimeError::NotFound(id.to_string()))
        }
        async fn start_container(&self, _id: &str) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn stop_container(&self, _id: &str) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn restart_container(&self, _id: &str) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn remove_container(&self, _id: &str, _force: bool) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn recreate_container(
            &self,
            id: &str,
            _pull: bool,
        ) -> Result<RecreateOutcome, RuntimeError> {
            Err(RuntimeError::NotFound(id.to_string()))
        }
        async fn prune_containers(&self) -> Result<PruneReport, RuntimeError> {
            Ok(PruneReport::new(Vec::new(), 0))
        }
        async fn container_logs(&self, _id: &str, _tail: u32) -> Result<String, RuntimeError> {
            Ok(String::new())
        }
        async fn exec(
            &self,
            _id: &str,
            _cmd: Vec<String>,
            _working_dir: Option<String>,
        ) -> Result<ExecOutcome, RuntimeError> {
            Ok(ExecOutcome {
                exit_code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            })
        }
        async fn list_images(&self) -> Result<Vec<ImageInfo>, RuntimeError> {
            Ok(Vec::new())
        }
        async fn pull_image(&self, _reference: &str) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn remove_image(&self, _id: &str, _force: bool) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn prune_images(&self) -> Result<PruneReport, RuntimeError> {
            Ok(PruneReport::new(Vec::new(), 0))
        }
    }

    struct NoopNotifier;

    #[async_trait]
    impl Notifier for NoopNotifier {
        async fn send_alert(
            &self,
            _webhook: &Webhook,
            _event: &AlertEvent,
        ) -> Result<(), SenderError> {
            Ok(())
        }
    }

    async fn service() -> MonitorService {
        MonitorService::new(
            test_pool().await,
            Arc::new(IdleRuntime),
            Arc::new(NoopNotifier),
            60,
        )
    }

    #[tokio::test]
    async fn second_start_is_a_noop() {
        let service = service().await;
        assert_eq!(service.start().await, LoopTransition::Started);
        assert_eq!(service.start().await, LoopTransition::AlreadyRunning);
        assert!(service.is_running().await);

        assert_eq!(service.stop().await, LoopTransition::Stopped);
        assert!(!service.is_running().await);
    }

    #[tokio::test]
    async fn stop_without_start_reports_not_running() {
        let service = service().await;
        assert_eq!(service.stop().await, LoopTransition::NotRunning);
    }

    #[tokio::test]
    async fn start_and_stop_persist_the_running_flag() {
        let service = service().await;
        service.start().await;
        assert!(settings_service::get_settings(&service.pool)
            .await
            .unwrap()
            .running);

        service.stop().await;
        assert!(!settings_service::get_settings(&service.pool)
            .await
            .unwrap()
            .running);
    }

    #[tokio::test]
    async fn status_reflects_settings_and_loop_state() {
        let service = service().await;
        let status = service.status().await.unwrap();
        assert!(!status.running);
        assert_eq!(status.poll_interval_seconds, 60);
        assert!(status.containers.is_empty());

        service.start().await;
        // The first tick runs immediately; give it a moment to land.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let status = service.status().await.unwrap();
        assert!(status.running);
        assert!(status.last_tick.is_some());
        service.stop().await;
    }
}
