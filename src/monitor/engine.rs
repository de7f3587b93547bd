//! One monitoring tick: poll the runtime, diff against the snapshot store,
//! match alert rules per webhook, dispatch, then replace the store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::db::models::Webhook;
use crate::db::services::webhook_service;
use crate::docker::{ContainerBrief, ContainerRuntime, HealthStatus, RuntimeError, StatsSample};
use crate::notifications::{AlertEvent, AlertKind, Notifier};

use super::snapshot::{ContainerSnapshot, SnapshotStore};

/// How many webhook deliveries may be in flight at once within a tick. All
/// of them are joined before the snapshot store is replaced, so one slow
/// endpoint delays the tick by at most the dispatch timeout.
const DISPATCH_CONCURRENCY: usize = 4;

#[derive(Debug, Error)]
pub enum TickError {
    /// Engine unreachable: the tick is skipped and retried on the next one.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Outcome of one completed tick, kept for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct TickSummary {
    pub completed_at: DateTime<Utc>,
    pub containers_checked: usize,
    pub events_dispatched: usize,
    pub dispatch_failures: usize,
}

/// A container as seen this tick. Stats are absent for non-running
/// containers and when the stats call failed; threshold rules are skipped
/// without them.
pub(crate) struct Observed {
    pub brief: ContainerBrief,
    pub stats: Option<StatsSample>,
}

impl Observed {
    fn to_snapshot(&self, now: DateTime<Utc>) -> ContainerSnapshot {
        ContainerSnapshot {
            id: self.brief.id.clone(),
            name: self.brief.name.clone(),
            status: self.brief.state,
            health: self.brief.health,
            cpu_percent: self.stats.as_ref().map(|s| s.cpu_percent).unwrap_or(0.0),
            memory_percent: self
                .stats
                .as_ref()
                .map(|s| s.memory_percent)
                .unwrap_or(0.0),
            last_seen: now,
        }
    }
}

/// Pairs every triggered event with the webhooks that should receive it.
///
/// Transitions (stopped/started/unhealthy) fire once per state change and go
/// to every webhook whose matching flag is set. Threshold conditions are
/// evaluated against each webhook's own limits and re-fire every tick they
/// hold. A container seen for the first time fires nothing.
pub(crate) fn plan_dispatches(
    previous: &SnapshotStore,
    current: &[Observed],
    webhooks: &[Webhook],
) -> Vec<(Webhook, AlertEvent)> {
    let mut plan = Vec::new();

    for observed in current {
        let brief = &observed.brief;
        let mut transitions: Vec<AlertKind> = Vec::new();

        if let Some(prior) = previous.get(&brief.id) {
            if prior.status.is_running() && !brief.state.is_running() {
                transitions.push(AlertKind::Stopped);
            } else if !prior.status.is_running() && brief.state.is_running() {
                transitions.push(AlertKind::Started);
            }
            if prior.health != HealthStatus::Unhealthy && brief.health == HealthStatus::Unhealthy {
                transitions.push(AlertKind::Unhealthy);
            }
        }

        for kind in transitions {
            let event = AlertEvent::new(&brief.id, &brief.name, kind);
            for webhook in webhooks {
                let matches = match kind {
                    AlertKind::Stopped => webhook.alert_on_stop,
                    AlertKind::Started => webhook.alert_on_start,
                    AlertKind::Unhealthy => webhook.alert_on_unhealthy,
                    _ => false,
                };
                if matches {
                    plan.push((webhook.clone(), event.clone()));
                }
            }
        }

        if let Some(stats) = observed.stats.as_ref() {
            for webhook in webhooks {
                if stats.cpu_percent >= webhook.cpu_threshold as f64 {
                    plan.push((
                        webhook.clone(),
                        AlertEvent::new(&brief.id, &brief.name, AlertKind::CpuHigh)
                            .with_value(stats.cpu_percent),
                    ));
                }
                if stats.memory_percent >= webhook.memory_threshold as f64 {
                    plan.push((
                        webhook.clone(),
                        AlertEvent::new(&brief.id, &brief.name, AlertKind::MemoryHigh)
                            .with_value(stats.memory_percent),
                    ));
                }
            }
        }
    }

    plan
}

/// Runs one poll-evaluate-dispatch-update cycle.
///
/// A runtime failure skips the whole tick (the store keeps its baseline); a
/// stats failure for one container only disables threshold checks for that
/// container; a failed dispatch never blocks the remaining ones.
pub async fn run_tick(
    pool: &SqlitePool,
    runtime: &dyn ContainerRuntime,
    notifier: &Arc<dyn Notifier>,
    store: &RwLock<SnapshotStore>,
) -> Result<TickSummary, TickError> {
    let webhooks = webhook_service::get_enabled_webhooks(pool).await?;
    let containers = runtime.list_containers(true).await?;

    let mut current = Vec::with_capacity(containers.len());
    for brief in containers {
        let stats = if brief.state.is_running() {
            match runtime.container_stats(&brief.id).await {
                Ok(stats) => Some(stats),
                Err(err) => {
                    warn!(container = %brief.name, error = %err, "stats unavailable, skipping threshold checks");
                    None
                }
            }
        } else {
            None
        };
        current.push(Observed { brief, stats });
    }

    let plan = {
        let previous = store.read().await;
        plan_dispatches(&previous, &current, &webhooks)
    };
    let planned = plan.len();

    let failures = futures::stream::iter(plan)
        .map(|(webhook, event)| {
            let notifier = Arc::clone(notifier);
            async move {
                match notifier.send_alert(&webhook, &event).await {
                    Ok(()) => {
                        debug!(webhook = %webhook.name, kind = ?event.kind, container = %event.container_name, "alert dispatched");
                        0usize
                    }
                    Err(err) => {
                        warn!(webhook = %webhook.name, kind = ?event.kind, container = %event.container_name, error = %err, "alert dispatch failed");
                        1usize
                    }
                }
            }
        })
        .buffer_unordered(DISPATCH_CONCURRENCY)
        .fold(0usize, |acc, failed| async move { acc + failed })
        .await;

    let now = Utc::now();
    let snapshots: Vec<ContainerSnapshot> =
        current.iter().map(|o| o.to_snapshot(now)).collect();
    let containers_checked = snapshots.len();
    store.write().await.replace(snapshots);

    Ok(TickSummary {
        completed_at: now,
        containers_checked,
        events_dispatched: planned - failures,
        dispatch_failures: failures,
    })
}
