use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::docker::{ContainerStatus, HealthStatus};

/// Last-observed state of one container, the comparison baseline for the
/// next tick. Not persisted; losing it across restarts is acceptable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub id: String,
    pub name: String,
    pub status: ContainerStatus,
    pub health: HealthStatus,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub last_seen: DateTime<Utc>,
}

/// In-memory container id → snapshot map. Replaced wholesale every poll
/// cycle, never patched incrementally, so containers removed between polls
/// cannot linger with stale state.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    entries: HashMap<String, ContainerSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        SnapshotStore::default()
    }

    pub fn get(&self, container_id: &str) -> Option<&ContainerSnapshot> {
        self.entries.get(container_id)
    }

    pub fn replace(&mut self, snapshots: Vec<ContainerSnapshot>) {
        self.entries = snapshots
            .into_iter()
            .map(|snapshot| (snapshot.id.clone(), snapshot))
            .collect();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn snapshots(&self) -> Vec<ContainerSnapshot> {
        let mut all: Vec<_> = self.entries.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: &str, status: ContainerStatus) -> ContainerSnapshot {
        ContainerSnapshot {
            id: id.to_string(),
            name: format!("name-{id}"),
            status,
            health: HealthStatus::None,
            cpu_percent: 0.0,
            memory_percent: 0.0,
            last_seen: Utc::now(),
        }
    }

    #[test]
    fn replace_drops_stale_entries() {
        let mut store = SnapshotStore::new();
        store.replace(vec![
            snapshot("a", ContainerStatus::Running),
            snapshot("b", ContainerStatus::Exited),
        ]);
        assert_eq!(store.len(), 2);

        store.replace(vec![snapshot("b", ContainerStatus::Running)]);
        assert_eq!(store.len(), 1);
        assert!(store.get("a").is_none());
        assert_eq!(store.get("b").unwrap().status, ContainerStatus::Running);
    }

    #[test]
    fn one_entry_per_container_id() {
        let mut store = SnapshotStore::new();
        store.replace(vec![
            snapshot("a", ContainerStatus::Running),
            snapshot("a", ContainerStatus::Exited),
        ]);
        assert_eq!(store.len(), 1);
    }
}
