use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stats::format_bytes;

/// Coarse container state as reported by the engine's list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    Unknown,
}

impl ContainerStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "created" => ContainerStatus::Created,
            "running" => ContainerStatus::Running,
            "paused" => ContainerStatus::Paused,
            "restarting" => ContainerStatus::Restarting,
            "removing" => ContainerStatus::Removing,
            "exited" => ContainerStatus::Exited,
            "dead" => ContainerStatus::Dead,
            _ => ContainerStatus::Unknown,
        }
    }

    pub fn is_running(self) -> bool {
        self == ContainerStatus::Running
    }
}

/// Health-check outcome. `None` means the container defines no health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Starting,
    None,
}

impl HealthStatus {
    /// The list endpoint does not expose structured health, but the engine
    /// appends it to the human status line ("Up 2 hours (healthy)").
    pub fn from_status_text(status_text: &str) -> Self {
        if status_text.contains("(healthy)") {
            HealthStatus::Healthy
        } else if status_text.contains("(unhealthy)") {
            HealthStatus::Unhealthy
        } else if status_text.contains("(health: starting)") {
            HealthStatus::Starting
        } else {
            HealthStatus::None
        }
    }
}

/// One container row from the list endpoint, enough for the dashboard grid
/// and the monitoring loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerBrief {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: ContainerStatus,
    pub health: HealthStatus,
    /// Human status line as the engine renders it ("Up 2 hours (healthy)").
    pub status_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortMapping {
    pub container_port: String,
    pub host_port: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountInfo {
    pub mount_type: Option<String>,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub mode: Option<String>,
    pub rw: Option<bool>,
}

/// Detailed view from the inspect endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: ContainerStatus,
    pub health: HealthStatus,
    pub created: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub uptime_seconds: Option<i64>,
    pub restart_count: i64,
    pub exit_code: Option<i64>,
    pub compose_project: Option<String>,
    pub compose_service: Option<String>,
    pub ports: Vec<PortMapping>,
    /// Environment with secret-looking values masked.
    pub env: HashMap<String, String>,
    pub mounts: Vec<MountInfo>,
    pub networks: Vec<String>,
    pub labels: HashMap<String, String>,
}

/// One-shot resource sample for a running container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSample {
    pub cpu_percent: f64,
    pub memory_usage: u64,
    pub memory_limit: u64,
    pub memory_percent: f64,
    pub memory_usage_human: String,
    pub memory_limit_human: String,
    pub network_rx: u64,
    pub network_tx: u64,
    pub block_read: u64,
    pub block_write: u64,
}

impl StatsSample {
    pub fn new(
        cpu_percent: f64,
        memory_usage: u64,
        memory_limit: u64,
        memory_percent: f64,
        network_rx: u64,
        network_tx: u64,
        block_read: u64,
        block_write: u64,
    ) -> Self {
        StatsSample {
            cpu_percent: (cpu_percent * 100.0).round() / 100.0,
            memory_usage,
            memory_limit,
            memory_percent: (memory_percent * 100.0).round() / 100.0,
            memory_usage_human: format_bytes(memory_usage),
            memory_limit_human: format_bytes(memory_limit),
            network_rx,
            network_tx,
            block_read,
            block_write,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInfo {
    pub id: String,
    pub tags: Vec<String>,
    pub size: i64,
    pub size_human: String,
    pub created: Option<DateTime<Utc>>,
    pub repo_digests: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecOutcome {
    pub exit_code: Option<i64>,
    pub stdout: String,
    pub stderr: String,
}

/// Result of replacing a container with a fresh one built from the same
/// configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecreateOutcome {
    pub id: String,
    pub name: String,
    pub image: String,
    pub pulled_new_image: bool,
    /// Whether the replacement was started (it is when the old one was running).
    pub started: bool,
}

/// Result of a container or image prune.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruneReport {
    pub deleted: Vec<String>,
    pub space_reclaimed: u64,
    pub space_reclaimed_human: String,
}

impl PruneReport {
    pub fn new(deleted: Vec<String>, space_reclaimed: u64) -> Self {
        PruneReport {
            deleted,
            space_reclaimed,
            space_reclaimed_human: format_bytes(space_reclaimed),
        }
    }
}

/// Masks values for environment keys that look like credentials.
pub fn redact_env(env: &[String]) -> HashMap<String, String> {
    const SENSITIVE: [&str; 6] = ["password", "secret", "key", "token", "api_key", "apikey"];
    let mut out = HashMap::new();
    for entry in env {
        if let Some((key, value)) = entry.split_once('=') {
            let lowered = key.to_ascii_lowercase();
            let masked = SENSITIVE.iter().any(|s| lowered.contains(s));
            out.insert(
                key.to_string(),
                if masked {
                    "********".to_string()
                } else {
                    value.to_string()
                },
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_covers_engine_states() {
        assert_eq!(ContainerStatus::parse("running"), ContainerStatus::Running);
        assert_eq!(ContainerStatus::parse("exited"), ContainerStatus::Exited);
        assert_eq!(ContainerStatus::parse("weird"), ContainerStatus::Unknown);
        assert!(ContainerStatus::Running.is_running());
        assert!(!ContainerStatus::Paused.is_running());
    }

    #[test]
    fn health_from_status_text() {
        assert_eq!(
            HealthStatus::from_status_text("Up 2 hours (healthy)"),
            HealthStatus::Healthy
        );
        assert_eq!(
            HealthStatus::from_status_text("Up 5 minutes (unhealthy)"),
            HealthStatus::Unhealthy
        );
        assert_eq!(
            HealthStatus::from_status_text("Up 3 seconds (health: starting)"),
            HealthStatus::Starting
        );
        assert_eq!(
            HealthStatus::from_status_text("Exited (0) 2 days ago"),
            HealthStatus::None
        );
    }

    #[test]
    fn redact_env_masks_sensitive_keys() {
        let env = vec![
            "POSTGRES_PASSWORD=hunter2".to_string(),
            "API_TOKEN=abc".to_string(),
            "TZ=UTC".to_string(),
        ];
        let redacted = redact_env(&env);
        assert_eq!(redacted["POSTGRES_PASSWORD"], "********");
        assert_eq!(redacted["API_TOKEN"], "********");
        assert_eq!(redacted["TZ"], "UTC");
    }
}
