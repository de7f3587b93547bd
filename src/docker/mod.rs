//! Runtime client adapter: a uniform async interface over the Docker-compatible
//! Engine API (Docker or Podman), backed by bollard.

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, LogsOptions, PruneContainersOptions,
    RemoveContainerOptions, RestartContainerOptions, StartContainerOptions, StatsOptions,
    StopContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::image::{CreateImageOptions, ListImagesOptions, PruneImagesOptions, RemoveImageOptions};
use bollard::models::{ContainerInspectResponse, ContainerStateStatusEnum, HealthStatusEnum};
use bollard::{Docker, API_DEFAULT_VERSION};
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use once_cell::sync::Lazy;
use tracing::warn;

pub mod error;
pub mod models;
pub mod stats;

pub use error::RuntimeError;
pub use models::{
    ContainerBrief, ContainerInfo, ContainerStatus, ExecOutcome, HealthStatus, ImageInfo,
    MountInfo, PortMapping, PruneReport, RecreateOutcome, StatsSample,
};

/// Host address used when building clickable URLs for published ports.
static HOST_IP: Lazy<String> = Lazy::new(|| {
    if let Ok(configured) = std::env::var("HOST_IP") {
        return configured;
    }
    // Routing-table trick: no packet is sent, the kernel just picks the
    // outbound interface.
    std::net::UdpSocket::bind("0.0.0.0:0")
        .and_then(|s| {
            s.connect("8.8.8.8:80")?;
            s.local_addr()
        })
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| "localhost".to_string())
});

/// Container/image operations the rest of the application depends on.
/// The monitoring loop and the HTTP layer only ever see this trait, so tests
/// substitute a scripted fake.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn ping(&self) -> Result<(), RuntimeError>;
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerBrief>, RuntimeError>;
    async fn inspect_container(&self, id: &str) -> Result<ContainerInfo, RuntimeError>;
    async fn container_stats(&self, id: &str) -> Result<StatsSample, RuntimeError>;
    async fn start_container(&self, id: &str) -> Result<(), RuntimeError>;
    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError>;
    async fn restart_container(&self, id: &str) -> Result<(), RuntimeError>;
    async fn remove_container(&self, id: &str, force: bool) -> Result<(), RuntimeError>;
    /// Replaces the container with a fresh one built from its own
    /// configuration, optionally pulling the image first.
    async fn recreate_container(
        &self,
        id: &str,
        pull: bool,
    ) -> Result<RecreateOutcome, RuntimeError>;
    async fn prune_containers(&self) -> Result<PruneReport, RuntimeError>;
    async fn container_logs(&self, id: &str, tail: u32) -> Result<String, RuntimeError>;
    async fn exec(
        &self,
        id: &str,
        cmd: Vec<String>,
        working_dir: Option<String>,
    ) -> Result<ExecOutcome, RuntimeError>;
    async fn list_images(&self) -> Result<Vec<ImageInfo>, RuntimeError>;
    async fn pull_image(&self, reference: &str) -> Result<(), RuntimeError>;
    async fn remove_image(&self, id: &str, force: bool) -> Result<(), RuntimeError>;
    async fn prune_images(&self) -> Result<PruneReport, RuntimeError>;
}

/// Bollard-backed implementation speaking to a local or remote engine socket.
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// `host` accepts `unix://`, `tcp://` / `http://` addresses; `None` falls
    /// back to the platform default socket.
    pub fn connect(host: Option<&str>) -> Result<Self, RuntimeError> {
        let docker = match host {
            Some(addr) if addr.starts_with("unix://") => {
                Docker::connect_with_unix(addr, 120, API_DEFAULT_VERSION)
            }
            Some(addr) => Docker::connect_with_http(addr, 120, API_DEFAULT_VERSION),
            None => Docker::connect_with_local_defaults(),
        }?;
        Ok(DockerRuntime { docker })
    }
}

fn primary_name(names: Option<&Vec<String>>) -> String {
    names
        .and_then(|n| n.first())
        .map(|n| n.trim_start_matches('/').to_string())
        .unwrap_or_default()
}

fn parse_engine_time(raw: Option<&String>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    // The engine reports the zero time for never-started containers.
    if raw.starts_with("0001-") {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn map_state_status(status: Option<ContainerStateStatusEnum>) -> ContainerStatus {
    match status {
        Some(ContainerStateStatusEnum::CREATED) => ContainerStatus::Created,
        Some(ContainerStateStatusEnum::RUNNING) => ContainerStatus::Running,
        Some(ContainerStateStatusEnum::PAUSED) => ContainerStatus::Paused,
        Some(ContainerStateStatusEnum::RESTARTING) => ContainerStatus::Restarting,
        Some(ContainerStateStatusEnum::REMOVING) => ContainerStatus::Removing,
        Some(ContainerStateStatusEnum::EXITED) => ContainerStatus::Exited,
        Some(ContainerStateStatusEnum::DEAD) => ContainerStatus::Dead,
        _ => ContainerStatus::Unknown,
    }
}

/// Builds the creation payload for a like-for-like replacement container:
/// the old container's config plus its host config. The hostname is left for
/// the engine to assign (the old one was derived from the old container id).
fn recreate_config(detail: &ContainerInspectResponse) -> Result<Config<String>, RuntimeError> {
    let config = detail.config.clone().unwrap_or_default();
    if config.image.as_deref().map_or(true, str::is_empty) {
        return Err(RuntimeError::OperationFailed {
            status: None,
            message: "container has no usable image reference".to_string(),
        });
    }

    Ok(Config {
        image: config.image,
        cmd: config.cmd,
        entrypoint: config.entrypoint,
        env: config.env,
        user: config.user,
        working_dir: config.working_dir,
        labels: config.labels,
        exposed_ports: config.exposed_ports,
        volumes: config.volumes,
        healthcheck: config.healthcheck,
        stop_signal: config.stop_signal,
        stop_timeout: config.stop_timeout,
        host_config: detail.host_config.clone(),
        ..Default::default()
    })
}

fn map_health_status(status: Option<HealthStatusEnum>) -> HealthStatus {
    match status {
        Some(HealthStatusEnum::HEALTHY) => HealthStatus::Healthy,
        Some(HealthStatusEnum::UNHEALTHY) => HealthStatus::Unhealthy,
        Some(HealthStatusEnum::STARTING) => HealthStatus::Starting,
        _ => HealthStatus::None,
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn ping(&self) -> Result<(), RuntimeError> {
        self.docker.ping().await?;
        Ok(())
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerBrief>, RuntimeError> {
        let options = ListContainersOptions::<String> {
            all,
            ..Default::default()
        };
        let summaries = self.docker.list_containers(Some(options)).await?;

        Ok(summaries
            .into_iter()
            .map(|summary| {
                let status_text = summary.status.unwrap_or_default();
                ContainerBrief {
                    id: summary.id.unwrap_or_default(),
                    name: primary_name(summary.names.as_ref()),
                    image: summary.image.unwrap_or_default(),
                    state: ContainerStatus::parse(summary.state.as_deref().unwrap_or("")),
                    health: HealthStatus::from_status_text(&status_text),
                    status_text,
                }
            })
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerInfo, RuntimeError> {
        let detail = self.docker.inspect_container(id, None).await?;

        let state = detail.state.as_ref();
        let status = map_state_status(state.and_then(|s| s.status));
        let health = map_health_status(
            state
                .and_then(|s| s.health.as_ref())
                .and_then(|h| h.status),
        );
        let started_at = parse_engine_time(state.and_then(|s| s.started_at.as_ref()));
        let uptime_seconds = match (status.is_running(), started_at) {
            (true, Some(started)) => Some((Utc::now() - started).num_seconds()),
            _ => None,
        };

        let config = detail.config.as_ref();
        let labels = config
            .and_then(|c| c.labels.clone())
            .unwrap_or_default();
        let env = models::redact_env(
            config
                .and_then(|c| c.env.as_deref())
                .unwrap_or(&[]),
        );

        let mounts = detail
            .mounts
            .unwrap_or_default()
            .into_iter()
            .map(|m| MountInfo {
                mount_type: m.typ.map(|t| t.to_string()),
                source: m.source,
                destination: m.destination,
                mode: m.mode,
                rw: m.rw,
            })
            .collect();

        let network_settings = detail.network_settings.as_ref();
        let networks = network_settings
            .and_then(|n| n.networks.as_ref())
            .map(|n| n.keys().cloned().collect())
            .unwrap_or_default();

        let mut ports = Vec::new();
        let mut seen_host_ports = std::collections::HashSet::new();
        if let Some(port_map) = network_settings.and_then(|n| n.ports.as_ref()) {
            for (container_port, bindings) in port_map {
                for binding in bindings.iter().flatten() {
                    if let Some(host_port) = binding.host_port.as_ref() {
                        if seen_host_ports.insert(host_port.clone()) {
                            ports.push(PortMapping {
                                container_port: container_port.clone(),
                                host_port: host_port.clone(),
                                url: format!("http://{}:{}", *HOST_IP, host_port),
                            });
                        }
                    }
                }
            }
        }

        Ok(ContainerInfo {
            id: detail.id.unwrap_or_default(),
            name: detail
                .name
                .map(|n| n.trim_start_matches('/').to_string())
                .unwrap_or_default(),
            image: config
                .and_then(|c| c.image.clone())
                .unwrap_or_default(),
            state: status,
            health,
            created: parse_engine_time(detail.created.as_ref()),
            started_at,
            uptime_seconds,
            restart_count: detail.restart_count.unwrap_or(0),
            exit_code: state.and_then(|s| s.exit_code),
            compose_project: labels.get("com.docker.compose.project").cloned(),
            compose_service: labels.get("com.docker.compose.service").cloned(),
            ports,
            env,
            mounts,
            networks,
            labels,
        })
    }

    async fn container_stats(&self, id: &str) -> Result<StatsSample, RuntimeError> {
        let options = StatsOptions {
            stream: false,
            one_shot: false,
        };
        let stream = self.docker.stats(id, Some(options));
        futures::pin_mut!(stream);
        let raw = stream
            .next()
            .await
            .ok_or_else(|| RuntimeError::OperationFailed {
                status: None,
                message: "engine returned no stats sample".to_string(),
            })??;

        let cpu_delta = raw
            .cpu_stats
            .cpu_usage
            .total_usage
            .saturating_sub(raw.precpu_stats.cpu_usage.total_usage);
        let system_delta = raw
            .cpu_stats
            .system_cpu_usage
            .unwrap_or(0)
            .saturating_sub(raw.precpu_stats.system_cpu_usage.unwrap_or(0));
        let online_cpus = raw.cpu_stats.online_cpus.unwrap_or(1);
        let cpu_percent = stats::cpu_percent(cpu_delta, system_delta, online_cpus);

        let memory_usage = raw.memory_stats.usage.unwrap_or(0);
        let memory_limit = raw.memory_stats.limit.unwrap_or(0);
        let memory_percent = stats::usage_percent(memory_usage, memory_limit);

        let (network_rx, network_tx) = raw
            .networks
            .as_ref()
            .map(|nets| {
                nets.values()
                    .fold((0u64, 0u64), |(rx, tx), n| (rx + n.rx_bytes, tx + n.tx_bytes))
            })
            .unwrap_or((0, 0));

        let (block_read, block_write) = raw
            .blkio_stats
            .io_service_bytes_recursive
            .as_ref()
            .map(|entries| {
                entries.iter().fold((0u64, 0u64), |(r, w), e| {
                    match e.op.to_ascii_lowercase().as_str() {
                        "read" => (r + e.value, w),
                        "write" => (r, w + e.value),
                        _ => (r, w),
                    }
                })
            })
            .unwrap_or((0, 0));

        Ok(StatsSample::new(
            cpu_percent,
            memory_usage,
            memory_limit,
            memory_percent,
            network_rx,
            network_tx,
            block_read,
            block_write,
        ))
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker
            .stop_container(id, Some(StopContainerOptions { t: 30 }))
            .await?;
        Ok(())
    }

    async fn restart_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.docker
            .restart_container(id, Some(RestartContainerOptions { t: 30 }))
            .await?;
        Ok(())
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<(), RuntimeError> {
        let options = RemoveContainerOptions {
            force,
            ..Default::default()
        };
        self.docker.remove_container(id, Some(options)).await?;
        Ok(())
    }

    async fn recreate_container(
        &self,
        id: &str,
        pull: bool,
    ) -> Result<RecreateOutcome, RuntimeError> {
        let detail = self.docker.inspect_container(id, None).await?;
        let name = detail
            .name
            .as_deref()
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_default();
        let was_running =
            map_state_status(detail.state.as_ref().and_then(|s| s.status)).is_running();

        let create = recreate_config(&detail)?;
        let image_ref = create.image.clone().unwrap_or_default();

        let mut pulled_new_image = false;
        if pull {
            let old_image_id = detail.image.clone();
            let options = CreateImageOptions::<String> {
                from_image: image_ref.clone(),
                ..Default::default()
            };
            match self
                .docker
                .create_image(Some(options), None, None)
                .try_collect::<Vec<_>>()
                .await
            {
                Ok(_) => {
                    if let Ok(inspected) = self.docker.inspect_image(&image_ref).await {
                        pulled_new_image = inspected.id.is_some() && inspected.id != old_image_id;
                    }
                }
                Err(err) => {
                    // The local image still works; recreate from it.
                    warn!(image = %image_ref, error = %err, "pull failed, recreating from the local image");
                }
            }
        }

        if was_running {
            self.docker
                .stop_container(id, Some(StopContainerOptions { t: 30 }))
                .await?;
        }
        self.docker.remove_container(id, None).await?;

        let created = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: name.clone(),
                    platform: None,
                }),
                create,
            )
            .await?;
        if was_running {
            self.docker
                .start_container(&created.id, None::<StartContainerOptions<String>>)
                .await?;
        }

        Ok(RecreateOutcome {
            id: created.id,
            name,
            image: image_ref,
            pulled_new_image,
            started: was_running,
        })
    }

    async fn prune_containers(&self) -> Result<PruneReport, RuntimeError> {
        let response = self
            .docker
            .prune_containers(None::<PruneContainersOptions<String>>)
            .await?;
        Ok(PruneReport::new(
            response.containers_deleted.unwrap_or_default(),
            response.space_reclaimed.unwrap_or(0).max(0) as u64,
        ))
    }

    async fn container_logs(&self, id: &str, tail: u32) -> Result<String, RuntimeError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: tail.to_string(),
            ..Default::default()
        };
        let chunks: Vec<_> = self
            .docker
            .logs(id, Some(options))
            .try_collect()
            .await?;

        let mut out = String::new();
        for chunk in chunks {
            out.push_str(&String::from_utf8_lossy(&chunk.into_bytes()));
        }
        Ok(out)
    }

    async fn exec(
        &self,
        id: &str,
        cmd: Vec<String>,
        working_dir: Option<String>,
    ) -> Result<ExecOutcome, RuntimeError> {
        let create = CreateExecOptions::<String> {
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            cmd: Some(cmd),
            working_dir,
            ..Default::default()
        };
        let exec = self.docker.create_exec(id, create).await?;

        let mut stdout = String::new();
        let mut stderr = String::new();
        if let StartExecResults::Attached { mut output, .. } =
            self.docker.start_exec(&exec.id, None).await?
        {
            while let Some(chunk) = output.next().await {
                match chunk? {
                    bollard::container::LogOutput::StdErr { message } => {
                        stderr.push_str(&String::from_utf8_lossy(&message));
                    }
                    other => stdout.push_str(&String::from_utf8_lossy(&other.into_bytes())),
                }
            }
        }

        let inspect = self.docker.inspect_exec(&exec.id).await?;
        Ok(ExecOutcome {
            exit_code: inspect.exit_code,
            stdout,
            stderr,
        })
    }

    async fn list_images(&self) -> Result<Vec<ImageInfo>, RuntimeError> {
        let options = ListImagesOptions::<String> {
            all: false,
            ..Default::default()
        };
        let summaries = self.docker.list_images(Some(options)).await?;

        Ok(summaries
            .into_iter()
            .map(|img| ImageInfo {
                id: img.id,
                tags: img.repo_tags,
                size: img.size,
                size_human: stats::format_bytes(img.size.max(0) as u64),
                created: DateTime::from_timestamp(img.created, 0),
                repo_digests: img.repo_digests,
            })
            .collect())
    }

    async fn pull_image(&self, reference: &str) -> Result<(), RuntimeError> {
        let options = CreateImageOptions::<String> {
            from_image: reference.to_string(),
            ..Default::default()
        };
        // Drain the progress stream; the pull completes when it ends.
        self.docker
            .create_image(Some(options), None, None)
            .try_collect::<Vec<_>>()
            .await?;
        Ok(())
    }

    async fn remove_image(&self, id: &str, force: bool) -> Result<(), RuntimeError> {
        let options = RemoveImageOptions {
            force,
            ..Default::default()
        };
        self.docker.remove_image(id, Some(options), None).await?;
        Ok(())
    }

    async fn prune_images(&self) -> Result<PruneReport, RuntimeError> {
        let mut filters = HashMap::new();
        filters.insert("dangling".to_string(), vec!["true".to_string()]);
        let response = self
            .docker
            .prune_images(Some(PruneImagesOptions { filters }))
            .await?;

        let deleted = response
            .images_deleted
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| item.deleted.or(item.untagged))
            .collect();
        Ok(PruneReport::new(
            deleted,
            response.space_reclaimed.unwrap_or(0).max(0) as u64,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{ContainerConfig, HostConfig, RestartPolicy, RestartPolicyNameEnum};

    #[test]
    fn recreate_config_carries_config_and_host_config() {
        let detail = ContainerInspectResponse {
            config: Some(ContainerConfig {
                image: Some("nginx:1.27".to_string()),
                env: Some(vec!["TZ=UTC".to_string()]),
                cmd: Some(vec!["nginx".to_string(), "-g".to_string()]),
                hostname: Some("0123456789ab".to_string()),
                ..Default::default()
            }),
            host_config: Some(HostConfig {
                binds: Some(vec!["/data:/data".to_string()]),
                restart_policy: Some(RestartPolicy {
                    name: Some(RestartPolicyNameEnum::UNLESS_STOPPED),
                    maximum_retry_count: None,
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        let create = recreate_config(&detail).unwrap();
        assert_eq!(create.image.as_deref(), Some("nginx:1.27"));
        assert_eq!(create.env, Some(vec!["TZ=UTC".to_string()]));
        assert_eq!(
            create.cmd,
            Some(vec!["nginx".to_string(), "-g".to_string()])
        );
        // The engine must assign a fresh hostname for the replacement.
        assert_eq!(create.hostname, None);

        let host_config = create.host_config.unwrap();
        assert_eq!(host_config.binds, Some(vec!["/data:/data".to_string()]));
        assert_eq!(
            host_config.restart_policy.unwrap().name,
            Some(RestartPolicyNameEnum::UNLESS_STOPPED)
        );
    }

    #[test]
    fn recreate_config_rejects_a_container_without_an_image() {
        let detail = ContainerInspectResponse {
            config: Some(ContainerConfig::default()),
            ..Default::default()
        };
        assert!(matches!(
            recreate_config(&detail),
            Err(RuntimeError::OperationFailed { .. })
        ));
    }
}
