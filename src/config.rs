use std::env;
use std::net::SocketAddr;

/// Process-wide configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub database_path: String,
    /// Engine socket, e.g. `unix:///var/run/docker.sock` or a TCP address.
    /// `None` lets the client pick up the platform default.
    pub docker_host: Option<String>,
    pub monitor_interval_seconds: u64,
    pub auto_start_monitoring: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let listen_addr = env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:5000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| format!("LISTEN_ADDR is not a valid socket address: {e}"))?;

        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| "data/dockdash.db".to_string());

        let docker_host = env::var("DOCKER_HOST").ok();

        let monitor_interval_seconds = match env::var("MONITOR_INTERVAL") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|e| format!("MONITOR_INTERVAL must be a positive integer: {e}"))?,
            Err(_) => 60,
        };
        if monitor_interval_seconds == 0 {
            return Err("MONITOR_INTERVAL must be at least 1 second".to_string());
        }

        let auto_start_monitoring = env::var("AUTO_START_MONITORING")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(AppConfig {
            listen_addr,
            database_path,
            docker_host,
            monitor_interval_seconds,
            auto_start_monitoring,
        })
    }
}
