use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to a container. Transition kinds fire once on the state
/// change; threshold kinds re-fire every tick the condition holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Stopped,
    Started,
    Unhealthy,
    CpuHigh,
    MemoryHigh,
}

impl AlertKind {
    pub fn title(self) -> &'static str {
        match self {
            AlertKind::Stopped => "Container Stopped",
            AlertKind::Started => "Container Started",
            AlertKind::Unhealthy => "Container Unhealthy",
            AlertKind::CpuHigh => "High CPU Usage",
            AlertKind::MemoryHigh => "High Memory Usage",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            AlertKind::Stopped => Severity::Danger,
            AlertKind::Started => Severity::Success,
            AlertKind::Unhealthy | AlertKind::CpuHigh | AlertKind::MemoryHigh => Severity::Warning,
        }
    }

    pub fn is_threshold(self) -> bool {
        matches!(self, AlertKind::CpuHigh | AlertKind::MemoryHigh)
    }
}

/// Maps onto the accent color of the rendered notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Danger,
}

impl Severity {
    pub fn color_hex(self) -> u32 {
        match self {
            Severity::Info => 0x3B82F6,
            Severity::Success => 0x10B981,
            Severity::Warning => 0xF59E0B,
            Severity::Danger => 0xEF4444,
        }
    }

    pub fn color_css(self) -> &'static str {
        match self {
            Severity::Info => "#3B82F6",
            Severity::Success => "#10B981",
            Severity::Warning => "#F59E0B",
            Severity::Danger => "#EF4444",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Danger => "danger",
        }
    }
}

/// One observed condition for one container. Constructed by the monitoring
/// loop, dispatched, discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub container_id: String,
    pub container_name: String,
    pub kind: AlertKind,
    /// Measured percentage for threshold kinds, absent for transitions.
    pub observed_value: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    pub fn new(container_id: &str, container_name: &str, kind: AlertKind) -> Self {
        AlertEvent {
            container_id: container_id.to_string(),
            container_name: container_name.to_string(),
            kind,
            observed_value: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.observed_value = Some(value);
        self
    }
}

/// Target-agnostic rendering of an alert; the per-target senders turn this
/// into the wire payload.
#[derive(Debug, Clone)]
pub struct AlertMessage {
    pub title: String,
    pub body: String,
    pub severity: Severity,
    pub fields: Vec<(String, String)>,
    pub timestamp: DateTime<Utc>,
}

impl AlertMessage {
    /// `threshold` is the matched webhook's configured limit for threshold
    /// kinds; transitions pass `None`.
    pub fn for_event(event: &AlertEvent, threshold: Option<i64>) -> Self {
        let mut fields = Vec::new();
        if let Some(value) = event.observed_value {
            let label = match event.kind {
                AlertKind::CpuHigh => "CPU Usage",
                AlertKind::MemoryHigh => "Memory Usage",
                _ => "Observed Value",
            };
            fields.push((label.to_string(), format!("{value:.1}%")));
        }
        if let Some(threshold) = threshold {
            fields.push(("Threshold".to_string(), format!("{threshold}%")));
        }

        AlertMessage {
            title: event.kind.title().to_string(),
            body: format!(
                "Container **{}** {}",
                event.container_name,
                match event.kind {
                    AlertKind::Stopped => "stopped",
                    AlertKind::Started => "started",
                    AlertKind::Unhealthy => "became unhealthy",
                    AlertKind::CpuHigh => "exceeded its CPU threshold",
                    AlertKind::MemoryHigh => "exceeded its memory threshold",
                }
            ),
            severity: event.kind.severity(),
            fields,
            timestamp: event.timestamp,
        }
    }

    /// Canned payload for webhook configuration validation.
    pub fn test() -> Self {
        let now = Utc::now();
        AlertMessage {
            title: "Test Notification".to_string(),
            body: "This is a test notification from DockDash.".to_string(),
            severity: Severity::Info,
            fields: vec![
                ("Status".to_string(), "Connected".to_string()),
                (
                    "Time".to_string(),
                    now.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                ),
            ],
            timestamp: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_event_message_carries_value_and_threshold() {
        let event = AlertEvent::new("abc123", "web", AlertKind::CpuHigh).with_value(93.25);
        let message = AlertMessage::for_event(&event, Some(90));
        assert_eq!(message.title, "High CPU Usage");
        assert_eq!(message.severity, Severity::Warning);
        assert_eq!(
            message.fields,
            vec![
                ("CPU Usage".to_string(), "93.2%".to_string()),
                ("Threshold".to_string(), "90%".to_string()),
            ]
        );
    }

    #[test]
    fn transition_event_message_has_no_fields() {
        let event = AlertEvent::new("abc123", "db", AlertKind::Stopped);
        let message = AlertMessage::for_event(&event, None);
        assert_eq!(message.severity, Severity::Danger);
        assert!(message.body.contains("**db**"));
        assert!(message.fields.is_empty());
    }

    #[test]
    fn kind_classification() {
        assert!(AlertKind::CpuHigh.is_threshold());
        assert!(AlertKind::MemoryHigh.is_threshold());
        assert!(!AlertKind::Stopped.is_threshold());
    }
}
