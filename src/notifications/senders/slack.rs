use serde_json::{json, Value};

use crate::notifications::models::AlertMessage;

/// Slack incoming-webhook attachment.
pub fn build_payload(message: &AlertMessage) -> Value {
    let mut attachment = json!({
        "color": message.severity.color_css(),
        "title": format!("\u{1F433} {}", message.title),
        "text": message.body,
        "footer": "DockDash",
        "ts": message.timestamp.timestamp(),
    });

    if !message.fields.is_empty() {
        attachment["fields"] = message
            .fields
            .iter()
            .map(|(title, value)| json!({ "title": title, "value": value, "short": true }))
            .collect();
    }

    json!({ "attachments": [attachment] })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::models::{AlertEvent, AlertKind};

    #[test]
    fn attachment_shape() {
        let event = AlertEvent::new("c1", "db", AlertKind::Started);
        let payload = build_payload(&AlertMessage::for_event(&event, None));

        let attachment = &payload["attachments"][0];
        assert_eq!(attachment["color"], "#10B981");
        assert_eq!(attachment["footer"], "DockDash");
        assert!(attachment["ts"].is_i64());
    }
}
