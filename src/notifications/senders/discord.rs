use serde_json::{json, Value};

use crate::notifications::models::AlertMessage;

/// Discord incoming-webhook embed.
pub fn build_payload(message: &AlertMessage) -> Value {
    let mut embed = json!({
        "title": format!("\u{1F433} {}", message.title),
        "description": message.body,
        "color": message.severity.color_hex(),
        "timestamp": message.timestamp.to_rfc3339(),
        "footer": { "text": "DockDash" },
    });

    if !message.fields.is_empty() {
        embed["fields"] = message
            .fields
            .iter()
            .map(|(name, value)| json!({ "name": name, "value": value, "inline": true }))
            .collect();
    }

    json!({ "embeds": [embed] })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::models::{AlertEvent, AlertKind};

    #[test]
    fn embed_shape() {
        let event = AlertEvent::new("c1", "web", AlertKind::Stopped);
        let payload = build_payload(&AlertMessage::for_event(&event, None));

        let embed = &payload["embeds"][0];
        assert_eq!(embed["title"], "\u{1F433} Container Stopped");
        assert_eq!(embed["color"], 0xEF4444);
        assert_eq!(embed["footer"]["text"], "DockDash");
        assert!(embed.get("fields").is_none());
    }

    #[test]
    fn fields_are_inlined() {
        let event = AlertEvent::new("c1", "web", AlertKind::CpuHigh).with_value(95.0);
        let payload = build_payload(&AlertMessage::for_event(&event, Some(90)));
        let fields = payload["embeds"][0]["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0]["name"], "CPU Usage");
        assert_eq!(fields[0]["inline"], true);
    }
}
