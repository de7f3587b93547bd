use serde_json::{json, Value};

use crate::notifications::models::AlertMessage;

/// Plain JSON body for custom endpoints.
pub fn build_payload(message: &AlertMessage) -> Value {
    let fields: serde_json::Map<String, Value> = message
        .fields
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();

    json!({
        "title": message.title,
        "message": message.body,
        "severity": message.severity.as_str(),
        "timestamp": message.timestamp.to_rfc3339(),
        "source": "DockDash",
        "fields": fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::models::{AlertEvent, AlertKind};

    #[test]
    fn body_shape() {
        let event = AlertEvent::new("c1", "proxy", AlertKind::Unhealthy);
        let payload = build_payload(&AlertMessage::for_event(&event, None));

        assert_eq!(payload["source"], "DockDash");
        assert_eq!(payload["severity"], "warning");
        assert_eq!(payload["title"], "Container Unhealthy");
        assert!(payload["fields"].as_object().unwrap().is_empty());
    }
}
