use serde_json::{json, Value};

use crate::notifications::models::AlertMessage;

/// Telegram Bot API message. The configured URL is expected to be the full
/// `sendMessage` endpoint including the bot token and `chat_id` parameter.
pub fn build_payload(message: &AlertMessage) -> Value {
    let mut text = format!("\u{1F433} *{}*\n\n{}", message.title, message.body);

    if !message.fields.is_empty() {
        text.push_str("\n\n");
        for (name, value) in &message.fields {
            text.push_str(&format!("\u{2022} *{name}:* {value}\n"));
        }
    }

    json!({ "text": text, "parse_mode": "Markdown" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::models::{AlertEvent, AlertKind};

    #[test]
    fn message_shape() {
        let event = AlertEvent::new("c1", "cache", AlertKind::MemoryHigh).with_value(91.0);
        let payload = build_payload(&AlertMessage::for_event(&event, Some(85)));

        assert_eq!(payload["parse_mode"], "Markdown");
        let text = payload["text"].as_str().unwrap();
        assert!(text.starts_with("\u{1F433} *High Memory Usage*"));
        assert!(text.contains("*Memory Usage:* 91.0%"));
        assert!(text.contains("*Threshold:* 85%"));
    }
}
