use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::chat::chat_models::{Message, MessageKind};

/// Server-to-client frames. The `message` frame carries the full persisted
/// message record; timestamps serialize as RFC 3339.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    Message(Message),
    Error(ErrorPayload),
    Ping,
    Pong,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorPayload {
    pub message: String,
}

/// Client-to-server frames.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Message {
        conversation_id: Uuid,
        content: String,
        #[serde(default)]
        kind: MessageKind,
    },
    MarkRead {
        conversation_id: Uuid,
    },
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_client_message_kind_defaults_to_text() {
        let json = r#"{"type":"message","conversation_id":"6a56a7f4-9aae-4a08-9f58-1e1b2bd0e2f3","content":"hi"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Message { content, kind, .. } => {
                assert_eq!(content, "hi");
                assert_eq!(kind, MessageKind::Text);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_outbound_message_frame_shape() {
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            sender_name: "Support".to_string(),
            sender_avatar: None,
            content: "hello".to_string(),
            kind: MessageKind::Text,
            read: false,
            timestamp: Utc::now(),
        };

        let value = serde_json::to_value(WsMessage::Message(message)).unwrap();
        assert_eq!(value["type"], "message");
        assert_eq!(value["content"], "hello");
        assert_eq!(value["kind"], "text");
        // RFC 3339 timestamp on the wire.
        assert!(value["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_ping_pong_frames() {
        assert_eq!(
            serde_json::to_string(&WsMessage::Pong).unwrap(),
            r#"{"type":"pong"}"#
        );
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }
}
