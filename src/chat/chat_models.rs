use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::ActorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationKind {
    Private,
    Group,
}

impl std::fmt::Display for ConversationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversationKind::Private => write!(f, "private"),
            ConversationKind::Group => write!(f, "group"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    File,
    System,
}

impl Default for MessageKind {
    fn default() -> Self {
        MessageKind::Text
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageKind::Text => write!(f, "text"),
            MessageKind::Image => write!(f, "image"),
            MessageKind::File => write!(f, "file"),
            MessageKind::System => write!(f, "system"),
        }
    }
}

/// A conversation between a managed account and its client-user participants.
///
/// `participants` holds client-user ids only; the owning manager is resolved
/// through `managed_account_id` at fan-out time. The summary fields
/// (`last_message`, `last_message_time`, `unread_count`) are only ever
/// mutated inside the store's per-conversation critical section.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Conversation {
    pub id: Uuid,
    pub kind: ConversationKind,
    pub name: String,
    pub avatar: Option<String>,
    pub participants: Vec<Uuid>,
    pub managed_account_id: Option<Uuid>,
    pub last_message: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
    pub unread_count: i64,
    pub created_at: DateTime<Utc>,
}

/// An immutable message record. The only mutation after creation is the
/// unread -> read transition performed by `mark_read`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub sender_avatar: Option<String>,
    pub content: String,
    pub kind: MessageKind,
    pub read: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderKind {
    ManagedAccount,
    Manager,
    Client,
}

/// The effective sender of a message, resolved once per send. A manager
/// acting through a managed-account conversation sends as the account, not
/// as themselves.
#[derive(Debug, Clone)]
pub struct SenderIdentity {
    pub kind: SenderKind,
    pub id: Uuid,
    pub display_name: String,
    pub avatar: Option<String>,
}

impl SenderIdentity {
    pub fn for_actor_kind(kind: ActorKind, id: Uuid, display_name: String) -> Self {
        let kind = match kind {
            ActorKind::Manager => SenderKind::Manager,
            ActorKind::Client => SenderKind::Client,
        };
        Self {
            kind,
            id,
            display_name,
            avatar: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kind_display() {
        assert_eq!(MessageKind::Text.to_string(), "text");
        assert_eq!(MessageKind::Image.to_string(), "image");
        assert_eq!(MessageKind::File.to_string(), "file");
        assert_eq!(MessageKind::System.to_string(), "system");
    }

    #[test]
    fn test_message_kind_default_is_text() {
        assert_eq!(MessageKind::default(), MessageKind::Text);
    }

    #[test]
    fn test_conversation_kind_display() {
        assert_eq!(ConversationKind::Private.to_string(), "private");
        assert_eq!(ConversationKind::Group.to_string(), "group");
    }
}
