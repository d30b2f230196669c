use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// An operator-controlled chat identity, owned by exactly one manager.
/// Messages sent "through" a managed account carry its identity, not the
/// manager's.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ManagedAccount {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub username: String,
    pub nickname: String,
    pub avatar: Option<String>,
    pub status: String,
    pub last_active_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// The authorization record pairing a managed account with a client user.
/// At most one link per pair; a conversation is always created from one.
///
/// Summary fields (last message, unread count) are deliberately absent: the
/// conversation row is the single source of truth and friend listings join it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct FriendLink {
    pub id: Uuid,
    pub managed_account_id: Uuid,
    pub client_user_id: Uuid,
    pub remark: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
