use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateManagedAccountRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(length(min = 1, max = 64))]
    pub nickname: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateFriendRequest {
    pub client_user_id: Uuid,
    #[validate(length(max = 64))]
    pub remark: Option<String>,
}

/// A friend-list entry: the link itself plus the client user's display fields
/// and the owning conversation's summary, joined on demand.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct FriendResponse {
    pub id: Uuid,
    pub managed_account_id: Uuid,
    pub client_user_id: Uuid,
    pub username: String,
    pub nickname: String,
    pub avatar: Option<String>,
    pub remark: Option<String>,
    pub status: String,
    pub last_message: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
    pub unread_count: i64,
}
