use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::chat_models::MessageKind;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SendMessageRequest {
    pub conversation_id: Uuid,
    #[validate(length(min = 1, max = 4096))]
    pub content: String,
    #[serde(default)]
    pub kind: MessageKind,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateConversationRequest {
    pub friend_id: Uuid,
    pub managed_account_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    pub managed_account_id: Option<Uuid>,
}
