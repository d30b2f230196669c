use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::account::ManagedAccount;
use crate::error::{AppError, Result};
use crate::user::ClientUser;

use super::chat_models::{Conversation, Message, MessageKind, SenderIdentity};

/// Storage seam for the message-distribution core: message persistence with
/// conversation-summary maintenance, plus the conversation and identity
/// lookups recipient/sender resolution needs. The production implementation
/// is [`ChatRepository`]; tests drive the dispatcher against an in-memory
/// implementation.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn conversation(&self, conversation_id: Uuid) -> Result<Option<Conversation>>;

    /// Conversations for the manager side, filtered by managed account
    /// (`None` selects conversations not tied to any managed account).
    async fn conversations_for_account(
        &self,
        managed_account_id: Option<Uuid>,
    ) -> Result<Vec<Conversation>>;

    /// Conversations a client user participates in.
    async fn conversations_for_client(&self, client_user_id: Uuid) -> Result<Vec<Conversation>>;

    async fn find_private_conversation(
        &self,
        managed_account_id: Uuid,
        client_user_id: Uuid,
    ) -> Result<Option<Conversation>>;

    async fn create_conversation(
        &self,
        name: &str,
        avatar: Option<&str>,
        participant: Uuid,
        managed_account_id: Uuid,
    ) -> Result<Conversation>;

    /// Append a message and update the conversation summary in one
    /// per-conversation critical section: the assigned timestamp never goes
    /// backwards within the conversation and no unread increment is lost to
    /// a concurrent append or mark_read. Fails with NotFound if the
    /// conversation does not exist; nothing is persisted in that case.
    async fn append(
        &self,
        conversation_id: Uuid,
        sender: &SenderIdentity,
        content: &str,
        kind: MessageKind,
    ) -> Result<Message>;

    /// Flip every unread message in the conversation to read and reset the
    /// unread counter. Idempotent; unknown conversations are a no-op.
    async fn mark_read(&self, conversation_id: Uuid) -> Result<()>;

    /// Full message history, ascending by timestamp. A snapshot, not a
    /// subscription; callers may re-fetch at any point.
    async fn history(&self, conversation_id: Uuid) -> Result<Vec<Message>>;

    async fn managed_account(&self, account_id: Uuid) -> Result<Option<ManagedAccount>>;

    async fn client_user(&self, client_user_id: Uuid) -> Result<Option<ClientUser>>;
}

#[derive(Clone)]
pub struct ChatRepository {
    pool: PgPool,
}

impl ChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatStore for ChatRepository {
    async fn conversation(&self, conversation_id: Uuid) -> Result<Option<Conversation>> {
        let conversation =
            sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = $1")
                .bind(conversation_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(conversation)
    }

    async fn conversations_for_account(
        &self,
        managed_account_id: Option<Uuid>,
    ) -> Result<Vec<Conversation>> {
        let conversations = match managed_account_id {
            Some(account_id) => {
                sqlx::query_as::<_, Conversation>(
                    "SELECT * FROM conversations
                     WHERE managed_account_id = $1
                     ORDER BY last_message_time DESC NULLS LAST",
                )
                .bind(account_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Conversation>(
                    "SELECT * FROM conversations
                     WHERE managed_account_id IS NULL
                     ORDER BY last_message_time DESC NULLS LAST",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(conversations)
    }

    async fn conversations_for_client(&self, client_user_id: Uuid) -> Result<Vec<Conversation>> {
        let conversations = sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations
             WHERE $1 = ANY(participants)
             ORDER BY last_message_time DESC NULLS LAST",
        )
        .bind(client_user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(conversations)
    }

    async fn find_private_conversation(
        &self,
        managed_account_id: Uuid,
        client_user_id: Uuid,
    ) -> Result<Option<Conversation>> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations
             WHERE managed_account_id = $1 AND $2 = ANY(participants) AND kind = 'private'",
        )
        .bind(managed_account_id)
        .bind(client_user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(conversation)
    }

    async fn create_conversation(
        &self,
        name: &str,
        avatar: Option<&str>,
        participant: Uuid,
        managed_account_id: Uuid,
    ) -> Result<Conversation> {
        let conversation = sqlx::query_as::<_, Conversation>(
            "INSERT INTO conversations (kind, name, avatar, participants, managed_account_id)
             VALUES ('private', $1, $2, ARRAY[$3]::uuid[], $4)
             RETURNING *",
        )
        .bind(name)
        .bind(avatar)
        .bind(participant)
        .bind(managed_account_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(conversation)
    }

    async fn append(
        &self,
        conversation_id: Uuid,
        sender: &SenderIdentity,
        content: &str,
        kind: MessageKind,
    ) -> Result<Message> {
        let mut tx = self.pool.begin().await?;

        // Row lock: serializes summary mutation per conversation.
        let conversation = sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations WHERE id = $1 FOR UPDATE",
        )
        .bind(conversation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;

        // GREATEST ignores NULL, so a fresh conversation gets now(). Keeps
        // timestamps monotonically non-decreasing within the conversation.
        let message = sqlx::query_as::<_, Message>(
            "INSERT INTO messages
                 (conversation_id, sender_id, sender_name, sender_avatar, content, kind, timestamp)
             VALUES ($1, $2, $3, $4, $5, $6, GREATEST(now(), $7))
             RETURNING *",
        )
        .bind(conversation.id)
        .bind(sender.id)
        .bind(&sender.display_name)
        .bind(sender.avatar.as_deref())
        .bind(content)
        .bind(kind)
        .bind(conversation.last_message_time)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE conversations
             SET last_message = $2, last_message_time = $3, unread_count = unread_count + 1
             WHERE id = $1",
        )
        .bind(conversation.id)
        .bind(&message.content)
        .bind(message.timestamp)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(message)
    }

    async fn mark_read(&self, conversation_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE messages SET read = true WHERE conversation_id = $1 AND read = false")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE conversations SET unread_count = 0 WHERE id = $1")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn history(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE conversation_id = $1 ORDER BY timestamp ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn managed_account(&self, account_id: Uuid) -> Result<Option<ManagedAccount>> {
        let account =
            sqlx::query_as::<_, ManagedAccount>("SELECT * FROM managed_accounts WHERE id = $1")
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(account)
    }

    async fn client_user(&self, client_user_id: Uuid) -> Result<Option<ClientUser>> {
        let user = sqlx::query_as::<_, ClientUser>("SELECT * FROM client_users WHERE id = $1")
            .bind(client_user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}
