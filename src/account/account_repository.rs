use crate::error::Result;
use sqlx::PgPool;
use uuid::Uuid;

use super::account_dto::FriendResponse;
use super::account_models::{FriendLink, ManagedAccount};

#[derive(Clone)]
pub struct ManagedAccountRepository {
    pool: PgPool,
}

impl ManagedAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        owner_id: Uuid,
        username: &str,
        nickname: &str,
        avatar: Option<&str>,
    ) -> Result<ManagedAccount> {
        let account = sqlx::query_as::<_, ManagedAccount>(
            "INSERT INTO managed_accounts (owner_id, username, nickname, avatar)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(owner_id)
        .bind(username)
        .bind(nickname)
        .bind(avatar)
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    pub async fn find_by_id(&self, account_id: Uuid) -> Result<Option<ManagedAccount>> {
        let account =
            sqlx::query_as::<_, ManagedAccount>("SELECT * FROM managed_accounts WHERE id = $1")
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(account)
    }

    pub async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<ManagedAccount>> {
        let accounts = sqlx::query_as::<_, ManagedAccount>(
            "SELECT * FROM managed_accounts WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }
}

#[derive(Clone)]
pub struct FriendRepository {
    pool: PgPool,
}

impl FriendRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        managed_account_id: Uuid,
        client_user_id: Uuid,
        remark: Option<&str>,
    ) -> Result<FriendLink> {
        let friend = sqlx::query_as::<_, FriendLink>(
            "INSERT INTO friends (managed_account_id, client_user_id, remark)
             VALUES ($1, $2, $3)
             RETURNING *",
        )
        .bind(managed_account_id)
        .bind(client_user_id)
        .bind(remark)
        .fetch_one(&self.pool)
        .await?;

        Ok(friend)
    }

    pub async fn find_by_id(&self, friend_id: Uuid) -> Result<Option<FriendLink>> {
        let friend = sqlx::query_as::<_, FriendLink>("SELECT * FROM friends WHERE id = $1")
            .bind(friend_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(friend)
    }

    pub async fn find_pair(
        &self,
        managed_account_id: Uuid,
        client_user_id: Uuid,
    ) -> Result<Option<FriendLink>> {
        let friend = sqlx::query_as::<_, FriendLink>(
            "SELECT * FROM friends WHERE managed_account_id = $1 AND client_user_id = $2",
        )
        .bind(managed_account_id)
        .bind(client_user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(friend)
    }

    /// Friend list with client-user display fields and the conversation
    /// summary joined in. The conversation row is the single source of truth
    /// for `last_message`/`unread_count`; nothing is cached on the link.
    pub async fn list_for_account(&self, managed_account_id: Uuid) -> Result<Vec<FriendResponse>> {
        let friends = sqlx::query_as::<_, FriendResponse>(
            "SELECT f.id, f.managed_account_id, f.client_user_id,
                    cu.username, cu.nickname, cu.avatar,
                    f.remark, f.status,
                    c.last_message, c.last_message_time,
                    COALESCE(c.unread_count, 0) AS unread_count
             FROM friends f
             JOIN client_users cu ON cu.id = f.client_user_id
             LEFT JOIN conversations c
               ON c.managed_account_id = f.managed_account_id
              AND f.client_user_id = ANY(c.participants)
             WHERE f.managed_account_id = $1
             ORDER BY c.last_message_time DESC NULLS LAST, f.created_at DESC",
        )
        .bind(managed_account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(friends)
    }
}
