use crate::error::Result;
use sqlx::PgPool;
use uuid::Uuid;

use super::user_models::{ClientUser, User};

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        username: &str,
        password_hash: &str,
        nickname: &str,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, password_hash, nickname, email, phone)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(username)
        .bind(password_hash)
        .bind(nickname)
        .bind(email)
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}

#[derive(Clone)]
pub struct ClientUserRepository {
    pool: PgPool,
}

impl ClientUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        username: &str,
        password_hash: &str,
        nickname: &str,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<ClientUser> {
        let user = sqlx::query_as::<_, ClientUser>(
            "INSERT INTO client_users (username, password_hash, nickname, email, phone)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(username)
        .bind(password_hash)
        .bind(nickname)
        .bind(email)
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(&self, client_user_id: Uuid) -> Result<Option<ClientUser>> {
        let user = sqlx::query_as::<_, ClientUser>("SELECT * FROM client_users WHERE id = $1")
            .bind(client_user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<ClientUser>> {
        let user = sqlx::query_as::<_, ClientUser>("SELECT * FROM client_users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Full client-user directory, used by managers when picking a friend to add.
    pub async fn list_all(&self) -> Result<Vec<ClientUser>> {
        let users =
            sqlx::query_as::<_, ClientUser>("SELECT * FROM client_users ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;

        Ok(users)
    }
}
