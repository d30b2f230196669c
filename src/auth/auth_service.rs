use crate::auth::{create_jwt, hash_password, verify_password, ActorKind};
use crate::error::{AppError, Result};
use crate::user::{UserRepository, UserResponse};
use uuid::Uuid;

use super::auth_dto::AuthResponse;

/// Credential issuance for manager users.
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    jwt_expiration_hours: i64,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, jwt_expiration_hours: i64) -> Self {
        Self {
            user_repo,
            jwt_secret,
            jwt_expiration_hours,
        }
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        nickname: &str,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<AuthResponse> {
        if self.user_repo.find_by_username(username).await?.is_some() {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let password_hash = hash_password(password)?;
        let user = self
            .user_repo
            .create(username, &password_hash, nickname, email, phone)
            .await?;

        let token = create_jwt(
            user.id,
            &user.username,
            ActorKind::Manager,
            &self.jwt_secret,
            self.jwt_expiration_hours,
        )?;

        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| {
                AppError::Unauthorized("Invalid username or password".to_string())
            })?;

        verify_password(password, &user.password_hash)?;

        let token = create_jwt(
            user.id,
            &user.username,
            ActorKind::Manager,
            &self.jwt_secret,
            self.jwt_expiration_hours,
        )?;

        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<UserResponse> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(user.into())
    }
}
