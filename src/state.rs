use std::sync::Arc;

use crate::{
    account::{AccountService, FriendRepository},
    auth::{AuthService, ClientAuthService},
    chat::ChatService,
    user::{ClientUserRepository, UserRepository},
    websocket::ConnectionManager,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub ws_connections: ConnectionManager,
    pub user_repository: UserRepository,
    pub client_user_repository: ClientUserRepository,
    pub friend_repository: FriendRepository,
    pub auth_service: AuthService,
    pub client_auth_service: ClientAuthService,
    pub account_service: AccountService,
    pub chat_service: ChatService,
}

#[derive(Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            jwt_secret: std::env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            jwt_expiration_hours: std::env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a number"),
        }
    }
}
