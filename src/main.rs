mod account;
mod auth;
mod chat;
mod db;
mod error;
mod middleware;
mod routes;
mod state;
mod user;
mod websocket;

use std::sync::Arc;

use anyhow::Context;
use db::{create_pool, run_migrations};
use routes::create_router;
use state::{AppState, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chathub_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env());

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL environment variable is not set")?;

    tracing::info!("Connecting to database...");
    let db = create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Running migrations...");
    run_migrations(&db).await?;

    // Live-connection registry, shared by the WebSocket layer and the
    // fan-out dispatcher.
    let ws_connections = websocket::ConnectionManager::new();

    // Repositories
    let user_repository = user::UserRepository::new(db.clone());
    let client_user_repository = user::ClientUserRepository::new(db.clone());
    let account_repository = account::ManagedAccountRepository::new(db.clone());
    let friend_repository = account::FriendRepository::new(db.clone());
    let chat_repository = chat::ChatRepository::new(db.clone());

    // Services
    let auth_service = auth::AuthService::new(
        user_repository.clone(),
        config.jwt_secret.clone(),
        config.jwt_expiration_hours,
    );
    let client_auth_service = auth::ClientAuthService::new(
        client_user_repository.clone(),
        config.jwt_secret.clone(),
        config.jwt_expiration_hours,
    );
    let account_service = account::AccountService::new(
        account_repository.clone(),
        friend_repository.clone(),
        client_user_repository.clone(),
    );
    let chat_service =
        chat::ChatService::new(Arc::new(chat_repository), ws_connections.clone());

    // Create application state
    let state = AppState {
        config: config.clone(),
        ws_connections,
        user_repository,
        client_user_repository,
        friend_repository,
        auth_service,
        client_auth_service,
        account_service,
        chat_service,
    };

    // Create router
    let app = create_router(state);

    // Start server
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("{}:{}", host, port);

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
