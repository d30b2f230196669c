use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::ActorKind,
    error::{AppError, Result},
    middleware::{Actor, AuthActor},
    state::AppState,
};

use super::account_dto::{CreateFriendRequest, CreateManagedAccountRequest, FriendResponse};
use super::account_models::ManagedAccount;

fn require_manager(actor: &Actor) -> Result<()> {
    if actor.kind != ActorKind::Manager {
        return Err(AppError::Forbidden(
            "Manager credentials required".to_string(),
        ));
    }
    Ok(())
}

/// List the current manager's managed accounts
#[utoipa::path(
    get,
    path = "/api/accounts/managed",
    tag = "accounts",
    responses(
        (status = 200, description = "Managed accounts", body = Vec<ManagedAccount>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_managed_accounts(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
) -> Result<impl IntoResponse> {
    require_manager(&actor)?;

    let accounts = state.account_service.list_managed_accounts(actor.id).await?;
    Ok((StatusCode::OK, Json(accounts)))
}

/// Create a managed account owned by the current manager
#[utoipa::path(
    post,
    path = "/api/accounts/managed",
    tag = "accounts",
    request_body = CreateManagedAccountRequest,
    responses(
        (status = 201, description = "Managed account created", body = ManagedAccount),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_managed_account(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    Json(payload): Json<CreateManagedAccountRequest>,
) -> Result<impl IntoResponse> {
    require_manager(&actor)?;
    payload.validate()?;

    let account = state
        .account_service
        .create_managed_account(
            actor.id,
            &payload.username,
            &payload.nickname,
            payload.avatar.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// List friends of a managed account
#[utoipa::path(
    get,
    path = "/api/accounts/managed/{account_id}/friends",
    tag = "accounts",
    params(("account_id" = Uuid, Path, description = "Managed account ID")),
    responses(
        (status = 200, description = "Friends of the account", body = Vec<FriendResponse>),
        (status = 403, description = "Account belongs to another manager"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_friends(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    Path(account_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    require_manager(&actor)?;

    let friends = state
        .account_service
        .list_friends(actor.id, account_id)
        .await?;
    Ok((StatusCode::OK, Json(friends)))
}

/// Add a client user as a friend of a managed account
#[utoipa::path(
    post,
    path = "/api/accounts/managed/{account_id}/friends",
    tag = "accounts",
    params(("account_id" = Uuid, Path, description = "Managed account ID")),
    request_body = CreateFriendRequest,
    responses(
        (status = 201, description = "Friend created", body = FriendResponse),
        (status = 403, description = "Account belongs to another manager"),
        (status = 404, description = "Account or client user not found"),
        (status = 409, description = "Already a friend")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_friend(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<CreateFriendRequest>,
) -> Result<impl IntoResponse> {
    require_manager(&actor)?;
    payload.validate()?;

    let friend = state
        .account_service
        .create_friend(
            actor.id,
            account_id,
            payload.client_user_id,
            payload.remark.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(friend)))
}

/// List all client users (friend picker)
#[utoipa::path(
    get,
    path = "/api/accounts/client-users",
    tag = "accounts",
    responses(
        (status = 200, description = "Client users", body = Vec<crate::user::UserResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_client_users(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
) -> Result<impl IntoResponse> {
    require_manager(&actor)?;

    let users = state.account_service.list_client_users().await?;
    Ok((StatusCode::OK, Json(users)))
}
