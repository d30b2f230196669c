use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    error::{AppError, Result},
    middleware::AuthActor,
    state::AppState,
};

use super::auth_dto::{AuthResponse, LoginRequest, RegisterRequest};
use super::ActorKind;

/// Register a new client user
#[utoipa::path(
    post,
    path = "/api/client-auth/register",
    tag = "client-auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered and logged in", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let response = state
        .client_auth_service
        .register(
            &payload.username,
            &payload.password,
            &payload.nickname,
            payload.email.as_deref(),
            payload.phone.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Log in as a client user
#[utoipa::path(
    post,
    path = "/api/client-auth/login",
    tag = "client-auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid username or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let response = state
        .client_auth_service
        .login(&payload.username, &payload.password)
        .await?;

    Ok((StatusCode::OK, Json(response)))
}

/// Get the current client user's profile
#[utoipa::path(
    get,
    path = "/api/client-auth/me",
    tag = "client-auth",
    responses(
        (status = 200, description = "Current user profile", body = crate::user::UserResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
) -> Result<impl IntoResponse> {
    if actor.kind != ActorKind::Client {
        return Err(AppError::Forbidden("Client credentials required".to_string()));
    }

    let profile = state.client_auth_service.profile(actor.id).await?;
    Ok((StatusCode::OK, Json(profile)))
}
