use crate::{
    account::{
        account_dto::{CreateFriendRequest, CreateManagedAccountRequest, FriendResponse},
        account_handlers,
        account_models::{FriendLink, ManagedAccount},
    },
    auth::{
        auth_dto::{AuthResponse, LoginRequest, RegisterRequest},
        auth_handlers, client_auth_handlers,
    },
    chat::{
        chat_dto::{CreateConversationRequest, SendMessageRequest},
        chat_handlers,
        chat_models::{Conversation, ConversationKind, Message, MessageKind},
    },
    middleware::auth_middleware,
    state::AppState,
    user::UserResponse,
    websocket,
};
use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Method,
};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::auth::auth_handlers::register,
        crate::auth::auth_handlers::login,
        crate::auth::auth_handlers::me,
        crate::auth::client_auth_handlers::register,
        crate::auth::client_auth_handlers::login,
        crate::auth::client_auth_handlers::me,
        crate::account::account_handlers::get_managed_accounts,
        crate::account::account_handlers::create_managed_account,
        crate::account::account_handlers::get_friends,
        crate::account::account_handlers::create_friend,
        crate::account::account_handlers::get_client_users,
        crate::chat::chat_handlers::get_conversations,
        crate::chat::chat_handlers::create_conversation,
        crate::chat::chat_handlers::get_messages,
        crate::chat::chat_handlers::mark_conversation_read,
        crate::chat::chat_handlers::send_message,
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            UserResponse,
            CreateManagedAccountRequest,
            CreateFriendRequest,
            ManagedAccount,
            FriendLink,
            FriendResponse,
            CreateConversationRequest,
            SendMessageRequest,
            Conversation,
            ConversationKind,
            Message,
            MessageKind,
        )
    ),
    tags(
        (name = "auth", description = "Manager authentication"),
        (name = "client-auth", description = "Client-user authentication"),
        (name = "accounts", description = "Managed accounts and friends"),
        (name = "chat", description = "Conversations and messages")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            )
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list([
            "http://localhost:3000".parse().unwrap(),
            "http://localhost:3002".parse().unwrap(),
        ]))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    // Public routes (no auth required)
    let auth_routes = Router::new()
        .route("/register", post(auth_handlers::register))
        .route("/login", post(auth_handlers::login))
        .merge(
            Router::new()
                .route("/me", get(auth_handlers::me))
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let client_auth_routes = Router::new()
        .route("/register", post(client_auth_handlers::register))
        .route("/login", post(client_auth_handlers::login))
        .merge(
            Router::new()
                .route("/me", get(client_auth_handlers::me))
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    // Protected routes (auth required)
    let account_routes = Router::new()
        .route(
            "/managed",
            get(account_handlers::get_managed_accounts)
                .post(account_handlers::create_managed_account),
        )
        .route(
            "/managed/:account_id/friends",
            get(account_handlers::get_friends).post(account_handlers::create_friend),
        )
        .route("/client-users", get(account_handlers::get_client_users))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let chat_routes = Router::new()
        .route(
            "/conversations",
            get(chat_handlers::get_conversations).post(chat_handlers::create_conversation),
        )
        .route("/conversations/:id/messages", get(chat_handlers::get_messages))
        .route(
            "/conversations/:id/read",
            post(chat_handlers::mark_conversation_read),
        )
        .route("/messages", post(chat_handlers::send_message))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // WebSocket route
    let ws_routes = Router::new()
        .route("/ws", get(websocket::ws_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/client-auth", client_auth_routes)
        .nest("/accounts", account_routes)
        .nest("/chat", chat_routes)
        .merge(ws_routes);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
