pub mod auth_dto;
pub mod auth_handlers;
pub mod auth_service;
pub mod client_auth_handlers;
pub mod client_auth_service;
pub mod jwt;
pub mod password;

pub use auth_service::AuthService;
pub use client_auth_service::ClientAuthService;
pub use jwt::{create_jwt, verify_jwt, ActorKind, Claims};
pub use password::{hash_password, verify_password};
