pub mod user_models;
pub mod user_repository;

pub use user_models::{ClientUser, User, UserResponse};
pub use user_repository::{ClientUserRepository, UserRepository};
