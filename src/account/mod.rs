pub mod account_dto;
pub mod account_handlers;
pub mod account_models;
pub mod account_repository;
pub mod account_service;

pub use account_models::{FriendLink, ManagedAccount};
pub use account_repository::{FriendRepository, ManagedAccountRepository};
pub use account_service::AccountService;
