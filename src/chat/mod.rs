pub mod chat_dto;
pub mod chat_handlers;
pub mod chat_models;
pub mod chat_service;
pub mod chat_store;

pub use chat_models::{Conversation, ConversationKind, Message, MessageKind, SenderIdentity};
pub use chat_service::ChatService;
pub use chat_store::{ChatRepository, ChatStore};
