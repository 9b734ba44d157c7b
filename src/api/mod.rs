pub mod client;
pub mod events;
pub mod models;

use crate::error::ApiError;
use async_trait::async_trait;
use models::{Message, MessageId, NewMessage, User};

/// The CRUD surface of the chat backend: `users` and `chats` resources.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// `GET /users`
    async fn users(&self) -> Result<Vec<User>, ApiError>;

    /// `GET /chats`
    async fn messages(&self) -> Result<Vec<Message>, ApiError>;

    /// `POST /chats`, returning the record as stored by the backend.
    async fn create_message(&self, draft: &NewMessage) -> Result<Message, ApiError>;

    /// `DELETE /chats/{id}`
    async fn delete_message(&self, id: &MessageId) -> Result<(), ApiError>;
}
