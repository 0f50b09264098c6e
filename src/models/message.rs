use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MessageWithSender {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub message: Message,
    pub sender_name: String,
    pub sender_email: String,
}

impl Message {
    /// `content` must already be trimmed and validated.
    pub fn new(chat_id: String, sender_id: String, content: String, created_at: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            chat_id,
            sender_id,
            content,
            is_read: false,
            created_at,
        }
    }
}
