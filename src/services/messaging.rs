use crate::{
    database::DbPool,
    models::message::{Message, MessageWithSender},
    services::{chat::require_participant, read_state},
    utils::{
        error::{AppError, AppResult},
        helpers::timestamp_after,
        validation::validate_message_content,
    },
};

const MESSAGE_WITH_SENDER: &str = "SELECT m.*, u.name as sender_name, u.email as sender_email
     FROM messages m
     JOIN users u ON m.sender_id = u.id";

pub async fn append_message(
    pool: &DbPool,
    chat_id: &str,
    sender_id: &str,
    content: &str,
) -> AppResult<Message> {
    let content = validate_message_content(content)?;
    let chat = require_participant(pool, chat_id, sender_id).await?;

    let previous: Option<String> =
        sqlx::query_scalar("SELECT MAX(created_at) FROM messages WHERE chat_id = ?")
            .bind(&chat.id)
            .fetch_one(pool.as_ref())
            .await?;

    let message = Message::new(
        chat.id.clone(),
        sender_id.to_string(),
        content.to_string(),
        timestamp_after(previous.as_deref()),
    );

    sqlx::query(
        "INSERT INTO messages (id, chat_id, sender_id, content, is_read, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&message.id)
    .bind(&message.chat_id)
    .bind(&message.sender_id)
    .bind(&message.content)
    .bind(message.is_read)
    .bind(&message.created_at)
    .execute(pool.as_ref())
    .await?;

    if let Err(e) =
        sqlx::query("UPDATE chats SET latest_message_id = ?, updated_at = ? WHERE id = ?")
            .bind(&message.id)
            .bind(&message.created_at)
            .bind(&chat.id)
            .execute(pool.as_ref())
            .await
    {
        tracing::warn!(chat_id = %chat.id, "Failed to update latest message: {}", e);
    }

    Ok(message)
}

pub async fn get_message_with_sender(
    pool: &DbPool,
    message_id: &str,
) -> AppResult<MessageWithSender> {
    let sql = format!("{} WHERE m.id = ?", MESSAGE_WITH_SENDER);

    sqlx::query_as::<_, MessageWithSender>(&sql)
        .bind(message_id)
        .fetch_optional(pool.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Message not found".to_string()))
}

pub async fn chat_history(
    pool: &DbPool,
    chat_id: &str,
    reader_id: &str,
) -> AppResult<Vec<MessageWithSender>> {
    let chat = require_participant(pool, chat_id, reader_id).await?;

    let sql = format!(
        "{} WHERE m.chat_id = ? ORDER BY m.created_at ASC, m.rowid ASC",
        MESSAGE_WITH_SENDER
    );

    let messages = sqlx::query_as::<_, MessageWithSender>(&sql)
        .bind(&chat.id)
        .fetch_all(pool.as_ref())
        .await?;

    let marked = read_state::mark_read(pool, &chat.id, reader_id).await?;
    if marked > 0 {
        tracing::debug!(chat_id = %chat.id, reader_id, marked, "Marked messages read");
    }

    Ok(messages)
}
