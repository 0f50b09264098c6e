use crate::database::DbPool;
use crate::models::chat::{ChatDetails, ChatSession, ChatSummary, ordered_pair};
use crate::services::{directory, read_state};
use crate::utils::error::{AppError, AppResult};

async fn find_chat(
    pool: &DbPool,
    listing_id: &str,
    user1_id: &str,
    user2_id: &str,
) -> AppResult<Option<ChatSession>> {
    let chat = sqlx::query_as::<_, ChatSession>(
        "SELECT * FROM chats WHERE listing_id = ? AND user1_id = ? AND user2_id = ?",
    )
    .bind(listing_id)
    .bind(user1_id)
    .bind(user2_id)
    .fetch_optional(pool.as_ref())
    .await?;

    Ok(chat)
}

pub async fn get_chat(pool: &DbPool, chat_id: &str) -> AppResult<ChatSession> {
    sqlx::query_as::<_, ChatSession>("SELECT * FROM chats WHERE id = ?")
        .bind(chat_id)
        .fetch_optional(pool.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Chat not found".to_string()))
}

pub async fn require_participant(
    pool: &DbPool,
    chat_id: &str,
    user_id: &str,
) -> AppResult<ChatSession> {
    let chat = get_chat(pool, chat_id).await?;

    if !chat.has_participant(user_id) {
        return Err(AppError::Forbidden(
            "You are not part of this chat".to_string(),
        ));
    }

    Ok(chat)
}

pub async fn chat_details(pool: &DbPool, chat: ChatSession) -> AppResult<ChatDetails> {
    let listing = directory::get_listing(pool, &chat.listing_id).await?;
    let users = vec![
        directory::get_profile(pool, &chat.user1_id).await?,
        directory::get_profile(pool, &chat.user2_id).await?,
    ];

    Ok(ChatDetails {
        chat,
        listing,
        users,
    })
}

pub async fn get_or_create_chat(
    pool: &DbPool,
    listing_id: &str,
    requester_id: &str,
    other_user_id: &str,
) -> AppResult<(ChatDetails, bool)> {
    if requester_id == other_user_id {
        return Err(AppError::Validation(
            "Cannot start a chat with yourself".to_string(),
        ));
    }

    directory::get_listing(pool, listing_id).await?;

    for user_id in [requester_id, other_user_id] {
        if !directory::user_exists(pool, user_id).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }
    }

    let (user1_id, user2_id) = ordered_pair(requester_id.to_string(), other_user_id.to_string());

    if let Some(chat) = find_chat(pool, listing_id, &user1_id, &user2_id).await? {
        return Ok((chat_details(pool, chat).await?, false));
    }

    let chat = ChatSession::new(listing_id.to_string(), user1_id, user2_id);

    let inserted = sqlx::query(
        "INSERT INTO chats (id, listing_id, user1_id, user2_id, latest_message_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(listing_id, user1_id, user2_id) DO NOTHING",
    )
    .bind(&chat.id)
    .bind(&chat.listing_id)
    .bind(&chat.user1_id)
    .bind(&chat.user2_id)
    .bind(&chat.latest_message_id)
    .bind(&chat.created_at)
    .bind(&chat.updated_at)
    .execute(pool.as_ref())
    .await?
    .rows_affected();

    if inserted == 0 {
        // A concurrent request created it first.
        let existing = find_chat(pool, listing_id, &chat.user1_id, &chat.user2_id)
            .await?
            .ok_or_else(|| AppError::Internal("Chat vanished after conflict".to_string()))?;
        return Ok((chat_details(pool, existing).await?, false));
    }

    tracing::info!(
        chat_id = %chat.id,
        listing_id = %chat.listing_id,
        "Chat created"
    );

    Ok((chat_details(pool, chat).await?, true))
}

pub async fn list_chats_for_user(pool: &DbPool, user_id: &str) -> AppResult<Vec<ChatSummary>> {
    let chats = sqlx::query_as::<_, ChatSession>(
        "SELECT * FROM chats WHERE user1_id = ? OR user2_id = ? ORDER BY updated_at DESC, rowid DESC",
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(pool.as_ref())
    .await?;

    let mut summaries = Vec::with_capacity(chats.len());

    for chat in chats {
        let Some(other_id) = chat.other_participant(user_id) else {
            tracing::warn!(chat_id = %chat.id, "Chat has no other participant");
            continue;
        };

        let other_user = directory::get_profile(pool, other_id).await?;
        let listing = directory::get_listing(pool, &chat.listing_id).await?;
        let unread = read_state::unread_count_for(pool, &chat.id, user_id).await?;

        summaries.push(ChatSummary {
            chat,
            listing_title: listing.title,
            other_user,
            unread,
        });
    }

    Ok(summaries)
}

pub async fn delete_chat(pool: &DbPool, chat_id: &str, requester_id: &str) -> AppResult<()> {
    let chat = require_participant(pool, chat_id, requester_id).await?;

    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM messages WHERE chat_id = ?")
        .bind(&chat.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM chats WHERE id = ?")
        .bind(&chat.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(chat_id = %chat.id, messages = removed, "Chat deleted");

    Ok(())
}
