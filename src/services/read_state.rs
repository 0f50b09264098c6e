use crate::database::DbPool;
use crate::utils::error::AppResult;
use sqlx::Row;

pub async fn mark_read(pool: &DbPool, chat_id: &str, reader_id: &str) -> AppResult<u64> {
    let result = sqlx::query(
        "UPDATE messages SET is_read = 1 WHERE chat_id = ? AND sender_id != ? AND is_read = 0",
    )
    .bind(chat_id)
    .bind(reader_id)
    .execute(pool.as_ref())
    .await?;

    Ok(result.rows_affected())
}

pub async fn unread_count_for(pool: &DbPool, chat_id: &str, user_id: &str) -> AppResult<i64> {
    let count = sqlx::query(
        "SELECT COUNT(*) as count FROM messages WHERE chat_id = ? AND sender_id != ? AND is_read = 0",
    )
    .bind(chat_id)
    .bind(user_id)
    .fetch_one(pool.as_ref())
    .await?
    .get::<i64, _>("count");

    Ok(count)
}

pub async fn total_unread_for(pool: &DbPool, user_id: &str) -> AppResult<i64> {
    let count = sqlx::query(
        "SELECT COUNT(*) as count
         FROM messages m
         JOIN chats c ON m.chat_id = c.id
         WHERE (c.user1_id = ? OR c.user2_id = ?) AND m.sender_id != ? AND m.is_read = 0",
    )
    .bind(user_id)
    .bind(user_id)
    .bind(user_id)
    .fetch_one(pool.as_ref())
    .await?
    .get::<i64, _>("count");

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::*;
    use crate::services::chat::get_or_create_chat;
    use crate::services::messaging::{append_message, chat_history};

    #[tokio::test]
    async fn test_unread_counts_follow_reads() {
        let pool = seeded_pool().await;
        let (details, _) = get_or_create_chat(&pool, LISTING, ALICE, BOB).await.unwrap();
        let chat_id = details.chat.id;

        for i in 0..3 {
            append_message(&pool, &chat_id, BOB, &format!("offer {}", i))
                .await
                .unwrap();
        }
        append_message(&pool, &chat_id, ALICE, "thinking").await.unwrap();

        assert_eq!(unread_count_for(&pool, &chat_id, ALICE).await.unwrap(), 3);
        assert_eq!(unread_count_for(&pool, &chat_id, BOB).await.unwrap(), 1);

        chat_history(&pool, &chat_id, ALICE).await.unwrap();

        assert_eq!(unread_count_for(&pool, &chat_id, ALICE).await.unwrap(), 0);
        assert_eq!(unread_count_for(&pool, &chat_id, BOB).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_sender_reading_own_chat_changes_nothing() {
        let pool = seeded_pool().await;
        let (details, _) = get_or_create_chat(&pool, LISTING, ALICE, BOB).await.unwrap();
        let chat_id = details.chat.id;

        append_message(&pool, &chat_id, BOB, "ping").await.unwrap();

        assert_eq!(mark_read(&pool, &chat_id, BOB).await.unwrap(), 0);
        assert_eq!(unread_count_for(&pool, &chat_id, ALICE).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_total_unread_spans_chats() {
        let pool = seeded_pool().await;
        let (first, _) = get_or_create_chat(&pool, LISTING, ALICE, BOB).await.unwrap();
        let (second, _) = get_or_create_chat(&pool, OTHER_LISTING, ALICE, BOB).await.unwrap();
        let (third, _) = get_or_create_chat(&pool, LISTING, CAROL, BOB).await.unwrap();

        append_message(&pool, &first.chat.id, ALICE, "a").await.unwrap();
        append_message(&pool, &second.chat.id, ALICE, "b").await.unwrap();
        append_message(&pool, &second.chat.id, ALICE, "c").await.unwrap();
        append_message(&pool, &third.chat.id, CAROL, "d").await.unwrap();
        append_message(&pool, &third.chat.id, BOB, "e").await.unwrap();

        assert_eq!(total_unread_for(&pool, BOB).await.unwrap(), 4);
        assert_eq!(total_unread_for(&pool, ALICE).await.unwrap(), 0);
        assert_eq!(total_unread_for(&pool, CAROL).await.unwrap(), 1);

        chat_history(&pool, &second.chat.id, BOB).await.unwrap();
        assert_eq!(total_unread_for(&pool, BOB).await.unwrap(), 2);
    }
}
