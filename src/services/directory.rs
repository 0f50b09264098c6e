use crate::database::DbPool;
use crate::models::listing::ListingSummary;
use crate::models::user::ParticipantProfile;
use crate::utils::error::{AppError, AppResult};
use crate::utils::helpers::timestamp_now;
use sqlx::Row;

pub async fn user_exists(pool: &DbPool, user_id: &str) -> AppResult<bool> {
    let count = sqlx::query("SELECT COUNT(*) as count FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(pool.as_ref())
        .await?
        .get::<i64, _>("count");

    Ok(count > 0)
}

pub async fn get_profile(pool: &DbPool, user_id: &str) -> AppResult<ParticipantProfile> {
    sqlx::query_as::<_, ParticipantProfile>("SELECT id, name, email FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn get_listing(pool: &DbPool, listing_id: &str) -> AppResult<ListingSummary> {
    sqlx::query_as::<_, ListingSummary>("SELECT id, title FROM listings WHERE id = ?")
        .bind(listing_id)
        .fetch_optional(pool.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

pub async fn upsert_user(pool: &DbPool, id: &str, name: &str, email: &str) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO users (id, name, email, created_at) VALUES (?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name, email = excluded.email",
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(timestamp_now())
    .execute(pool.as_ref())
    .await?;

    Ok(())
}

pub async fn upsert_listing(pool: &DbPool, id: &str, title: &str, seller_id: &str) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO listings (id, title, seller_id, created_at) VALUES (?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET title = excluded.title",
    )
    .bind(id)
    .bind(title)
    .bind(seller_id)
    .bind(timestamp_now())
    .execute(pool.as_ref())
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::*;

    #[tokio::test]
    async fn test_lookups() {
        let pool = seeded_pool().await;

        assert!(user_exists(&pool, ALICE).await.unwrap());
        assert!(!user_exists(&pool, "nobody").await.unwrap());

        let profile = get_profile(&pool, BOB).await.unwrap();
        assert_eq!(profile.name, "Bob");

        let listing = get_listing(&pool, LISTING).await.unwrap();
        assert_eq!(listing.title, "Calculus textbook");

        assert!(matches!(
            get_listing(&pool, "missing").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_upsert_updates_in_place() {
        let pool = seeded_pool().await;
        upsert_user(&pool, ALICE, "Alice B.", "alice@campus.edu")
            .await
            .unwrap();
        assert_eq!(get_profile(&pool, ALICE).await.unwrap().name, "Alice B.");
    }
}
