use crate::database::DbPool;
use crate::models::report::Report;
use crate::services::chat::require_participant;
use crate::utils::error::{AppError, AppResult};
use sqlx::Row;

pub async fn report_chat(
    pool: &DbPool,
    chat_id: &str,
    reporter_id: &str,
    reason: Option<String>,
) -> AppResult<Report> {
    let chat = require_participant(pool, chat_id, reporter_id).await?;

    let reported_user = chat
        .other_participant(reporter_id)
        .ok_or_else(|| AppError::Validation("No user to report".to_string()))?
        .to_string();

    let already_reported = sqlx::query(
        "SELECT COUNT(*) as count FROM reports WHERE chat_id = ? AND reported_by = ?",
    )
    .bind(&chat.id)
    .bind(reporter_id)
    .fetch_one(pool.as_ref())
    .await?
    .get::<i64, _>("count");

    if already_reported > 0 {
        return Err(already_reported_error());
    }

    let report = Report::new(chat.id, reporter_id.to_string(), reported_user, reason);

    let inserted = sqlx::query(
        "INSERT INTO reports (id, chat_id, reported_by, reported_user, reason, created_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&report.id)
    .bind(&report.chat_id)
    .bind(&report.reported_by)
    .bind(&report.reported_user)
    .bind(&report.reason)
    .bind(&report.created_at)
    .execute(pool.as_ref())
    .await;

    match inserted {
        Ok(_) => {}
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(already_reported_error());
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(
        chat_id = %report.chat_id,
        reported_by = %report.reported_by,
        reported_user = %report.reported_user,
        "Chat reported"
    );

    Ok(report)
}

fn already_reported_error() -> AppError {
    AppError::Conflict("You already reported this chat".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::*;
    use crate::services::chat::{delete_chat, get_or_create_chat};

    async fn report_rows(pool: &DbPool) -> i64 {
        sqlx::query("SELECT COUNT(*) as count FROM reports")
            .fetch_one(pool.as_ref())
            .await
            .unwrap()
            .get::<i64, _>("count")
    }

    #[tokio::test]
    async fn test_report_targets_other_participant() {
        let pool = seeded_pool().await;
        let (details, _) = get_or_create_chat(&pool, LISTING, ALICE, BOB).await.unwrap();

        let report = report_chat(&pool, &details.chat.id, ALICE, None).await.unwrap();
        assert_eq!(report.reported_by, ALICE);
        assert_eq!(report.reported_user, BOB);
        assert_eq!(report.reason, "Inappropriate behaviour");
    }

    #[tokio::test]
    async fn test_second_report_conflicts() {
        let pool = seeded_pool().await;
        let (details, _) = get_or_create_chat(&pool, LISTING, ALICE, BOB).await.unwrap();
        let chat_id = details.chat.id;

        report_chat(&pool, &chat_id, ALICE, Some("scam".into()))
            .await
            .unwrap();
        assert!(matches!(
            report_chat(&pool, &chat_id, ALICE, None).await,
            Err(AppError::Conflict(_))
        ));
        assert_eq!(report_rows(&pool).await, 1);

        // The other side keeps their own right to report.
        report_chat(&pool, &chat_id, BOB, None).await.unwrap();
        assert_eq!(report_rows(&pool).await, 2);
    }

    #[tokio::test]
    async fn test_outsider_cannot_report() {
        let pool = seeded_pool().await;
        let (details, _) = get_or_create_chat(&pool, LISTING, ALICE, BOB).await.unwrap();

        assert!(matches!(
            report_chat(&pool, &details.chat.id, CAROL, None).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            report_chat(&pool, "missing", CAROL, None).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(report_rows(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_reports_survive_chat_deletion() {
        let pool = seeded_pool().await;
        let (details, _) = get_or_create_chat(&pool, LISTING, ALICE, BOB).await.unwrap();

        report_chat(&pool, &details.chat.id, ALICE, None).await.unwrap();
        delete_chat(&pool, &details.chat.id, ALICE).await.unwrap();

        assert_eq!(report_rows(&pool).await, 1);
    }
}
