use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::helpers::timestamp_now;

pub const DEFAULT_REPORT_REASON: &str = "Inappropriate behaviour";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Report {
    pub id: String,
    pub chat_id: String,
    pub reported_by: String,
    pub reported_user: String,
    pub reason: String,
    pub created_at: String,
}

impl Report {
    pub fn new(
        chat_id: String,
        reported_by: String,
        reported_user: String,
        reason: Option<String>,
    ) -> Self {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REPORT_REASON.to_string());

        Self {
            id: Uuid::new_v4().to_string(),
            chat_id,
            reported_by,
            reported_user,
            reason,
            created_at: timestamp_now(),
        }
    }
}
