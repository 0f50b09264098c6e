use axum::{Json, http::HeaderMap};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::utils::error::{AppError, AppResult};

pub fn to_json<T: Serialize>(value: &T) -> AppResult<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| AppError::Internal(format!("Failed to serialize response: {}", e)))
}

pub fn json_response<T: Serialize>(value: &T) -> AppResult<Json<serde_json::Value>> {
    Ok(Json(to_json(value)?))
}

/// Identity the auth middleware attached to the request.
pub fn current_user_id(headers: &HeaderMap) -> AppResult<String> {
    headers
        .get(crate::middleware::auth::AUTH_USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or_else(|| AppError::Auth("Missing authenticated user".to_string()))
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Fixed-width RFC 3339 timestamp, so string order matches time order.
pub fn timestamp_now() -> String {
    format_timestamp(Utc::now())
}

/// Current time, bumped to one microsecond past `previous` when the clock
/// has not moved past it.
pub fn timestamp_after(previous: Option<&str>) -> String {
    let now = Utc::now();

    let next = match previous.and_then(|p| DateTime::parse_from_rfc3339(p).ok()) {
        Some(last) => {
            let last = last.with_timezone(&Utc);
            if now <= last {
                last + chrono::Duration::microseconds(1)
            } else {
                now
            }
        }
        None => now,
    };

    format_timestamp(next)
}
