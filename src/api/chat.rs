use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::AppState;
use crate::services::{chat, messaging, read_state, report};
use crate::utils::error::AppResult;
use crate::utils::helpers::{current_user_id, json_response};
use crate::utils::validation::require_id;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessChatRequest {
    #[serde(alias = "product_id")]
    product_id: Option<String>,
    #[serde(alias = "other_user_id")]
    other_user_id: Option<String>,
}

#[derive(Deserialize)]
struct SendMessageRequest {
    content: String,
}

#[derive(Deserialize)]
struct ReportRequest {
    reason: Option<String>,
}

async fn list_chats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<serde_json::Value>> {
    let user_id = current_user_id(&headers)?;
    let chats = chat::list_chats_for_user(&state.db, &user_id).await?;
    json_response(&chats)
}

async fn access_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AccessChatRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let user_id = current_user_id(&headers)?;
    let product_id = require_id("productId", req.product_id.as_deref())?;
    let other_user_id = require_id("otherUserId", req.other_user_id.as_deref())?;

    let (details, created) =
        chat::get_or_create_chat(&state.db, product_id, &user_id, other_user_id).await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(serde_json::json!({ "chat": details }))))
}

async fn total_unread(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<serde_json::Value>> {
    let user_id = current_user_id(&headers)?;
    let unread = read_state::total_unread_for(&state.db, &user_id).await?;
    Ok(Json(serde_json::json!({ "unread": unread })))
}

async fn get_messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(chat_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let user_id = current_user_id(&headers)?;
    let messages = messaging::chat_history(&state.db, &chat_id, &user_id).await?;
    json_response(&messages)
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(chat_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let user_id = current_user_id(&headers)?;
    let message = state.relay.send(&user_id, &chat_id, &req.content).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": message })),
    ))
}

async fn delete_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(chat_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let user_id = current_user_id(&headers)?;
    state.relay.delete_chat(&chat_id, &user_id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Chat deleted successfully"
    })))
}

async fn report_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(chat_id): Path<String>,
    body: Option<Json<ReportRequest>>,
) -> AppResult<Json<serde_json::Value>> {
    let user_id = current_user_id(&headers)?;
    let reason = body.and_then(|Json(req)| req.reason);
    let report = report::report_chat(&state.db, &chat_id, &user_id, reason).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Chat reported successfully",
        "report": report
    })))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(list_chats).post(access_chat))
        .route("/unread", get(total_unread))
        .route("/report/:chat_id", post(report_chat))
        .route("/:chat_id", get(get_messages).delete(delete_chat))
        .route("/:chat_id/messages", post(send_message))
        .with_state(state)
}
