use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::api::AppState;
use crate::services::directory::user_exists;
use crate::utils::error::{AppError, AppResult};

pub const AUTH_USER_ID_HEADER: &str = "x-user-id";

/// Resolves a bearer token to the id of a user that still exists.
pub async fn authenticate(state: &AppState, token: &str) -> AppResult<String> {
    let user_id = state.jwt_service.extract_user_id(token)?;

    let exists = user_exists(&state.db, &user_id)
        .await
        .map_err(|_| AppError::Internal("Database error during auth check".to_string()))?;

    if !exists {
        return Err(AppError::Auth("User no longer exists".to_string()));
    }

    Ok(user_id)
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = auth_header
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Auth("Missing or invalid authorization header".to_string()))?;

    let user_id = authenticate(&state, token).await?;

    // Overwrites anything the client may have sent under the same name.
    request.headers_mut().insert(
        AUTH_USER_ID_HEADER,
        user_id
            .parse()
            .map_err(|_| AppError::Internal("Failed to set user header".to_string()))?,
    );

    Ok(next.run(request).await)
}
