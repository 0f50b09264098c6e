use axum::{
    extract::{
        FromRequest, Query, Request, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    http::header,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::AppState;
use crate::middleware::auth::authenticate;
use crate::utils::error::{AppError, AppResult};

#[derive(Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// Browsers cannot set headers on a websocket handshake, so the token may
/// also come in the query string.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
    request: Request,
) -> AppResult<Response> {
    let token = query.token.or_else(|| {
        request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(|t| t.to_string())
    });

    let token =
        token.ok_or_else(|| AppError::Auth("Missing token for realtime connection".to_string()))?;
    let user_id = authenticate(&state, &token).await?;

    let state_clone = state.clone();
    let ws = WebSocketUpgrade::from_request(request, &state)
        .await
        .map_err(|_| AppError::Validation("Expected a websocket upgrade".to_string()))?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state_clone, user_id)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: String) {
    crate::websocket::connection::handle_connection(socket, user_id, state.relay.clone()).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::testing::*;
    use crate::utils::jwt::JwtService;
    use crate::websocket::relay::Relay;
    use crate::websocket::rooms::LocalRooms;
    use axum::{
        Router,
        body::Body,
        http::{self, StatusCode},
        routing::get,
    };
    use tower::ServiceExt;

    async fn app() -> (Router, Arc<JwtService>) {
        let db = seeded_pool().await;
        let jwt = Arc::new(JwtService::new("test-secret"));
        let relay = Arc::new(Relay::new(db.clone(), Arc::new(LocalRooms::new())));
        let state = Arc::new(AppState {
            db,
            jwt_service: jwt.clone(),
            relay,
        });
        let router = Router::new().route("/ws", get(ws_handler)).with_state(state);
        (router, jwt)
    }

    async fn status_of(router: &Router, uri: &str, bearer: Option<&str>) -> StatusCode {
        let mut builder = http::Request::builder().uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder.body(Body::empty()).unwrap();
        router.clone().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_upgrade_requires_valid_token() {
        let (router, jwt) = app().await;

        assert_eq!(status_of(&router, "/ws", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(&router, "/ws?token=garbage", None).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(&router, "/ws", Some("garbage")).await,
            StatusCode::UNAUTHORIZED
        );

        let ghost = jwt
            .generate_token("ghost", chrono::Duration::hours(1))
            .unwrap();
        assert_eq!(
            status_of(&router, &format!("/ws?token={}", ghost), None).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_valid_token_without_handshake_is_bad_request() {
        let (router, jwt) = app().await;
        let token = jwt
            .generate_token(ALICE, chrono::Duration::hours(1))
            .unwrap();

        assert_eq!(
            status_of(&router, &format!("/ws?token={}", token), None).await,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(&router, "/ws", Some(&token)).await,
            StatusCode::BAD_REQUEST
        );
    }
}
