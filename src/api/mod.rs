pub mod chat;

use axum::{Router, routing::get};
use std::sync::Arc;

use crate::database::DbPool;
use crate::utils::jwt::JwtService;
use crate::websocket::relay::Relay;

pub struct AppState {
    pub db: DbPool,
    pub jwt_service: Arc<JwtService>,
    pub relay: Arc<Relay>,
}

async fn health_check() -> &'static str {
    "OK"
}

pub fn routes(state: Arc<AppState>) -> Router {
    let ws_route = Router::new()
        .route("/ws", get(crate::websocket::handlers::ws_handler))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .nest("/chat", chat::routes(state.clone()))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(ws_route)
        .merge(protected_routes)
}
