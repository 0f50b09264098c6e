use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::AppState;
use crate::config::Config;
use crate::database;
use crate::utils::jwt::JwtService;
use crate::websocket::relay::Relay;
use crate::websocket::rooms::LocalRooms;

const MAX_BODY_BYTES: usize = 64 * 1024;

fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let Some(origin) = &config.client_origin else {
        return Ok(CorsLayer::permissive());
    };

    let origin = origin
        .parse::<HeaderValue>()
        .map_err(|e| anyhow::anyhow!("Invalid CLIENT_ORIGIN {}: {}", origin, e))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true))
}

pub async fn register_routes(config: &Config) -> anyhow::Result<Router> {
    let db = database::create_pool(&config.database_url).await?;

    tracing::info!("Database connected and migrations applied");

    let jwt_service = Arc::new(JwtService::new(&config.jwt_secret));
    let relay = Arc::new(Relay::new(db.clone(), Arc::new(LocalRooms::new())));

    let state = Arc::new(AppState {
        db,
        jwt_service,
        relay,
    });

    let api_routes = crate::api::routes(state);

    Ok(Router::new().nest("/api", api_routes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(config)?)
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
    ))
}
