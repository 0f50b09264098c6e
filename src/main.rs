use kartchat::config::Config;
use kartchat::server::route_builder::register_routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_loaded = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    if let Err(e) = env_loaded {
        tracing::debug!("No .env file loaded: {}", e);
    }

    let config = Config::from_env()?;
    let app = register_routes(&config).await?;

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
