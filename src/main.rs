use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use servyard::config::AppConfig;
use servyard::db;
use servyard::routes;
use servyard::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    config.validate()?;

    let conn = db::init_db(&config.database_url)
        .with_context(|| format!("opening database at {}", config.database_url))?;

    let addr = format!("0.0.0.0:{}", config.port);
    let state = Arc::new(AppState::new(conn, config));
    let app = routes::app(state);

    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
