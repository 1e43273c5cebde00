//! Relaytale API server entry point.

use std::sync::{Arc, Mutex};

use relaytale_api::config::AppConfig;
use relaytale_api::error::AppError;
use relaytale_api::state::AppState;
use relaytale_api::{app, telemetry};
use relaytale_core::clock::SystemClock;
use relaytale_core::rng::{DeterministicRng, SystemRng};
use relaytale_store::MIGRATOR;
use relaytale_store::pg_game_repository::PgGameRepository;
use relaytale_store::pg_settings::PgSettingsProvider;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let _telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting Relaytale API server");

    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    MIGRATOR.run(&pool).await?;

    // Build application state.
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> =
        Arc::new(Mutex::new(SystemRng::from_entropy()));
    let app_state = AppState::new(
        Arc::new(SystemClock),
        rng,
        Arc::new(PgGameRepository::new(pool.clone())),
        Arc::new(PgSettingsProvider::new(pool)),
        config.status_stream_interval,
    );

    // Start server.
    let addr = config.bind_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app(app_state)).await?;

    Ok(())
}
