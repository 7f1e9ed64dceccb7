use std::sync::Arc;

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use horas_registro_civil::config::AppConfig;
use horas_registro_civil::handlers;
use horas_registro_civil::services::srcei::SrceiClient;
use horas_registro_civil::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env()?;
    config.validate()?;

    tracing::info!(
        environment = %config.environment,
        headless = config.scrape.headless,
        step_timeout_secs = config.scrape.step_timeout.as_secs(),
        operation_timeout_secs = config.scrape.operation_timeout.as_secs(),
        max_attempts = config.scrape.max_attempts,
        missing_control = ?config.scrape.missing_control,
        "starting horas-registro-civil with real-time browser scraping"
    );

    let state = Arc::new(AppState {
        slots: Box::new(SrceiClient::new(config.scrape.clone())),
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(handlers::health::health))
        .route("/health", get(handlers::health::health))
        .route("/slots", get(handlers::slots::get_slots))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
