//! Diabetes Risk API Server
//!
//! Upload a medical report, get a diabetes risk prediction with its top
//! factors, and list past predictions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    DIABETES RISK API                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │  API      │  │  Auth     │  │  Risk Pipeline          │ │
//! │  │  Gateway  │  │  (JWT     │  │  extract → classify →   │ │
//! │  │  (Axum)   │  │  verify)  │  │  explain → session      │ │
//! │  └─────┬─────┘  └─────┬─────┘  └────────────┬────────────┘ │
//! │        └──────────────┼──────────────────────┘              │
//! │                       ▼                                     │
//! │                ┌─────────────┐                             │
//! │                │ PostgreSQL  │                             │
//! │                └─────────────┘                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use risk_core::{ClassifierAdapter, PredictionStore, RiskPipeline};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

use models::PgPredictionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging; core `log` records are bridged in
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "diabetes_risk_server=debug,risk_core=info,tower_http=debug".into());
    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("{} Server v{} starting...", risk_core::constants::APP_NAME, risk_core::constants::APP_VERSION);
    tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));

    // Initialize database pool
    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to create database pool")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    // Load model; the server still starts without one
    let adapter = ClassifierAdapter::load_or_unloaded(&config.pipeline.model_path);
    tracing::info!(
        "Model loaded: {}, explanation strategy: {}",
        adapter.is_loaded(),
        config.pipeline.explanation_strategy.as_str()
    );

    // Build application state
    let pipeline = RiskPipeline::new(Arc::new(adapter), &config.pipeline, PgPredictionStore::new(pool));
    let state = AppState {
        pipeline: Arc::new(pipeline),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Shared application state
pub struct AppState<S> {
    pub pipeline: Arc<RiskPipeline<S>>,
    pub config: Arc<config::Config>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            config: self.config.clone(),
        }
    }
}

/// Create the main router with all routes
fn create_router<S: PredictionStore>(state: AppState<S>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::check::<S>));

    // Classical pipeline routes (user JWT auth)
    let classical_routes = Router::new()
        .route(
            "/api/v1/classical/extract-patient-data",
            post(handlers::classical::extract_patient_data::<S>),
        )
        .route("/api/v1/classical/predict", get(handlers::classical::predict::<S>))
        .route(
            "/api/v1/classical/get-patient-data",
            get(handlers::classical::get_patient_data::<S>),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.config.clone(),
            middleware::auth::require_user_auth,
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(classical_routes)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
