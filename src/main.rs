use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use chrono::FixedOffset;
use sqlx::postgres::PgPoolOptions;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

mod auth;
mod config;
mod db;
mod error;
mod export;
mod handlers;
mod ledger;
mod models;
mod stats;

use crate::config::Config;
use crate::db::{PgStore, Store};

/// Shared application state, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Reporting offset for the dashboard's "today".
    pub stats_offset: FixedOffset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (ignored in production where env vars are injected)
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,stock_ledger=debug")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;
    let stats_offset = stats::offset_from_minutes(config.stats_utc_offset_minutes)?;

    info!(max_connections = config.max_connections, "Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;
    info!("Database connection pool established.");

    info!("Running migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations complete.");

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
    if auth::ensure_bootstrap_admin(store.as_ref(), config.bootstrap_admin.as_ref()).await? {
        info!("Created bootstrap administrator.");
    }

    let app = build_router(AppState { store, stats_offset });

    let addr = format!("{}:{}", config.host, config.port);
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        // ── Health ──────────────────────────────────────────────────────────
        .route("/health", get(handlers::health))

        // ── Products ────────────────────────────────────────────────────────
        .route(
            "/api/products",
            get(handlers::products::list_products).post(handlers::products::upsert_product),
        )
        .route(
            "/api/products/:id",
            get(handlers::products::get_product).delete(handlers::products::delete_product),
        )

        // ── Movements (ledger) ──────────────────────────────────────────────
        .route(
            "/api/movements",
            get(handlers::movements::list_movements).post(handlers::movements::record_movement),
        )
        .route(
            "/api/movements/export",
            get(handlers::movements::export_csv),
        )
        .route(
            "/api/movements/:id",
            delete(handlers::movements::delete_movement),
        )
        .route(
            "/api/movements/:id/reverse",
            post(handlers::movements::reverse_movement),
        )

        // ── Dashboard ───────────────────────────────────────────────────────
        .route("/api/stats", get(handlers::stats::dashboard))

        // ── Users ───────────────────────────────────────────────────────────
        .route("/api/auth/login", post(handlers::users::login))
        .route(
            "/api/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route("/api/users/:id", delete(handlers::users::delete_user))
        .route("/api/users/:id/role", put(handlers::users::update_role))

        // ── Middleware ──────────────────────────────────────────────────────
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
