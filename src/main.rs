//! CodeArena - Application Entry Point
//!
//! This is the main entry point for the CodeArena contest engine server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use codearena::{
    config::CONFIG,
    gateway,
    judge::HttpJudgeClient,
    room::RoomRegistry,
    state::AppState,
    store::PgContestStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| CONFIG.server.rust_log.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting CodeArena contest engine...");

    // Initialize the contest store
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(CONFIG.database.max_connections)
        .connect(&CONFIG.database.url)
        .await?;

    tracing::info!("Running database migrations...");
    PgContestStore::migrate(&db_pool).await?;
    let store = Arc::new(PgContestStore::new(db_pool));

    // Judge sandbox client
    let judge = Arc::new(HttpJudgeClient::new(
        CONFIG.judge.url.clone(),
        CONFIG.judge.deadline_ms,
    ));
    tracing::info!(judge_url = %CONFIG.judge.url, "Judge sandbox configured");

    // Live room registry
    let registry = RoomRegistry::new(
        judge,
        store,
        CONFIG.contest.heartbeat_interval_ms,
        CONFIG.judge.per_test_timeout_ms,
        CONFIG.contest.room_idle_timeout_ms,
    );

    let state = AppState::new(registry);

    // Build the router
    let app = Router::new()
        .merge(gateway::routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start the server
    let addr = SocketAddr::new(CONFIG.server.host.parse()?, CONFIG.server.port);
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
