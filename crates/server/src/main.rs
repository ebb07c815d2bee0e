use server::config;
use server::db;
use server::routes;
use server::store::{EditorStore, SessionStore};

use axum::{
    routing::{delete, get, post},
    Extension, Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = db::pool::create_pool(&config.database_url).await?;

    tracing::info!("Running migrations...");
    db::pool::run_migrations(&pool).await?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        // Auth
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/me", get(routes::auth::me))
        // Editor
        .route("/api/puzzles/editor/register", post(routes::editor::register))
        .route("/api/puzzles/editor/{id}/moves", get(routes::editor::valid_moves))
        .route("/api/puzzles/editor/{id}/move", post(routes::editor::submit_move))
        .route("/api/puzzles/editor/{id}/variation", post(routes::editor::new_variation))
        .route("/api/puzzles/editor/{id}/submit", post(routes::editor::submit))
        // Training
        .route("/api/puzzles/train/random/{variant}", get(routes::train::random_puzzle))
        .route("/api/puzzles/train/setup", post(routes::train::setup))
        .route("/api/puzzles/train/move", post(routes::train::submit_move))
        // Puzzle lookup (parameterized, after the static prefixes)
        .route("/api/puzzles/{id}", get(routes::puzzles::get_puzzle))
        .route(
            "/api/puzzles/{id}/comments",
            get(routes::comments::list_comments).post(routes::comments::post_comment),
        )
        .route("/api/comments/{id}", delete(routes::comments::delete_comment))
        // Shared state
        .layer(Extension(pool))
        .layer(Extension(config.clone()))
        .layer(Extension(SessionStore::new()))
        .layer(Extension(EditorStore::new()))
        .layer(CompressionLayer::new())
        .layer(cors);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
