use axum::{routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

mod auth;
mod config;
mod database;
mod error;
mod handlers;
mod labels;
mod middleware;
mod notes;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Initialize configuration (this loads the config singleton)
    let config = crate::config::config();
    tracing::info!("Starting Invest Notes API in {:?} mode", config.environment);

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Invest Notes API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Public auth routes (registration, activation, token acquisition)
        .merge(auth_public_routes())
        // Identity-scoped API
        .merge(auth_routes())
        .merge(label_routes())
        .merge(note_routes())
        // Resolve caller identity for every request; services enforce
        // authentication at their own boundary
        .layer(axum::middleware::from_fn(
            middleware::auth::identity_middleware,
        ))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn auth_public_routes() -> Router {
    use axum::routing::post;
    use handlers::auth;

    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/activate", post(auth::activate))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
}

fn auth_routes() -> Router {
    use handlers::auth;

    Router::new().route("/api/auth/whoami", get(auth::whoami))
}

fn label_routes() -> Router {
    use handlers::labels;

    Router::new()
        // Collection operations (list supports ?search=)
        .route(
            "/api/labels",
            get(labels::label_list).post(labels::label_create),
        )
        // Object operations
        .route(
            "/api/labels/:id",
            get(labels::label_get)
                .patch(labels::label_update)
                .delete(labels::label_delete),
        )
}

fn note_routes() -> Router {
    use handlers::notes;

    Router::new()
        .route("/api/notes", get(notes::note_list).post(notes::note_create))
        .route(
            "/api/notes/:id",
            get(notes::note_get)
                .patch(notes::note_update)
                .delete(notes::note_delete),
        )
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Invest Notes API",
            "version": version,
            "description": "Note and label management backend with per-owner label uniqueness",
            "endpoints": {
                "home": "/ (public)",
                "auth": "/auth/register, /auth/activate, /auth/login, /auth/refresh (public)",
                "whoami": "/api/auth/whoami (protected)",
                "labels": "/api/labels[/:id] (protected)",
                "notes": "/api/notes[/:id] (protected)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::manager::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
