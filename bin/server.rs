// Statement Summary - Event Server
// Storage notifications in, summary emails out (REST API with Axum)

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use log::{error, info};
use rusqlite::Connection;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use statement_summary::{
    load_accounts_csv, open_database, Config, CsvStatementParser, Pipeline, RunReport,
    SmtpSender, StorageEvent, SummaryError,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    config: Config,
    storage_root: PathBuf,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/events - Process the statement named by a storage event
async fn handle_event(
    State(state): State<AppState>,
    Json(event): Json<StorageEvent>,
) -> impl IntoResponse {
    let outcome = tokio::task::spawn_blocking(move || process_event(&state, &event)).await;

    match outcome {
        Ok(Ok(report)) => (StatusCode::OK, Json(ApiResponse::ok(report))).into_response(),
        Ok(Err(e)) => {
            error!("❌ Event failed: {}", e);
            (status_for(&e), Json(ApiResponse::<RunReport>::err(e.to_string()))).into_response()
        }
        Err(e) => {
            error!("❌ Event worker crashed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::<RunReport>::err("internal error".to_string())),
            )
                .into_response()
        }
    }
}

fn process_event(state: &AppState, event: &StorageEvent) -> statement_summary::Result<RunReport> {
    let inputs = event.resolve(&state.storage_root)?;
    info!("📨 Event for {}", inputs.transactions.display());

    // Runs are serialized on the single connection
    let conn = state
        .db
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    load_accounts_csv(&conn, &inputs.accounts)?;

    let pipeline = Pipeline::new(
        &conn,
        CsvStatementParser::new(),
        SmtpSender::new(state.config.clone()),
    )
    .with_logo(state.config.logo(Some(&inputs.logo)))
    .with_fallback_recipient(state.config.fallback_recipient());

    pipeline.run(&inputs.transactions)
}

fn status_for(err: &SummaryError) -> StatusCode {
    if err.is_validation() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else if matches!(err, SummaryError::InvalidEvent(_)) {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

// ============================================================================
// Main Server
// ============================================================================

fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("🌐 Statement Summary - Event Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let db_path = PathBuf::from(env_or("STATEMENT_DB", "/tmp/stori.db"));
    let storage_root = PathBuf::from(env_or("STORAGE_ROOT", "storage"));
    let addr = env_or("BIND_ADDR", "0.0.0.0:3000");

    let conn = open_database(&db_path)
        .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
    println!("✓ Database opened: {:?}", db_path);
    println!("✓ Storage root: {:?}", storage_root);

    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
        config: Config::from_env(),
        storage_root,
    };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/events", post(handle_event))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(addr.as_str())
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   Events: POST http://{}/api/events", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}
