//! HTTP surface of the activity ledger.
//!
//! Thin axum layer: handlers validate required fields, call into the
//! ledger, and map errors to statuses. The ledger itself is synchronous,
//! so every database call runs under `spawn_blocking` to keep the
//! request workers free.
//!
//! Endpoints:
//!   POST /activity/log-quiz
//!   POST /activity/ai-reply
//!   POST /activity/time
//!   POST /activity/log
//!   GET  /activity/daily/{userId}?days=N
//!   GET  /activity/summary/{userId}
//!   GET  /activity/time/{userId}
//!   GET  /activity/monthly/{userId}
//!   GET  /teacher/students/{studentId}/performance?teacherId=
//!   POST /student/connect-teacher
//!   GET  /health

use crate::config::ServerConfig;
use crate::error::{LedgerError, Result};
use crate::ledger::ActivityLedger;
use crate::models::{
    AiReplyRequest, ConnectTeacherRequest, LogActivityRequest, LogQuizRequest, LogTimeRequest,
};
use crate::performance::student_performance;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use log::info;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared state handed to every handler.
pub struct AppState {
    pub ledger: ActivityLedger,
}

type ApiError = (StatusCode, Json<Value>);
type ApiResult = std::result::Result<Json<Value>, ApiError>;

/// Bind and serve until the process is stopped.
pub async fn start_server(state: Arc<AppState>, server_config: &ServerConfig) -> Result<()> {
    let bind = format!("{}:{}", server_config.bind, server_config.port);
    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| LedgerError::config(format!("Invalid bind address {}: {}", bind, e)))?;

    let router = build_router(state, server_config);

    info!("Activity ledger listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .await
        .map_err(LedgerError::Io)?;
    Ok(())
}

pub fn build_router(state: Arc<AppState>, server_config: &ServerConfig) -> Router {
    // Allow the SPA origin; a bad origin in config falls back to mirroring
    // any origin rather than refusing to start
    let cors = match server_config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(tower_http::cors::Any),
        Err(_) => CorsLayer::permissive(),
    };

    Router::new()
        // Health (no body, no auth)
        .route("/health", get(health))
        // Writes
        .route("/activity/log-quiz", post(log_quiz))
        .route("/activity/ai-reply", post(ai_reply))
        .route("/activity/time", post(log_time))
        .route("/activity/log", post(log_activity))
        // Reads
        .route("/activity/daily/{user_id}", get(daily_series))
        .route("/activity/summary/{user_id}", get(summary))
        .route("/activity/time/{user_id}", get(time_windows))
        .route("/activity/monthly/{user_id}", get(monthly))
        // Teacher
        .route(
            "/teacher/students/{student_id}/performance",
            get(teacher_student_performance),
        )
        .route("/student/connect-teacher", post(connect_teacher))
        .layer(cors)
        .with_state(state)
}

/// Map a ledger error to an HTTP status and JSON body.
fn to_api_error(error: LedgerError) -> ApiError {
    let status = match &error {
        LedgerError::MissingField(_) => StatusCode::BAD_REQUEST,
        LedgerError::Unauthorized => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": error.to_string() })))
}

/// Run a blocking ledger call off the async worker threads.
async fn run_blocking<T, F>(state: Arc<AppState>, operation: F) -> std::result::Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&ActivityLedger) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || operation(&state.ledger))
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("Task failure: {}", e) })),
            )
        })?
        .map_err(to_api_error)
}

fn require_field(value: Option<String>, name: &str) -> std::result::Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| to_api_error(LedgerError::missing_field(name)))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health(State(state): State<Arc<AppState>>) -> ApiResult {
    let healthy = tokio::task::spawn_blocking(move || state.ledger.is_healthy())
        .await
        .unwrap_or(false);

    if healthy {
        Ok(Json(json!({ "status": "ok", "database": "healthy" })))
    } else {
        Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "status": "error", "database": "unavailable" })),
        ))
    }
}

async fn log_quiz(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LogQuizRequest>,
) -> ApiResult {
    let user_id = require_field(body.user_id, "userId")?;
    let correct = body.correct_answers.unwrap_or(0);

    run_blocking(state, move |ledger| {
        ledger.record_quiz(&user_id, correct, body.practice_seconds, body.questions)
    })
    .await?;

    Ok(Json(json!({ "success": true })))
}

async fn ai_reply(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AiReplyRequest>,
) -> ApiResult {
    let user_id = require_field(body.user_id, "userId")?;

    run_blocking(state, move |ledger| ledger.record_ai_reply(&user_id)).await?;

    Ok(Json(json!({ "success": true })))
}

async fn log_time(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LogTimeRequest>,
) -> ApiResult {
    let user_id = require_field(body.user_id, "userId")?;
    let seconds = body
        .practice_seconds
        .ok_or_else(|| to_api_error(LedgerError::missing_field("practiceSeconds")))?;

    run_blocking(state, move |ledger| {
        ledger.record_practice_time(&user_id, seconds)
    })
    .await?;

    Ok(Json(json!({ "success": true })))
}

async fn log_activity(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LogActivityRequest>,
) -> ApiResult {
    let user_id = require_field(body.user_id, "userId")?;
    let delta = body.delta;

    run_blocking(state, move |ledger| ledger.record_activity(&user_id, &delta)).await?;

    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Default, Deserialize)]
pub struct DailyQuery {
    /// Optional trailing-window size in days (today inclusive)
    pub days: Option<i64>,
}

async fn daily_series(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<DailyQuery>,
) -> ApiResult {
    let lookback = query.days.filter(|d| *d > 0);
    let series =
        run_blocking(state, move |ledger| ledger.get_series(&user_id, lookback)).await?;
    Ok(Json(json!(series)))
}

async fn summary(State(state): State<Arc<AppState>>, Path(user_id): Path<String>) -> ApiResult {
    let totals = run_blocking(state, move |ledger| ledger.get_summary(&user_id)).await?;
    Ok(Json(json!(totals)))
}

async fn time_windows(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult {
    let windows = run_blocking(state, move |ledger| ledger.get_time_windows(&user_id)).await?;
    Ok(Json(json!(windows)))
}

async fn monthly(State(state): State<Arc<AppState>>, Path(user_id): Path<String>) -> ApiResult {
    let rollup = run_blocking(state, move |ledger| ledger.get_monthly_rollup(&user_id)).await?;
    Ok(Json(json!(rollup)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceQuery {
    pub teacher_id: Option<String>,
}

async fn teacher_student_performance(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
    Query(query): Query<PerformanceQuery>,
) -> ApiResult {
    let teacher_id = require_field(query.teacher_id, "teacherId")?;

    let view = run_blocking(state, move |ledger| {
        student_performance(ledger, &teacher_id, &student_id)
    })
    .await?;

    Ok(Json(json!(view)))
}

async fn connect_teacher(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ConnectTeacherRequest>,
) -> ApiResult {
    let student_id = require_field(body.student_id, "studentId")?;
    let teacher_id = require_field(body.teacher_id, "teacherId")?;

    run_blocking(state, move |ledger| {
        ledger.connect_teacher(&student_id, &teacher_id)
    })
    .await?;

    Ok(Json(json!({ "success": true })))
}
