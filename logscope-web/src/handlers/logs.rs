//! JSON handlers for browsing node logs

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use logscope_core::{NodeLogClient, ReadError, SnippetEnd};
use logscope_core::protocol::{LogFileListing, LogFileSnippet};
use serde::Deserialize;
use serde_json::json;

use crate::server::AppState;

/// Query parameters of the head and tail endpoints.
#[derive(Debug, Deserialize)]
pub struct OffsetQuery {
    /// Byte offset the snippet is taken relative to.
    #[serde(default)]
    pub offset: u64,
}

/// Error rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_allocated() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "Node is not allocated".to_string(),
        }
    }
}

impl From<ReadError> for ApiError {
    fn from(error: ReadError) -> Self {
        let status = match error {
            ReadError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

async fn session_client(state: &AppState, session: &str) -> Result<NodeLogClient, ApiError> {
    state.session(session).await.ok_or_else(|| {
        tracing::debug!("Unknown session {}", session);
        ApiError::not_allocated()
    })
}

/// `GET /sessions/{session}/logs`
pub async fn list_logs(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Result<Json<LogFileListing>, ApiError> {
    let client = session_client(&state, &session).await?;
    let listing = client.list_logs(state.shutdown_token()).await?;

    tracing::debug!("Session {} lists {} log files", session, listing.entries.len());
    Ok(Json(listing))
}

/// `GET /sessions/{session}/logs/{file}/head`
pub async fn log_head(
    State(state): State<AppState>,
    Path((session, file)): Path<(String, String)>,
    Query(query): Query<OffsetQuery>,
) -> Result<Json<LogFileSnippet>, ApiError> {
    snippet(&state, &session, &file, SnippetEnd::Head, query.offset).await
}

/// `GET /sessions/{session}/logs/{file}/tail`
pub async fn log_tail(
    State(state): State<AppState>,
    Path((session, file)): Path<(String, String)>,
    Query(query): Query<OffsetQuery>,
) -> Result<Json<LogFileSnippet>, ApiError> {
    snippet(&state, &session, &file, SnippetEnd::Tail, query.offset).await
}

async fn snippet(
    state: &AppState,
    session: &str,
    file: &str,
    end: SnippetEnd,
    offset: u64,
) -> Result<Json<LogFileSnippet>, ApiError> {
    let client = session_client(state, session).await?;
    let snippet = client
        .snippet(end, file, offset, state.shutdown_token())
        .await?;
    Ok(Json(snippet))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "sessions": state.session_count().await,
        "connected": state.connected_count().await,
    }))
}
