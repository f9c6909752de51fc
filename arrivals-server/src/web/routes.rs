//! HTTP route handlers.

use std::path::Path;

use askama::Template;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
};
use chrono::Utc;
use tower_http::services::ServeDir;
use tracing::{debug, error, warn};

use super::dto::{ArrivalsResponse, ErrorResponse};
use super::state::AppState;
use super::templates::BoardTemplate;

/// Create the application router.
///
/// `static_dir` is the path to the static assets directory.
pub fn create_router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/", get(board_page))
        .route("/health", get(health))
        .route("/api/arrivals", get(arrivals))
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// The HTML board.
async fn board_page(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let template = match state.board.latest().await {
        Some(board) => BoardTemplate::from_board(&board, &state),
        None => BoardTemplate::loading(),
    };
    let html = template.render().map_err(|e| AppError::Internal {
        message: format!("Template error: {}", e),
    })?;
    Ok(Html(html))
}

/// Latest board as JSON.
async fn arrivals(State(state): State<AppState>) -> Result<Json<ArrivalsResponse>, AppError> {
    let board = state.board.latest().await.ok_or(AppError::Unavailable {
        message: "no arrivals computed yet".to_string(),
    })?;
    let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    debug!(arrivals = board.arrivals.len(), "serving arrivals");
    Ok(Json(ArrivalsResponse::new(timestamp, &board)))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// No board has been published yet
    Unavailable { message: String },
    Internal { message: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Unavailable { message } => {
                warn!(%message, "request before first refresh");
                (StatusCode::SERVICE_UNAVAILABLE, message)
            }
            AppError::Internal { message } => {
                error!(%message, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArrivalTime, Board, StopCode, StopId};
    use crate::feed::fixture;
    use crate::web::BoardState;
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::Arc;

    async fn serve(state: AppState, static_dir: &Path) -> SocketAddr {
        let app = create_router(state, static_dir);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn board() -> Board {
        Board::new(
            fixture::wall(2024, 1, 8, 8, 5, 0),
            vec![ArrivalTime {
                stop_id: StopId::new("S"),
                stop_code: StopCode::new("100"),
                route: "46A".to_string(),
                destination: "Dun Laoghaire".to_string(),
                due_in_seconds: 1020,
                is_added: false,
            }],
        )
    }

    fn app_state() -> AppState {
        AppState::new(BoardState::new(), HashMap::from([(StopCode::new("100"), 3)]))
    }

    #[tokio::test]
    async fn arrivals_unavailable_until_first_board() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state();
        let addr = serve(state.clone(), dir.path()).await;
        let url = format!("http://{addr}/api/arrivals");

        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "no arrivals computed yet");

        state.board.replace(Arc::new(board())).await;
        let body: serde_json::Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
        assert!(body["timestamp"].as_i64().unwrap() > 0);
        assert_eq!(body["generated_at"], "2024-01-08T08:05:00");
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["route"], "46A");
        assert_eq!(data[0]["due_in_seconds"], 1020);
        assert_eq!(data[0]["due_in"], "17min");
        assert_eq!(data[0]["is_added"], false);
    }

    #[tokio::test]
    async fn board_page_and_health() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state();
        let addr = serve(state.clone(), dir.path()).await;

        let health = reqwest::get(format!("http://{addr}/health")).await.unwrap();
        assert_eq!(health.text().await.unwrap(), "ok");

        let page = reqwest::get(format!("http://{addr}/")).await.unwrap();
        assert_eq!(page.status(), reqwest::StatusCode::OK);
        assert!(page.text().await.unwrap().contains("Loading feeds..."));

        state.board.replace(Arc::new(board())).await;
        let html = reqwest::get(format!("http://{addr}/"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(html.contains("Dun Laoghaire"));
        assert!(html.contains("17min"));
        assert!(html.contains("lcd-green"));
    }

    #[tokio::test]
    async fn serves_static_assets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("board.css"), "body { color: red; }").unwrap();
        let addr = serve(app_state(), dir.path()).await;

        let resp = reqwest::get(format!("http://{addr}/static/board.css"))
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(resp.text().await.unwrap(), "body { color: red; }");
    }
}
