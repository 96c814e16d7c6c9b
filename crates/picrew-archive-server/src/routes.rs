// Copyright 2026 Picrew Archive Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP surface for the scraper.
//!
//! Three routes drive the whole flow: `POST /api/scrape` accepts a maker
//! url and returns a session id, `GET /api/status/:id` is polled until the
//! session reaches a terminal state, and `GET /downloads/...` serves the
//! finished archives. `GET /` serves the embedded dashboard.

use crate::scrape_task;
use crate::sessions::SessionStore;
use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use picrew_archive::Scraper;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

/// Shared state passed to every handler.
pub struct AppState {
    pub sessions: SessionStore,
    pub scraper: Scraper,
    /// In-flight scrape roots, one subdirectory per session.
    pub work_dir: PathBuf,
    /// Finished zip archives, served under `/downloads`.
    pub downloads_dir: PathBuf,
}

impl AppState {
    pub fn new(data_dir: &std::path::Path) -> Self {
        Self {
            sessions: SessionStore::new(),
            scraper: Scraper::new(),
            work_dir: data_dir.join("tmp"),
            downloads_dir: data_dir.join("downloads"),
        }
    }
}

/// Build the axum router with all endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(dashboard))
        .route("/api/scrape", post(start_scrape))
        .route("/api/status/:id", get(session_status))
        .nest_service("/downloads", ServeDir::new(&state.downloads_dir))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the given port.
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    std::fs::create_dir_all(&state.work_dir)?;
    std::fs::create_dir_all(&state.downloads_dir)?;

    let app = router(state);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("scrape server listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Serve the embedded dashboard HTML.
async fn dashboard() -> impl IntoResponse {
    Html(include_str!("dashboard.html"))
}

#[derive(Deserialize)]
struct ScrapeRequest {
    url: String,
}

/// Accept a scrape request and run it in the background; the caller polls
/// the returned session id.
async fn start_scrape(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ScrapeRequest>,
) -> impl IntoResponse {
    let input = body.url.trim().to_owned();
    if input.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "URL is required"})),
        )
            .into_response();
    }

    let session_id = state.sessions.create();
    tokio::spawn(scrape_task::run(
        Arc::clone(&state),
        session_id.clone(),
        input,
    ));

    Json(json!({ "sessionId": session_id })).into_response()
}

async fn session_status(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<String>,
) -> impl IntoResponse {
    match state.sessions.get(&id) {
        Some(session) => Json(session).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Session not found"})),
        )
            .into_response(),
    }
}
