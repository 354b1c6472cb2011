// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! HTTP server for development with live reload and preview generation.
//!
//! Requests pass through two middleware layers before reaching the static
//! file service:
//!
//! 1. `inject_livereload` adds the reload client to every HTML response.
//! 2. `preview_middleware` answers `.bs`/`.dot` paths (and `/` when an
//!    `index.bs` exists) from the [`Preview`]; everything else falls through.

use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State, WebSocketUpgrade},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use specview::{Preview, ReloadEvent};
use tokio::sync::broadcast;
use tower_http::services::ServeDir;

use super::livereload::{handle_websocket, inject_livereload_script, LIVERELOAD_PATH};

/// Largest HTML response the reload script is injected into.
const MAX_INJECT_SIZE: usize = 64 * 1024 * 1024;

/// Shared application state for the development server.
pub struct AppState {
    /// Preview pipeline and page cache.
    pub preview: Arc<Preview>,
    /// Channel for sending reload notifications.
    pub reload_tx: broadcast::Sender<ReloadEvent>,
    /// Forward status messages to browsers.
    pub notify: bool,
}

/// Builds the application router serving `base_dir`.
pub fn create_router(state: Arc<AppState>, base_dir: &Path) -> Router {
    let static_files = ServeDir::new(base_dir).append_index_html_on_directories(true);

    Router::new()
        .route(LIVERELOAD_PATH, get(livereload_handler))
        .fallback_service(static_files)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            preview_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            inject_livereload,
        ))
        .with_state(state)
}

/// Binds `addr` and serves `app` until the process is stopped.
pub async fn create_server(addr: &str, app: Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn livereload_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let rx = state.reload_tx.subscribe();
    let notify = state.notify;
    ws.on_upgrade(move |socket| handle_websocket(socket, rx, notify))
}

/// Serves generated previews; passes everything else on.
async fn preview_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !is_read(request.method()) {
        return next.run(request).await;
    }
    let path = request.uri().path().to_string();
    tracing::debug!(%path, "middleware");

    match state.preview.respond(&path) {
        Some(content) => ([(header::CACHE_CONTROL, "no-cache")], Html(content)).into_response(),
        None => next.run(request).await,
    }
}

/// Adds the live reload client to successful HTML responses.
async fn inject_livereload(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }
    let page_url = state.preview.resolve_url(request.uri().path());
    let response = next.run(request).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/html"));
    if !is_html || response.status() != StatusCode::OK {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_INJECT_SIZE).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, url = %page_url, "cannot buffer HTML response");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read response").into_response();
        }
    };
    let html = match String::from_utf8(bytes.to_vec()) {
        Ok(html) => html,
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(inject_livereload_script(&html, &page_url)))
}

fn is_read(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}
