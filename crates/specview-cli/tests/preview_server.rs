// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Integration tests for the dev server router.
//!
//! These drive the real router (preview middleware, reload injection and
//! static files) with stand-in generators, so no `bikeshed` or `dot` binary
//! is needed.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use futures_util::future::BoxFuture;
use specview::{ContentCache, Generator, Generators, Preview, PreviewError, ReloadEvent};
use specview_cli::server::http::{create_router, AppState};
use tempfile::{tempdir, TempDir};
use tokio::sync::broadcast;

/// Renders the source file name, or fails with a fixed message.
struct Stub {
    fail: Option<&'static str>,
}

impl Generator for Stub {
    fn generate(&self, source: &Path) -> BoxFuture<'static, specview::Result<String>> {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let result = match self.fail {
            Some(message) => Err(PreviewError::Generation(message.to_string())),
            None => Ok(format!("<!DOCTYPE html>\n<body>\n<h1>rendered {}</h1></body>\n", name)),
        };
        Box::pin(async move { result })
    }
}

struct Project {
    _dir: TempDir,
    server: TestServer,
    cache: ContentCache,
    events: broadcast::Receiver<ReloadEvent>,
}

/// Create a test project with `files` and a server over it.
fn setup_project(files: &[(&str, &str)], fail: Option<&'static str>) -> Project {
    let dir = tempdir().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    let (reload_tx, events) = broadcast::channel(64);
    let cache = ContentCache::new();
    let generator: Arc<dyn Generator> = Arc::new(Stub { fail });
    let preview = Preview::new(dir.path(), cache.clone(), reload_tx.clone())
        .with_generators(Generators::new(generator.clone(), generator))
        .with_grace_period(Duration::ZERO)
        .into_shared();

    let state = Arc::new(AppState {
        preview,
        reload_tx,
        notify: true,
    });
    let server = TestServer::new(create_router(state, dir.path())).unwrap();

    Project {
        _dir: dir,
        server,
        cache,
        events,
    }
}

async fn wait_for_reload(events: &mut broadcast::Receiver<ReloadEvent>, url: &str) {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for reload")
            .expect("reload channel closed");
        if event == ReloadEvent::reload(url) {
            return;
        }
    }
}

#[tokio::test]
async fn test_bikeshed_source_placeholder_then_content() {
    let mut project = setup_project(&[("doc.bs", "<pre class=metadata></pre>")], None);

    let response = project.server.get("/doc.bs").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let content_type = response.header("content-type");
    assert!(content_type.to_str().unwrap().starts_with("text/html"));
    let body = response.text();
    assert!(body.contains("Generating /doc.bs &hellip;"));
    assert!(body.contains("/__livereload"));

    wait_for_reload(&mut project.events, "/doc.bs").await;

    let body = project.server.get("/doc.bs").await.text();
    assert!(body.contains("<h1>rendered doc.bs</h1>"));
    assert!(body.contains("<script>"));
}

#[tokio::test]
async fn test_dot_source_in_subdirectory() {
    let mut project = setup_project(&[("graphs/flow.dot", "digraph { a -> b }")], None);

    project.server.get("/graphs/flow.dot").await;
    wait_for_reload(&mut project.events, "/graphs/flow.dot").await;

    let body = project.server.get("/graphs/flow.dot").await.text();
    assert!(body.starts_with("<!DOCTYPE html>\n<body>\n<h1>rendered flow.dot</h1>"));
}

#[tokio::test]
async fn test_generator_failure_shows_error_page() {
    let mut project = setup_project(
        &[("index.bs", "broken")],
        Some("failed to run `bikeshed`: No such file or directory"),
    );

    project.server.get("/index.bs").await;
    wait_for_reload(&mut project.events, "/index.bs").await;

    let response = project.server.get("/index.bs").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.text();
    assert!(body.contains("Failed to generate content"));
    assert!(body.contains("failed to run `bikeshed`: No such file or directory"));
}

#[tokio::test]
async fn test_static_files_pass_through() {
    let project = setup_project(&[("notes.txt", "plain text")], None);

    let response = project.server.get("/notes.txt").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "plain text");
    assert!(project.cache.is_empty());
}

#[tokio::test]
async fn test_static_html_gets_reload_script() {
    let project = setup_project(&[("index.html", "<html><body><p>hi</p></body></html>")], None);

    let body = project.server.get("/").await.text();
    assert!(body.starts_with("<html><body><p>hi</p>\n<script>"));
    assert!(body.contains(r#"var page = "/";"#));
    assert!(project.cache.is_empty());
}

#[tokio::test]
async fn test_root_serves_index_bs_when_present() {
    let project = setup_project(
        &[("index.bs", "spec"), ("index.html", "<p>static</p>")],
        None,
    );

    let body = project.server.get("/").await.text();
    assert!(body.contains("Generating /index.bs"));
    assert!(body.contains(r#"var page = "/index.bs";"#));
    assert!(project.cache.contains("/index.bs"));
    assert!(!project.cache.contains("/"));
}

#[tokio::test]
async fn test_missing_unrecognized_file_is_not_found() {
    let project = setup_project(&[], None);

    let response = project.server.get("/missing.css").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert!(project.cache.is_empty());
}

#[tokio::test]
async fn test_non_get_requests_bypass_preview() {
    let mut project = setup_project(&[("doc.bs", "spec")], None);

    let response = project.server.post("/doc.bs").await;
    assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(project.cache.is_empty());

    // Give a stray zero-grace generation the chance to announce itself.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(matches!(
        project.events.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}
