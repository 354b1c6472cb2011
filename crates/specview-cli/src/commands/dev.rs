// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Development server command with live reload and preview generation.

use console::style;
use notify::RecursiveMode;
use specview::{
    BikeshedGenerator, ContentCache, DotGenerator, Generators, Preview, ReloadEvent,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use crate::config::{Config, Invocation};
use crate::server::http::{create_router, create_server, AppState};
use crate::watcher::{build_globset, watch_roots, FileWatcher};

/// Runs the development server until the process is stopped.
pub async fn run(
    invocation: Invocation,
    port: Option<u16>,
    host: Option<String>,
) -> anyhow::Result<()> {
    let config = Config::load(&invocation)?.with_overrides(port, host);
    let base_dir = config.server.base_dir.clone();
    tracing::debug!(?config, "configuration loaded");

    // Create a broadcast channel for live reload notifications
    let (reload_tx, _) = broadcast::channel::<ReloadEvent>(64);

    // Source change events arrive on the watcher thread; hand them to the runtime.
    let (source_tx, mut source_rx) = mpsc::unbounded_channel::<Vec<PathBuf>>();
    let source_watcher = FileWatcher::new(config.watch_debounce(), forward_to(source_tx))?;

    let preview = Preview::new(&base_dir, ContentCache::new(), reload_tx.clone())
        .with_generators(generators_for(&config, &base_dir))
        .with_watcher(Arc::new(source_watcher))
        .with_grace_period(config.grace_period())
        .into_shared();

    let dispatch = preview.clone();
    tokio::spawn(async move {
        while let Some(paths) = source_rx.recv().await {
            for path in paths {
                let started = dispatch.source_changed(&path);
                if started > 0 {
                    tracing::debug!(path = %path.display(), started, "source changed");
                }
            }
        }
    });

    let globs = config.watch_globs();
    let _reload_watcher =
        start_reload_watcher(&globs, &base_dir, config.watch_debounce(), reload_tx.clone())?;

    let state = Arc::new(AppState {
        preview,
        reload_tx,
        notify: config.notify,
    });
    let app = create_router(state, &base_dir);

    let addr = format!("{}:{}", config.host, config.port);
    println!(
        "{} {}",
        style("Serving:").cyan(),
        style(base_dir.display()).dim()
    );
    println!(
        "{} {}",
        style("Local:").cyan(),
        style(format!("http://{}{}", addr, config.start_path))
            .green()
            .bold()
    );
    if !globs.is_empty() {
        println!(
            "{} {}",
            style("Watching:").cyan(),
            style(globs.join(", ")).dim()
        );
    }
    println!();

    create_server(&addr, app).await
}

/// Watcher callback handing changed paths to the runtime.
fn forward_to(tx: mpsc::UnboundedSender<Vec<PathBuf>>) -> impl Fn(Vec<PathBuf>) + Send + 'static {
    move |paths| {
        if let Err(error) = tx.send(paths) {
            tracing::debug!(paths = ?error.0, "source change dropped, dispatcher stopped");
        }
    }
}

/// Generators configured for this project.
fn generators_for(config: &Config, base_dir: &Path) -> Generators {
    let bikeshed = match &config.preview.bikeshed {
        Some(program) => BikeshedGenerator::with_program(program),
        None => BikeshedGenerator::locate(base_dir),
    };
    let dot = DotGenerator::with_program(&config.preview.dot);
    tracing::info!(
        bikeshed = %bikeshed.program().display(),
        dot = %dot.program().display(),
        "preview generators"
    );
    Generators::new(Arc::new(bikeshed), Arc::new(dot))
}

/// Reloads browsers when a file matching `globs` changes.
///
/// Every directory the globs point into is watched, including ones outside
/// `base_dir`; reloads for those carry no URL. Returns `None` when there is
/// nothing to watch.
fn start_reload_watcher(
    globs: &[String],
    base_dir: &Path,
    debounce: Duration,
    reload_tx: broadcast::Sender<ReloadEvent>,
) -> anyhow::Result<Option<FileWatcher>> {
    if globs.is_empty() {
        return Ok(None);
    }
    let matcher = build_globset(globs)?;
    let root = base_dir.to_path_buf();

    let watcher = FileWatcher::new(debounce, move |paths| {
        for path in paths.iter().filter(|p| matcher.is_match(p)) {
            let url = reload_url(&root, path);
            tracing::debug!(path = %path.display(), ?url, "reload");
            let _ = reload_tx.send(ReloadEvent::Reload { url });
        }
    })?;
    for dir in watch_roots(globs) {
        if let Err(error) = watcher.watch(&dir, RecursiveMode::Recursive) {
            tracing::warn!(path = %dir.display(), %error, "cannot watch for reload");
        }
    }
    Ok(Some(watcher))
}

/// URL of a changed file, or `None` (reload everything) outside the root.
fn reload_url(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(format!("/{}", segments.join("/")))
}
