// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! The regenerating preview pipeline.
//!
//! [`Preview`] decides what a request path should render as:
//!
//! 1. `/` becomes `/index.bs` when the project root has an `index.bs`.
//! 2. A cached rendering is returned as is.
//! 3. A `.bs` or `.dot` path that was never seen gets a placeholder page, a
//!    watch binding on its source file, and a background generation after a
//!    short grace period.
//! 4. Anything else is not handled here.
//!
//! Every generation settles into the [`ContentCache`] (the page or an error
//! page) and broadcasts a [`ReloadEvent`] for its URL. Concurrent generations
//! of one URL are not coalesced: the cache ends up with whichever settles
//! last.

use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;

use crate::cache::ContentCache;
use crate::error::{PreviewError, Result};
use crate::generator::{Generators, SourceKind};
use crate::reload::ReloadEvent;

/// Delay before the first generation of a newly requested page.
///
/// The first reload notification is easily lost while the browser is still
/// loading the placeholder, so the first generation waits a little.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(500);

/// Source served in place of `/` when it exists at the project root.
const ROOT_SOURCE: &str = "index.bs";

/// Registers change watches on source files.
///
/// Implementations deliver change events back through
/// [`Preview::source_changed`].
pub trait SourceWatcher: Send + Sync {
    /// Starts watching `source` for changes.
    fn watch(&self, source: &Path) -> Result<()>;
}

/// On-demand preview generator and page cache for one project root.
pub struct Preview {
    root: PathBuf,
    cache: ContentCache,
    generators: Generators,
    reload_tx: broadcast::Sender<ReloadEvent>,
    watcher: Option<Arc<dyn SourceWatcher>>,
    /// Source path → URLs regenerated when it changes.
    bindings: Mutex<HashMap<PathBuf, BTreeSet<String>>>,
    grace_period: Duration,
    root_url: Option<String>,
}

impl Preview {
    /// Creates a preview for the project at `root`.
    ///
    /// Whether `/` maps to `/index.bs` is decided here, once.
    pub fn new(
        root: impl Into<PathBuf>,
        cache: ContentCache,
        reload_tx: broadcast::Sender<ReloadEvent>,
    ) -> Self {
        let root = absolute_root(root.into());
        let root_url = root
            .join(ROOT_SOURCE)
            .is_file()
            .then(|| format!("/{}", ROOT_SOURCE));
        let generators = Generators::for_root(&root);

        Self {
            root,
            cache,
            generators,
            reload_tx,
            watcher: None,
            bindings: Mutex::new(HashMap::new()),
            grace_period: DEFAULT_GRACE_PERIOD,
            root_url,
        }
    }

    /// Replaces the external-tool generators.
    pub fn with_generators(mut self, generators: Generators) -> Self {
        self.generators = generators;
        self
    }

    /// Sets the watcher used for source change bindings.
    pub fn with_watcher(mut self, watcher: Arc<dyn SourceWatcher>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Sets the delay before the first generation of a new page.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Wraps the preview for sharing with request handlers and tasks.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Absolute project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The page cache.
    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// Applies the root rewrite to a request path.
    pub fn resolve_url(&self, path: &str) -> String {
        match (&self.root_url, path) {
            (Some(root_url), "/") => root_url.clone(),
            _ => path.to_string(),
        }
    }

    /// Handles a request path: root rewrite, then [`content`](Self::content).
    pub fn respond(self: &Arc<Self>, path: &str) -> Option<String> {
        let url = self.resolve_url(path);
        self.content(&url)
    }

    /// Returns the page for `url`, starting generation on a first request.
    ///
    /// `None` means the URL is not a previewable source and should be served
    /// by someone else.
    pub fn content(self: &Arc<Self>, url: &str) -> Option<String> {
        tracing::debug!(url, "content lookup");
        if let Some(content) = self.cache.get(url) {
            return Some(content);
        }
        self.preprocess(url)
    }

    /// Seeds the placeholder for `url`, binds its source file to the watcher
    /// and schedules the first generation.
    ///
    /// Returns the placeholder, or `None` if `url` is not a `.bs`/`.dot` file
    /// inside the project root.
    pub fn preprocess(self: &Arc<Self>, url: &str) -> Option<String> {
        SourceKind::from_url(url)?;
        let source = self.source_path(url)?;
        tracing::debug!(url, source = %source.display(), "preprocess");

        let placeholder = placeholder_page(url);
        self.cache.set(url, placeholder.clone());
        self.bind(url, &source);

        let this = Arc::clone(self);
        let url = url.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(this.grace_period).await;
            this.regenerate(&url, &source);
        });

        Some(placeholder)
    }

    /// Regenerates every URL bound to a changed source file.
    ///
    /// Returns the number of generations started.
    pub fn source_changed(self: &Arc<Self>, path: &Path) -> usize {
        let urls: Vec<String> = {
            let bindings = self.bindings.lock().unwrap_or_else(PoisonError::into_inner);
            match bindings.get(path) {
                Some(urls) => urls.iter().cloned().collect(),
                None => return 0,
            }
        };
        for url in &urls {
            self.regenerate(url, path);
        }
        urls.len()
    }

    /// Starts one generation of `url` from `source`.
    ///
    /// The generator is invoked before this returns; the result settles into
    /// the cache on a spawned task.
    pub fn regenerate(self: &Arc<Self>, url: &str, source: &Path) {
        let Some(kind) = SourceKind::from_url(url) else {
            return;
        };
        self.notify(format!("Generating {} …", url));
        let pending = self.generators.get(kind).generate(source);

        let this = Arc::clone(self);
        let url = url.to_string();
        tokio::spawn(async move {
            let result = pending.await;
            this.settle(&url, result);
        });
    }

    /// Maps a request URL to a file under the root.
    ///
    /// Rejects URLs that would escape the root.
    pub fn source_path(&self, url: &str) -> Option<PathBuf> {
        let mut relative = PathBuf::new();
        for segment in url.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return None,
                segment => relative.push(segment),
            }
        }
        if relative.as_os_str().is_empty() {
            return None;
        }
        // Guards against prefixes like `C:` sneaking in on Windows.
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }

    fn bind(&self, url: &str, source: &Path) {
        let first_binding = {
            let mut bindings = self.bindings.lock().unwrap_or_else(PoisonError::into_inner);
            let urls = bindings.entry(source.to_path_buf()).or_default();
            let first = urls.is_empty();
            urls.insert(url.to_string());
            first
        };
        if !first_binding {
            return;
        }
        if let Some(watcher) = &self.watcher {
            if let Err(e) = watcher.watch(source) {
                tracing::warn!(source = %source.display(), error = %e, "cannot watch source");
            }
        }
    }

    fn settle(&self, url: &str, result: Result<String>) {
        match result {
            Ok(html) => {
                tracing::debug!(url, "generated");
                self.cache.set(url, html);
                self.notify(format!("Generated {}", url));
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "generation failed");
                self.cache.set(url, error_page(&e));
                self.notify(format!("Failed to generate {}", url));
            }
        }
        let _ = self.reload_tx.send(ReloadEvent::reload(url));
    }

    fn notify(&self, message: String) {
        // No subscribers just means no browser is connected yet.
        let _ = self.reload_tx.send(ReloadEvent::notify(message));
    }
}

impl std::fmt::Debug for Preview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preview")
            .field("root", &self.root)
            .field("root_url", &self.root_url)
            .field("grace_period", &self.grace_period)
            .finish_non_exhaustive()
    }
}

fn absolute_root(root: PathBuf) -> PathBuf {
    if let Ok(canonical) = root.canonicalize() {
        return canonical;
    }
    if root.is_absolute() {
        return root;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(root),
        Err(_) => root,
    }
}

/// Page shown while a generation is pending.
pub fn placeholder_page(url: &str) -> String {
    format!(
        "<!DOCTYPE html><meta charset=\"utf-8\"><style>body {{ font: 1rem/1.5 monospace; padding: 30px; }}</style><body>Generating {} &hellip;</body>",
        html_escape(url)
    )
}

/// Page shown when a generation failed.
pub fn error_page(error: &PreviewError) -> String {
    format!(
        r#"<!DOCTYPE html>
<meta charset="utf-8"><style>body {{ color: #800; font: 1rem/1.5 monospace; padding: 30px; }}</style>
<body>
<p><strong>Failed to generate content:</strong></p>
<pre>{}</pre>
</body>
"#,
        html_escape(&error.to_string())
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
