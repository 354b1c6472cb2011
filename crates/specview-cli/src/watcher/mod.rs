// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! File system watching for live reload and regeneration.
//!
//! [`FileWatcher`] wraps a debounced `notify` watcher. The dev server runs
//! two of them:
//!
//! - one over the directories the watch globs point into, reloading browsers
//!   when a matching file changes;
//! - one bound to preview sources through [`SourceWatcher`], feeding changes
//!   back into the preview pipeline.
//!
//! Access events (opens, reads) are dropped so that a generator reading its
//! source does not look like an edit.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use specview::{PreviewError, SourceWatcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Debounced watcher that reports changed paths to a callback.
pub struct FileWatcher {
    debouncer: Mutex<Debouncer<RecommendedWatcher, RecommendedCache>>,
    /// Directories already registered for source watching.
    source_dirs: Mutex<HashSet<PathBuf>>,
}

impl FileWatcher {
    /// Creates a watcher that is not watching anything yet.
    ///
    /// # Arguments
    ///
    /// * `debounce` - Quiet period before a burst of events is delivered
    /// * `on_change` - Invoked on the watcher thread with the changed paths
    pub fn new<F>(debounce: Duration, on_change: F) -> anyhow::Result<Self>
    where
        F: Fn(Vec<PathBuf>) + Send + 'static,
    {
        let debouncer = new_debouncer(debounce, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let mut changed: Vec<PathBuf> = events
                        .iter()
                        .filter(|e| !matches!(e.kind, EventKind::Access(_)))
                        .flat_map(|e| e.paths.iter().cloned())
                        .collect();
                    changed.sort();
                    changed.dedup();

                    if !changed.is_empty() {
                        tracing::debug!(?changed, "files changed");
                        on_change(changed);
                    }
                }
                Err(errors) => {
                    for error in errors {
                        tracing::warn!(%error, "file watcher error");
                    }
                }
            }
        })?;

        Ok(Self {
            debouncer: Mutex::new(debouncer),
            source_dirs: Mutex::new(HashSet::new()),
        })
    }

    /// Starts watching `path`.
    pub fn watch(&self, path: &Path, mode: RecursiveMode) -> anyhow::Result<()> {
        let mut debouncer = self.debouncer.lock().unwrap_or_else(PoisonError::into_inner);
        debouncer.watch(path, mode)?;
        tracing::debug!(path = %path.display(), ?mode, "watching");
        Ok(())
    }
}

impl SourceWatcher for FileWatcher {
    /// Watches the directory containing `source`.
    ///
    /// Editors often save by renaming a new file over the old one, which
    /// drops a watch placed on the file itself.
    fn watch(&self, source: &Path) -> specview::Result<()> {
        let dir = source.parent().unwrap_or(source).to_path_buf();
        {
            let mut dirs = self.source_dirs.lock().unwrap_or_else(PoisonError::into_inner);
            if !dirs.insert(dir.clone()) {
                return Ok(());
            }
        }
        FileWatcher::watch(self, &dir, RecursiveMode::NonRecursive).map_err(|e| {
            self.source_dirs
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&dir);
            PreviewError::Watch {
                path: source.to_path_buf(),
                message: e.to_string(),
            }
        })
    }
}

/// Compiles absolute watch globs.
///
/// `*` does not cross directory separators, so `/site/*.css` only matches
/// stylesheets directly inside `/site`.
pub fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(GlobBuilder::new(pattern).literal_separator(true).build()?);
    }
    Ok(builder.build()?)
}

/// Directories to watch recursively so that every file matching `patterns`
/// is seen.
///
/// Each pattern contributes the directory made of its leading literal
/// components. Directories nested inside another returned directory are
/// dropped.
pub fn watch_roots(patterns: &[String]) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = patterns.iter().map(|p| literal_prefix(p)).collect();
    roots.sort();
    roots.dedup();

    let mut kept: Vec<PathBuf> = Vec::new();
    for root in roots {
        if !kept.iter().any(|k| root.starts_with(k)) {
            kept.push(root);
        }
    }
    kept
}

/// Leading components of `pattern` up to the first one containing a glob
/// metacharacter. A fully literal pattern names a file, so its parent is used.
fn literal_prefix(pattern: &str) -> PathBuf {
    let is_glob = |s: &str| s.contains(['*', '?', '[', '{']);
    let path = Path::new(pattern);
    let mut prefix = PathBuf::new();
    let mut literal = true;
    for component in path.components() {
        if is_glob(&component.as_os_str().to_string_lossy()) {
            literal = false;
            break;
        }
        prefix.push(component);
    }
    if literal {
        prefix.pop();
    }
    prefix
}
