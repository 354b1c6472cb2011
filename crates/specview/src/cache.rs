// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Rendered page cache keyed by request URL.
//!
//! Each entry holds the most recently known rendering of a page: the
//! "Generating ..." placeholder, the generated HTML, or a rendered error page.
//! Entries are created on the first request for a URL and overwritten on every
//! regeneration. Nothing is ever evicted.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Shared handle to the URL → HTML map.
///
/// Cloning the handle is cheap and every clone sees the same entries, so the
/// server bootstrap can keep one clone while the [`Preview`](crate::Preview)
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct ContentCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl ContentCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached rendering for `url`, if any.
    pub fn get(&self, url: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(url).cloned()
    }

    /// Stores `content` for `url`, replacing whatever was there.
    pub fn set(&self, url: &str, content: impl Into<String>) {
        let content = content.into();
        tracing::debug!(url, preview = %truncate(&content, 50), "cache set");
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(url.to_string(), content);
    }

    /// Returns true if an entry exists for `url`.
    pub fn contains(&self, url: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(url)
    }

    /// Number of cached URLs.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
