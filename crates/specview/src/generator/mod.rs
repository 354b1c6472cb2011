// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Source-to-HTML generators.
//!
//! A [`Generator`] turns a source file into an HTML page, asynchronously and
//! fallibly. The mapping from file extension to generator is closed: `.bs`
//! files go to the document compiler, `.dot` files to the graph layout tool,
//! and nothing else is ever generated.

mod bikeshed;
mod dot;

pub use bikeshed::BikeshedGenerator;
pub use dot::{svg_document, DotGenerator};

use std::path::Path;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::Result;

/// Produces HTML for a source file.
///
/// The returned future must not borrow from `self` or `source`, so the
/// pipeline can start a generation synchronously and settle it on a spawned
/// task.
pub trait Generator: Send + Sync {
    /// Starts generating HTML for `source`.
    fn generate(&self, source: &Path) -> BoxFuture<'static, Result<String>>;
}

/// Kinds of sources that get a generated preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Bikeshed spec markup (`.bs`).
    Bikeshed,
    /// Graphviz graph description (`.dot`).
    Dot,
}

impl SourceKind {
    /// Classifies a request path by its extension.
    pub fn from_url(url: &str) -> Option<Self> {
        let file_name = url.rsplit('/').next().unwrap_or(url);
        let (stem, ext) = file_name.rsplit_once('.')?;
        if stem.is_empty() {
            // Dotfiles like `/.bs` have no extension.
            return None;
        }
        match ext {
            "bs" => Some(SourceKind::Bikeshed),
            "dot" => Some(SourceKind::Dot),
            _ => None,
        }
    }
}

/// The generator assigned to each [`SourceKind`].
#[derive(Clone)]
pub struct Generators {
    bikeshed: Arc<dyn Generator>,
    dot: Arc<dyn Generator>,
}

impl Generators {
    /// Creates a generator set from explicit implementations.
    pub fn new(bikeshed: Arc<dyn Generator>, dot: Arc<dyn Generator>) -> Self {
        Self { bikeshed, dot }
    }

    /// Default external tools, with the Bikeshed override lookup rooted at
    /// `root`.
    pub fn for_root(root: &Path) -> Self {
        Self::new(
            Arc::new(BikeshedGenerator::locate(root)),
            Arc::new(DotGenerator::default()),
        )
    }

    /// Returns the generator for `kind`.
    pub fn get(&self, kind: SourceKind) -> Arc<dyn Generator> {
        match kind {
            SourceKind::Bikeshed => self.bikeshed.clone(),
            SourceKind::Dot => self.dot.clone(),
        }
    }
}

impl std::fmt::Debug for Generators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generators").finish_non_exhaustive()
    }
}
