// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! # specview
//!
//! On-demand HTML previews for document sources that browsers cannot render
//! directly: Bikeshed spec markup (`.bs`) and Graphviz graphs (`.dot`).
//!
//! The crate is HTTP-agnostic. A server asks a [`Preview`] for the content of
//! a request path; the preview answers from its [`ContentCache`], or seeds a
//! placeholder and regenerates the page in the background through one of the
//! external-tool [`Generator`]s. Every settlement is announced on a broadcast
//! channel of [`ReloadEvent`]s so connected browsers can refresh.
//!
//! ```rust,ignore
//! use specview::{ContentCache, Preview};
//! use tokio::sync::broadcast;
//!
//! let (reload_tx, _) = broadcast::channel(64);
//! let preview = Preview::new("./spec", ContentCache::new(), reload_tx).into_shared();
//!
//! // First request returns the "Generating ..." placeholder immediately.
//! let page = preview.content("/index.bs");
//! ```

pub mod cache;
pub mod error;
pub mod generator;
pub mod preview;
pub mod reload;

pub use cache::ContentCache;
pub use error::{PreviewError, Result};
pub use generator::{BikeshedGenerator, DotGenerator, Generator, Generators, SourceKind};
pub use preview::{Preview, SourceWatcher};
pub use reload::ReloadEvent;
