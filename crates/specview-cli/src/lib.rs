// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! specview CLI library.
//!
//! A live-reloading development server for spec authors. It serves a project
//! directory as static files, and renders Bikeshed (`.bs`) and Graphviz
//! (`.dot`) sources to HTML on the fly, regenerating them whenever the source
//! changes.
//!
//! # Usage
//!
//! ```bash
//! specview index.bs              # serve the directory of index.bs
//! specview -r .. docs/flow.dot   # serve the parent directory
//! specview -w '*.html,*.css'     # reload on other globs
//! ```
//!
//! # Configuration
//!
//! Options are merged from built-in defaults, the `browser-sync` (or `bs`)
//! field of `package.json`, a local `bs-config.json` and finally the command
//! line.

/// CLI commands.
pub mod commands;
/// Layered configuration and invocation resolution.
pub mod config;
/// Development server with live reload.
pub mod server;
/// File system watching for live reload and regeneration.
pub mod watcher;
