// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Error types for preview generation.
//!
//! Generation errors never reach an HTTP client as a failed response. The
//! preview pipeline renders them into an error page and caches that page in
//! place of the content, so the `Display` output of [`PreviewError`] is what a
//! user eventually reads in the browser.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors produced while generating or watching preview sources.
#[derive(Error, Debug)]
pub enum PreviewError {
    /// The external tool could not be started (usually: not installed).
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        /// Program that was being spawned.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The external tool ran but reported failure.
    #[error("`{program}` exited with {status}\n{stderr}")]
    ExitStatus {
        /// Program that failed.
        program: String,
        /// Exit status reported by the OS.
        status: ExitStatus,
        /// Captured standard error output.
        stderr: String,
    },

    /// A generator failed with a free-form message.
    #[error("{0}")]
    Generation(String),

    /// A source file could not be registered with the file watcher.
    #[error("cannot watch {path}: {message}")]
    Watch {
        /// Source file that was being watched.
        path: PathBuf,
        /// Watcher error message.
        message: String,
    },
}

/// Result type alias for preview operations.
pub type Result<T> = std::result::Result<T, PreviewError>;
