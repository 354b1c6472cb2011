// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Bikeshed adapter.
//!
//! Runs `bikeshed --die-on=nothing spec <source> -`, which writes the compiled
//! document to standard output. A Bikeshed checkout sitting next to the
//! project (`<root>/../bikeshed/bikeshed`) takes precedence over the one on
//! `PATH`, so spec editors can preview against an unreleased compiler.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use futures_util::future::BoxFuture;
use tokio::process::Command;

use super::Generator;
use crate::error::{PreviewError, Result};

const DEFAULT_PROGRAM: &str = "bikeshed";

/// Compiles Bikeshed sources with an external `bikeshed` executable.
#[derive(Debug, Clone)]
pub struct BikeshedGenerator {
    program: PathBuf,
}

impl BikeshedGenerator {
    /// Uses an explicit executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolves the executable for a project rooted at `root`.
    ///
    /// Prefers a sibling checkout at `<root>/../bikeshed/bikeshed`, falling
    /// back to `bikeshed` on `PATH`.
    pub fn locate(root: &Path) -> Self {
        match sibling_override(root) {
            Some(program) => {
                tracing::info!(program = %program.display(), "using sibling bikeshed checkout");
                Self::with_program(program)
            }
            None => Self::with_program(DEFAULT_PROGRAM),
        }
    }

    /// Returns the program that will be spawned.
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for BikeshedGenerator {
    fn default() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }
}

fn sibling_override(root: &Path) -> Option<PathBuf> {
    let candidate = root.parent()?.join("bikeshed").join(DEFAULT_PROGRAM);
    candidate.is_file().then_some(candidate)
}

impl Generator for BikeshedGenerator {
    fn generate(&self, source: &Path) -> BoxFuture<'static, Result<String>> {
        let program = self.program.clone();
        let source = source.to_path_buf();
        Box::pin(async move {
            let program_name = program.display().to_string();
            tracing::debug!(program = %program_name, source = %source.display(), "running bikeshed");

            let output = Command::new(&program)
                .arg("--die-on=nothing")
                .arg("spec")
                .arg(&source)
                .arg("-")
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|source| PreviewError::Spawn {
                    program: program_name.clone(),
                    source,
                })?;

            if !output.status.success() {
                return Err(PreviewError::ExitStatus {
                    program: program_name,
                    status: output.status,
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                });
            }

            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        })
    }
}
