// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Graphviz adapter: `dot -Tsvg <source>`, wrapped in an HTML shell.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use futures_util::future::BoxFuture;
use tokio::process::Command;

use super::Generator;
use crate::error::{PreviewError, Result};

/// Lays out a graph with the external `dot` binary.
#[derive(Debug, Clone)]
pub struct DotGenerator {
    program: PathBuf,
}

impl DotGenerator {
    /// Uses `program` instead of `dot` from `PATH`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Returns the program that will be spawned.
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for DotGenerator {
    fn default() -> Self {
        Self::with_program("dot")
    }
}

impl Generator for DotGenerator {
    fn generate(&self, source: &Path) -> BoxFuture<'static, Result<String>> {
        let program = self.program.clone();
        let source = source.to_path_buf();
        Box::pin(async move {
            let program_name = program.display().to_string();
            tracing::debug!(program = %program_name, source = %source.display(), "running dot");

            let output = Command::new(&program)
                .arg("-Tsvg")
                .arg(&source)
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|source| PreviewError::Spawn {
                    program: program_name.clone(),
                    source,
                })?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                tracing::debug!(program = %program_name, %stderr, "dot failed");
                return Err(PreviewError::ExitStatus {
                    program: program_name,
                    status: output.status,
                    stderr,
                });
            }

            Ok(svg_document(&String::from_utf8_lossy(&output.stdout)))
        })
    }
}

/// Wraps SVG markup in a minimal HTML document.
pub fn svg_document(svg: &str) -> String {
    format!("<!DOCTYPE html>\n<body>\n{}</body>\n", svg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_svg_document_shell() {
        let svg = "<svg width=\"8pt\"><g/></svg>\n";
        assert_eq!(
            svg_document(svg),
            "<!DOCTYPE html>\n<body>\n<svg width=\"8pt\"><g/></svg>\n</body>\n"
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let generator = DotGenerator::with_program("specview-no-such-dot-binary");
        let err = generator
            .generate(Path::new("graph.dot"))
            .await
            .unwrap_err();

        assert!(matches!(err, PreviewError::Spawn { .. }));
        assert!(err.to_string().contains("specview-no-such-dot-binary"));
    }

    #[cfg(unix)]
    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_svg_output_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(
            dir.path(),
            "dot",
            r#"printf '<svg data-args="%s %s"></svg>\n' "$1" "$2""#,
        );
        let source = dir.path().join("graph.dot");

        let html = DotGenerator::with_program(&program)
            .generate(&source)
            .await
            .unwrap();

        assert_eq!(
            html,
            format!(
                "<!DOCTYPE html>\n<body>\n<svg data-args=\"-Tsvg {}\"></svg>\n</body>\n",
                source.display()
            )
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "baddot", "echo 'syntax error' >&2\nexit 1");

        let err = DotGenerator::with_program(&program)
            .generate(&dir.path().join("graph.dot"))
            .await
            .unwrap_err();

        match &err {
            PreviewError::ExitStatus { status, stderr, .. } => {
                assert_eq!(status.code(), Some(1));
                assert_eq!(stderr, "syntax error\n");
            }
            other => panic!("expected exit status error, got {:?}", other),
        }
        assert!(err.to_string().contains("baddot"));
    }
}
