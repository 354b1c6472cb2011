// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use clap::Parser;
use specview_cli::commands;
use specview_cli::config::Invocation;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "specview")]
#[command(author = "Maravilla Labs")]
#[command(version)]
#[command(about = "Live-reloading dev server with Bikeshed and Graphviz previews", long_about = None)]
struct Cli {
    /// File to open initially; its directory is the base for --root and --watch
    file: Option<PathBuf>,

    /// Project root to serve
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Verbose mode: diagnostic logging
    #[arg(short, long)]
    verbose: bool,

    /// Comma-separated globs that reload the browser on change
    /// [default: *.html,*.css,*.jpg,*.png,*.svg]
    #[arg(short, long, value_delimiter = ',')]
    watch: Option<Vec<String>>,

    /// Local config file [default: <root>/bs-config.json]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to run the server on
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with the specified log level
    let directives = if cli.verbose {
        "info,specview=debug,specview_cli=debug"
    } else {
        cli.log_level.as_str()
    };
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cwd = std::env::current_dir()?;
    let invocation = Invocation::resolve(
        cli.file.as_deref(),
        cli.root.as_deref(),
        cli.watch.as_deref(),
        cli.config.as_deref(),
        &cwd,
    );

    commands::dev::run(invocation, cli.port, cli.host).await
}
