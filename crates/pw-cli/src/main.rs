//! CLI entry point for plantuml-watch.
//!
//! This binary watches a directory of PlantUML sources and re-renders each
//! diagram whenever its source file is saved.
//!
//! # Usage
//!
//! ```bash
//! plantuml-watch [OPTIONS] [COMMAND]
//!
//! # Watch the current directory with the persisted configuration
//! plantuml-watch
//!
//! # Watch another directory, rendering SVG
//! plantuml-watch --watchdir docs/diagrams --format svg
//!
//! # Write a default .plantumlwatch into the current directory
//! plantuml-watch configure
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use pw_core::{ConfigLayer, ConfigResolver, WriteOutcome, write_default_config};
use pw_watcher::Watcher;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Watches PlantUML sources and regenerates diagrams on save.
///
/// Settings come from `~/.plantumlwatch`, then `./.plantumlwatch`, then the
/// options below. Options left unset never override a persisted value.
#[derive(Parser)]
#[command(name = "plantuml-watch", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute. Defaults to `watch`.
    #[command(subcommand)]
    command: Option<Commands>,

    /// Pass `-v` to the renderer and log debug output.
    #[arg(short, long, global = true, env = "PLANTUML_WATCH_VERBOSE")]
    verbose: bool,

    /// Java interpreter used to run the renderer.
    #[arg(short, long, global = true, env = "PLANTUML_WATCH_JAVA")]
    java: Option<Utf8PathBuf>,

    /// PlantUML renderer (a `.jar` is run with `-jar`).
    #[arg(short, long, global = true, env = "PLANTUML_WATCH_PLANTUML")]
    plantuml: Option<Utf8PathBuf>,

    /// Directory to watch for source changes.
    #[arg(short, long, global = true, env = "PLANTUML_WATCH_WATCHDIR")]
    watchdir: Option<Utf8PathBuf>,

    /// Extension of source files, without the leading dot.
    #[arg(short, long, global = true, env = "PLANTUML_WATCH_EXTENSION")]
    extension: Option<String>,

    /// Output directory for generated diagrams.
    #[arg(short, long, global = true, env = "PLANTUML_WATCH_OUTPUTDIR")]
    outputdir: Option<Utf8PathBuf>,

    /// Diagram format.
    #[arg(
        short,
        long,
        global = true,
        env = "PLANTUML_WATCH_FORMAT",
        value_parser = ["png", "svg"]
    )]
    format: Option<String>,

    /// Watch subdirectories too.
    #[arg(short, long, global = true, overrides_with = "no_recursive")]
    recursive: bool,

    /// Watch only the top-level directory.
    #[arg(long, global = true, overrides_with = "recursive")]
    no_recursive: bool,

    /// Configuration file to use in place of `./.plantumlwatch`.
    #[arg(short, long, global = true, env = "PLANTUML_WATCH_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Watch the configured directory and render modified sources.
    Watch,

    /// Write a default configuration file and exit.
    Configure,
}

impl Cli {
    /// Builds the override layer from the options that were given.
    fn overrides(&self) -> ConfigLayer {
        let recursive = if self.recursive {
            Some(true)
        } else if self.no_recursive {
            Some(false)
        } else {
            None
        };

        ConfigLayer {
            verbose: self.verbose.then_some(true),
            interpreter: self.java.clone(),
            renderer: self.plantuml.clone(),
            watch_dir: self.watchdir.clone(),
            extension: self.extension.clone(),
            output_dir: self.outputdir.clone(),
            format: self.format.clone(),
            recursive,
        }
    }
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default. Logs go
/// to stderr so that stdout carries only status lines.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},mio=warn,notify=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var_os("NO_COLOR").is_none();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Creates the resolver for the current working directory.
///
/// # Errors
///
/// Returns an error if the working directory cannot be determined or is not
/// valid UTF-8.
fn build_resolver(cli: &Cli) -> color_eyre::Result<ConfigResolver> {
    let working_dir = std::env::current_dir()?;
    let working_dir = Utf8PathBuf::from_path_buf(working_dir).map_err(|path| {
        color_eyre::eyre::eyre!("working directory is not valid UTF-8: {}", path.display())
    })?;

    let resolver = ConfigResolver::discover(&working_dir);
    Ok(match &cli.config {
        Some(path) => resolver.with_local_file(path.clone()),
        None => resolver,
    })
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Writes the default configuration document to the local-scope path.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
fn run_configure(resolver: &ConfigResolver) -> color_eyre::Result<()> {
    let Some(path) = resolver.local_file() else {
        return Err(color_eyre::eyre::eyre!("no configuration file location"));
    };

    let message = match write_default_config(path, resolver.defaults())? {
        WriteOutcome::Written(path) => format!("wrote configuration file: {path}"),
        WriteOutcome::AlreadyExists(path) => format!("configuration file exists: {path}"),
    };

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{message}")?;
    Ok(())
}

/// Runs a watch session until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the watcher fails to
/// start.
async fn run_watch(resolver: &ConfigResolver, overrides: &ConfigLayer) -> color_eyre::Result<()> {
    let config = resolver.resolve(overrides)?;
    info!(path = %config.watch_dir, format = %config.format, "Starting watch session");

    let mut watcher = Watcher::new(config);
    watcher.start().await?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    watcher.run(cancel).await?;
    Ok(())
}

/// Cancels `cancel` on Ctrl-C or, on Unix, SIGTERM.
async fn cancel_on_shutdown_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            Err(error) => {
                tracing::warn!(%error, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                info!("Received Ctrl-C, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl-C, shutting down");
    }

    cancel.cancel();
}

async fn run(cli: &Cli) -> color_eyre::Result<()> {
    let resolver = build_resolver(cli)?;

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Configure => run_configure(&resolver),
        Commands::Watch => run_watch(&resolver, &cli.overrides()).await,
    }
}

/// Process exit status for a failed run.
const FAILURE_STATUS: u8 = 1;

/// Writes `error` as a single `error: <message>` line and returns the
/// failure exit status.
fn report_failure(error: &color_eyre::Report, out: &mut impl Write) -> u8 {
    let message = error.to_string();
    let message = message.lines().collect::<Vec<_>>().join(" ");
    let _ = writeln!(out, "error: {message}");
    FAILURE_STATUS
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> ExitCode {
    // 1. Install color-eyre FIRST (before any potential panics)
    if let Err(error) = color_eyre::install() {
        return ExitCode::from(report_failure(&error, &mut std::io::stderr()));
    }

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Route to the command; any failure is a single error line
    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => ExitCode::from(report_failure(&error, &mut std::io::stderr())),
    }
}
