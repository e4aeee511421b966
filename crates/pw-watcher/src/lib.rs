//! Directory watching and diagram rendering for PlantUML sources.
//!
//! This crate subscribes to filesystem notifications with the `notify`
//! crate, bridged to a tokio runtime, and re-renders every modified source
//! file by launching the renderer as a child process.
//!
//! # Overview
//!
//! A watch session is driven by a [`Watcher`]:
//!
//! - [`Subscription`] registers a notify watcher on the blocking pool and
//!   forwards [`ChangeEvent`]s over a bounded channel
//! - [`SourceFilter`] keeps only modifications of files with the configured
//!   extension
//! - [`RenderInvocation`] builds the renderer command line for a source file
//! - [`RenderRunner`] executes it and [`Reporter`] prints the outcome
//!
//! Events are handled strictly one at a time. A render failure is reported
//! and the session continues.
//!
//! # Crate Dependencies
//!
//! ```text
//! pw-cli ──► pw-watcher ──► pw-core
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use camino::Utf8Path;
//! use pw_core::{ConfigLayer, ConfigResolver};
//! use pw_watcher::Watcher;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigResolver::discover(Utf8Path::new("."))
//!         .resolve(&ConfigLayer::default())?;
//!
//!     let mut watcher = Watcher::new(config);
//!     watcher.start().await?;
//!
//!     let cancel = CancellationToken::new();
//!     let trigger = cancel.clone();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         trigger.cancel();
//!     });
//!
//!     watcher.run(cancel).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! [`WatchError`] covers subscription and lifecycle failures, all of which
//! end the session. [`RenderError`] covers a single failed render and is
//! only ever reported:
//!
//! ```
//! use pw_watcher::RenderError;
//!
//! let error = RenderError::ExitCode { code: 1 };
//! assert_eq!(error.to_string(), "exit code 1");
//! assert_eq!(error.exit_code(), Some(1));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod events;
pub mod filter;
pub mod report;
pub mod runner;
pub mod subscription;
pub mod watcher;

// Re-export error types
pub use error::{RenderError, WatchError};

// Re-export event and filter types
pub use events::{ChangeEvent, ChangeKind};
pub use filter::{SourceFilter, accept};

// Re-export rendering types
pub use command::{RenderInvocation, output_path};
pub use report::{LineReporter, RenderResult, Reporter};
pub use runner::{ProcessRunner, RenderRunner};

// Re-export watcher types
pub use subscription::Subscription;
pub use watcher::{Watcher, WatcherState};
