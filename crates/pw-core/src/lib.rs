//! Configuration resolution and validation for plantuml-watch.
//!
//! This crate owns everything that happens before a watch session starts:
//!
//! - [`ConfigValues`] and [`ConfigLayer`] for defaults, persisted documents
//!   and command-line overrides
//! - [`ConfigResolver`] to merge them in precedence order and validate
//! - [`EffectiveConfig`], the immutable result consumed by the watcher
//! - [`ConfigError`] for every startup-time failure
//!
//! # Precedence
//!
//! ```text
//! built-in defaults  <  ~/.plantumlwatch  <  ./.plantumlwatch  <  overrides
//! ```
//!
//! Each stage replaces only the keys it defines.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod resolver;

pub use config::{CONFIG_FILE_NAME, ConfigLayer, ConfigValues, EffectiveConfig, OutputFormat};
pub use error::ConfigError;
pub use resolver::{ConfigResolver, WriteOutcome, local_config_path, write_default_config};
