//! Error types for the pw-core crate.
//!
//! This module provides the [`ConfigError`] type for failures that can occur
//! while reading, merging, validating, or writing configuration.

use camino::Utf8PathBuf;

/// Errors that can occur during configuration loading and validation.
///
/// Every variant is fatal at startup: a watch session never begins with a
/// partially resolved configuration.
///
/// # Examples
///
/// ```
/// use pw_core::ConfigError;
///
/// let error = ConfigError::validation("watchdir", "/missing", "directory does not exist");
/// assert_eq!(error.field(), Some("watchdir"));
/// assert!(error.to_string().contains("/missing"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A persisted configuration file exists but is not a valid document.
    #[error("configuration file '{path}' is not a valid json file: {source}")]
    Parse {
        /// The file that failed to parse.
        path: Utf8PathBuf,
        /// The underlying parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// A resolved configuration value fails an invariant.
    #[error("invalid {field} '{value}': {reason}")]
    Validation {
        /// The configuration key that failed validation.
        field: &'static str,
        /// The offending value, as resolved.
        value: String,
        /// Explanation of why the value is invalid.
        reason: String,
    },

    /// A configuration file exists but could not be read.
    #[error("failed to read configuration file '{path}': {source}")]
    Io {
        /// The file that could not be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The default configuration document could not be written.
    #[error("failed to write configuration file '{path}': {source}")]
    Write {
        /// The destination file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Creates a new [`ConfigError::Validation`] error.
    pub fn validation(
        field: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Validation {
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Returns the configuration key that failed validation, if any.
    #[must_use]
    pub const fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            Self::Parse { .. } | Self::Io { .. } | Self::Write { .. } => None,
        }
    }

    /// Returns the file associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Parse { path, .. } | Self::Io { path, .. } | Self::Write { path, .. } => {
                Some(path)
            }
            Self::Validation { .. } => None,
        }
    }

    /// Returns `true` if this error came from a malformed configuration file.
    #[inline]
    #[must_use]
    pub const fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}
