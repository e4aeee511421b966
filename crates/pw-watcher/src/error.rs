//! Error types for the pw-watcher crate.
//!
//! - [`WatchError`] covers the watch session itself: subscribing to
//!   notifications, lifecycle misuse and teardown.
//! - [`RenderError`] covers a single render. It is always reported and never
//!   ends the session.

use camino::Utf8PathBuf;

use crate::watcher::WatcherState;

/// Errors that can occur while starting, running or stopping a watch session.
///
/// # Error Recovery Strategy
///
/// - **Notify errors** ([`WatchError::Notify`]): Fatal - the subscription cannot be created
/// - **Path not found** ([`WatchError::PathNotFound`]): Fatal - path must exist
/// - **Invalid state** ([`WatchError::InvalidState`]): Fatal - the watcher is not restartable
/// - **Channel closed** ([`WatchError::ChannelClosed`]): Fatal - communication broken
/// - **Non-UTF-8 path** ([`WatchError::NonUtf8Path`]): Recoverable - skip and continue
/// - **I/O errors** ([`WatchError::Io`]): Fatal - propagate immediately
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize or operate the notify watcher.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The specified path does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// A lifecycle operation was called in the wrong state.
    #[error("cannot {operation} a watcher that is {state}")]
    InvalidState {
        /// The operation that was attempted.
        operation: &'static str,
        /// The state the watcher was in.
        state: WatcherState,
    },

    /// The notification channel or task was lost unexpectedly.
    #[error("event channel closed unexpectedly")]
    ChannelClosed,

    /// A path in a notification is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Creates a new [`WatchError::NonUtf8Path`] error.
    #[inline]
    pub fn non_utf8_path(path: impl Into<std::path::PathBuf>) -> Self {
        Self::NonUtf8Path(path.into())
    }

    /// Returns `true` if this error is recoverable (watching can continue).
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonUtf8Path(_))
    }

    /// Returns `true` if this error is fatal (watching should stop).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

/// A failed render of one source file.
///
/// Both variants are reported per event; neither stops the watcher.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The renderer process could not be started.
    #[error("{0}")]
    Launch(#[source] std::io::Error),

    /// The renderer ran and exited with a non-zero code.
    #[error("exit code {code}")]
    ExitCode {
        /// The process exit code.
        code: i32,
    },

    /// The renderer was terminated by a signal before exiting.
    #[error("terminated by signal")]
    Signal,
}

impl RenderError {
    /// Returns `true` if the process never started.
    #[inline]
    #[must_use]
    pub const fn is_launch(&self) -> bool {
        matches!(self, Self::Launch(_))
    }

    /// Returns the exit code, if the process exited with one.
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ExitCode { code } => Some(*code),
            Self::Launch(_) | Self::Signal => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_watch_error_path_not_found() {
        let err = WatchError::path_not_found("diagrams/missing");
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "path does not exist: diagrams/missing");
    }

    #[test]
    fn test_watch_error_non_utf8_is_recoverable() {
        let err = WatchError::non_utf8_path(PathBuf::from("test"));
        assert!(err.is_recoverable());
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn test_watch_error_invalid_state() {
        let err = WatchError::InvalidState {
            operation: "start",
            state: WatcherState::Stopped,
        };
        assert!(err.is_fatal());
        insta::assert_snapshot!(err.to_string(), @"cannot start a watcher that is stopped");
    }

    #[test]
    fn test_render_error_display() {
        let err = RenderError::Launch(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        assert!(err.is_launch());
        assert_eq!(err.exit_code(), None);
        assert_eq!(err.to_string(), "no such file");

        let err = RenderError::ExitCode { code: 2 };
        assert!(!err.is_launch());
        assert_eq!(err.exit_code(), Some(2));
        assert_eq!(err.to_string(), "exit code 2");
    }
}
