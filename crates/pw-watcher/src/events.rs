//! Change notifications.
//!
//! # Event Flow
//!
//! ```text
//! notify::Event (one or more paths)
//!        │
//!        ▼
//!   ChangeEvent per path (kind mapped, directories demoted to Other)
//!        │
//!        ▼
//!   mpsc channel -> Watcher run loop -> SourceFilter
//! ```

use camino::Utf8PathBuf;
use notify::EventKind;
use notify::event::ModifyKind;

use crate::error::WatchError;

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// File content or metadata changed.
    Modified,
    /// The path was created.
    Created,
    /// Anything else: removals, renames, access, directory events.
    Other,
}

impl ChangeKind {
    /// Maps a raw notify event kind.
    ///
    /// Renames are not modifications: the renamed file is expected to be
    /// followed by its own modification event once written.
    #[must_use]
    pub const fn from_notify(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => Self::Created,
            EventKind::Modify(ModifyKind::Name(_)) => Self::Other,
            EventKind::Modify(_) => Self::Modified,
            EventKind::Access(_) | EventKind::Remove(_) | EventKind::Any | EventKind::Other => {
                Self::Other
            }
        }
    }
}

/// A single filesystem notification for one path.
///
/// # Examples
///
/// ```
/// use pw_watcher::{ChangeEvent, ChangeKind};
/// use camino::Utf8PathBuf;
///
/// let event = ChangeEvent::modified("diagrams/seq.pu");
/// assert_eq!(event.kind, ChangeKind::Modified);
/// assert_eq!(event.path.as_str(), "diagrams/seq.pu");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// The path that changed.
    pub path: Utf8PathBuf,
    /// What happened to it.
    pub kind: ChangeKind,
}

impl ChangeEvent {
    /// Creates a new event.
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Creates a [`ChangeKind::Modified`] event.
    #[inline]
    #[must_use]
    pub fn modified(path: impl Into<Utf8PathBuf>) -> Self {
        Self::new(path, ChangeKind::Modified)
    }

    /// Creates a [`ChangeKind::Created`] event.
    #[inline]
    #[must_use]
    pub fn created(path: impl Into<Utf8PathBuf>) -> Self {
        Self::new(path, ChangeKind::Created)
    }

    /// Splits a notify event into one change event per path.
    ///
    /// Paths that currently name a directory are mapped to
    /// [`ChangeKind::Other`]. Paths that are not UTF-8 yield
    /// [`WatchError::NonUtf8Path`].
    pub fn from_notify(event: notify::Event) -> impl Iterator<Item = Result<Self, WatchError>> {
        let kind = ChangeKind::from_notify(&event.kind);
        event.paths.into_iter().map(move |path| {
            let path = Utf8PathBuf::from_path_buf(path).map_err(WatchError::non_utf8_path)?;
            let kind = if path.is_dir() { ChangeKind::Other } else { kind };
            Ok(Self { path, kind })
        })
    }
}
