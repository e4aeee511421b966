//! Filtering of change notifications.
//!
//! Only modifications to files carrying the configured source extension are
//! rendered. Creation events are ignored: a newly created file is expected to
//! be followed by a modification once its content is flushed.
//!
//! # Examples
//!
//! ```
//! use pw_watcher::{ChangeEvent, SourceFilter};
//!
//! let filter = SourceFilter::new("pu");
//!
//! assert!(filter.accepts(&ChangeEvent::modified("docs/seq.pu")));
//! assert!(!filter.accepts(&ChangeEvent::created("docs/seq.pu")));
//! assert!(!filter.accepts(&ChangeEvent::modified("docs/seq.pub")));
//! ```

use pw_core::EffectiveConfig;

use crate::events::{ChangeEvent, ChangeKind};

/// Returns `true` if `event` is a modification of a file ending in
/// `"." + extension`.
///
/// The suffix match is exact and case-sensitive.
#[must_use]
pub fn accept(event: &ChangeEvent, extension: &str) -> bool {
    event.kind == ChangeKind::Modified && has_suffix(event.path.as_str(), extension)
}

fn has_suffix(path: &str, extension: &str) -> bool {
    path.strip_suffix(extension)
        .is_some_and(|rest| rest.ends_with('.'))
}

/// A [`accept`] predicate bound to one source extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFilter {
    /// Extension without the leading dot.
    extension: String,
}

impl SourceFilter {
    /// Creates a filter for `extension` (without the leading dot).
    #[must_use]
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    /// Creates a filter for the session's source extension.
    #[must_use]
    pub fn from_config(config: &EffectiveConfig) -> Self {
        Self::new(config.extension.clone())
    }

    /// Returns the extension this filter accepts.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Returns `true` if the event should be rendered.
    #[inline]
    #[must_use]
    pub fn accepts(&self, event: &ChangeEvent) -> bool {
        accept(event, &self.extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_modified_source() {
        assert!(accept(&ChangeEvent::modified("diagram.pu"), "pu"));
        assert!(accept(&ChangeEvent::modified("/abs/dir/diagram.pu"), "pu"));
        assert!(accept(&ChangeEvent::modified("/abs/dir.pu/diagram.pu"), "pu"));
    }

    #[test]
    fn test_rejects_other_kinds() {
        assert!(!accept(&ChangeEvent::created("diagram.pu"), "pu"));
        assert!(!accept(&ChangeEvent::new("diagram.pu", ChangeKind::Other), "pu"));
    }

    #[test]
    fn test_rejects_near_miss_suffixes() {
        assert!(!accept(&ChangeEvent::modified("foo.pub"), "pu"));
        assert!(!accept(&ChangeEvent::modified("foopu"), "pu"));
        assert!(!accept(&ChangeEvent::modified("foo.apu"), "pu"));
        assert!(!accept(&ChangeEvent::modified("foo.pu.bak"), "pu"));
        assert!(!accept(&ChangeEvent::modified("pu"), "pu"));
    }

    #[test]
    fn test_suffix_is_case_sensitive() {
        assert!(!accept(&ChangeEvent::modified("diagram.PU"), "pu"));
        assert!(accept(&ChangeEvent::modified("diagram.PU"), "PU"));
    }

    #[test]
    fn test_multi_part_extension() {
        assert!(accept(&ChangeEvent::modified("seq.plant.uml"), "plant.uml"));
        assert!(!accept(&ChangeEvent::modified("seq.uml"), "plant.uml"));
    }

    #[test]
    fn test_source_filter() {
        let filter = SourceFilter::new("puml");
        assert_eq!(filter.extension(), "puml");
        assert!(filter.accepts(&ChangeEvent::modified("a/b.puml")));
        assert!(!filter.accepts(&ChangeEvent::modified("a/b.pu")));
    }
}
