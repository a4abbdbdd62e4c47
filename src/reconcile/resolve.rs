//! Derive corrected names for flagged suggestions.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::model::LedgerEntry;
use crate::reconcile::validate::{INVALID_CHARACTERS, Issue};

/// Marker inserted before the extension of names that collide within a directory.
pub const DUPLICATE_MARKER: &str = "_duplicate";

/// Final name decision for one ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub original_path: PathBuf,
    pub original_name: String,
    pub recommended_name: Option<String>,
    pub corrected_name: String,
}

/// Output of conflict resolution.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Corrected names in issue order, one per entry.
    pub resolved: Vec<ResolvedName>,
    /// Entries without a usable suggestion. Left for a future run.
    pub skipped: Vec<LedgerEntry>,
}

impl Resolution {
    /// True when there is nothing to apply.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

/// Replace every invalid file name character with an underscore.
///
/// ```rust
/// use media_namer::reconcile::sanitize;
///
/// assert_eq!(sanitize("Show: Pilot?"), "Show_ Pilot_");
/// assert_eq!(sanitize(&sanitize("a/b")), sanitize("a/b"));
/// ```
#[must_use]
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if INVALID_CHARACTERS.contains(&c) { '_' } else { c })
        .collect()
}

/// Strip all trailing copies of `extension` from `name`.
///
/// Matching is case-sensitive. An empty extension leaves the name unchanged.
#[must_use]
pub fn strip_extension<'a>(name: &'a str, extension: &str) -> &'a str {
    if extension.is_empty() {
        return name;
    }
    let mut stem = name;
    while let Some(stripped) = stem.strip_suffix(extension) {
        stem = stripped;
    }
    stem
}

/// Make sure the name ends with `extension` exactly once.
///
/// ```rust
/// use media_namer::reconcile::ensure_extension;
///
/// assert_eq!(ensure_extension("Show", ".mkv"), "Show.mkv");
/// assert_eq!(ensure_extension("Show.mkv", ".mkv"), "Show.mkv");
/// assert_eq!(ensure_extension("Show.mkv.mkv", ".mkv"), "Show.mkv");
/// assert_eq!(ensure_extension("Show.avi", ".mkv"), "Show.avi.mkv");
/// ```
#[must_use]
pub fn ensure_extension(name: &str, extension: &str) -> String {
    format!("{}{extension}", strip_extension(name, extension))
}

/// Insert the duplicate marker before the extension, unless it is already there.
///
/// An extension-like suffix left in the suggestion stays after the marker.
/// The result always ends with `extension` exactly once.
///
/// ```rust
/// use media_namer::reconcile::apply_duplicate_marker;
///
/// assert_eq!(apply_duplicate_marker("Show (2021)", ".mkv"), "Show (2021)_duplicate.mkv");
/// assert_eq!(apply_duplicate_marker("Show (2021)_duplicate.mkv", ".mkv"), "Show (2021)_duplicate.mkv");
/// assert_eq!(apply_duplicate_marker("Show.avi", ".mkv"), "Show_duplicate.avi.mkv");
/// ```
#[must_use]
pub fn apply_duplicate_marker(name: &str, extension: &str) -> String {
    let stem = strip_extension(name, extension);
    let (base, suffix) = split_extension_suffix(stem);
    if base.ends_with(DUPLICATE_MARKER) {
        format!("{stem}{extension}")
    } else {
        format!("{base}{DUPLICATE_MARKER}{suffix}{extension}")
    }
}

/// Split a trailing `.ext` off the name.
///
/// Only ASCII alphanumeric suffixes with at least one letter count,
/// so names like `Vol. 2` or `Episode 1.5` stay whole.
fn split_extension_suffix(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(index) if index > 0 => {
            let suffix = &name[index + 1..];
            if !suffix.is_empty()
                && suffix.chars().all(|c| c.is_ascii_alphanumeric())
                && suffix.chars().any(|c| c.is_ascii_alphabetic())
            {
                name.split_at(index)
            } else {
                (name, "")
            }
        }
        _ => (name, ""),
    }
}

/// Derive corrected names for flagged entries.
///
/// Without consent nothing is resolved and the result is empty.
/// Multiple issues for the same entry are merged into one corrected name:
/// invalid characters are always replaced, and the duplicate marker is added
/// if any of the entry's issues is a duplicate.
/// Entries without a usable suggestion are returned in `skipped`.
#[must_use]
pub fn resolve(issues: &[Issue], consent: bool) -> Resolution {
    let mut resolution = Resolution::default();
    if !consent {
        return resolution;
    }

    let duplicates: HashSet<&Path> = issues
        .iter()
        .filter(|issue| issue.is_duplicate())
        .map(|issue| issue.entry.original_path.as_path())
        .collect();

    let mut seen: HashSet<&Path> = HashSet::new();
    for issue in issues {
        let entry = &issue.entry;
        if !seen.insert(entry.original_path.as_path()) {
            continue;
        }

        let Some(name) = entry.suggestion() else {
            resolution.skipped.push(entry.clone());
            continue;
        };
        let extension = entry.original_extension();
        let sanitized = sanitize(name);
        let corrected_name = if duplicates.contains(entry.original_path.as_path()) {
            apply_duplicate_marker(&sanitized, &extension)
        } else {
            ensure_extension(&sanitized, &extension)
        };

        resolution.resolved.push(ResolvedName::new(entry, corrected_name));
    }

    resolution
}

/// Corrected name for an entry without issues: the suggestion with the original extension.
///
/// Returns `None` if the entry has no usable suggestion.
#[must_use]
pub fn pass_through(entry: &LedgerEntry) -> Option<ResolvedName> {
    let name = entry.suggestion()?;
    let corrected_name = ensure_extension(name, &entry.original_extension());
    Some(ResolvedName::new(entry, corrected_name))
}

impl ResolvedName {
    fn new(entry: &LedgerEntry, corrected_name: String) -> Self {
        Self {
            original_path: entry.original_path.clone(),
            original_name: entry.original_name.clone(),
            recommended_name: entry.recommended_name.clone(),
            corrected_name,
        }
    }
}
