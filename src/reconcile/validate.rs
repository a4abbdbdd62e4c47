//! Detect suggested names that cannot be applied as-is.

use std::fmt;

use itertools::Itertools;

use crate::model::LedgerEntry;

/// Characters that are not allowed in file names on common filesystems.
pub const INVALID_CHARACTERS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Problem found with a suggested name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    /// No name was suggested.
    EmptySuggestion,
    /// The name contains characters from [`INVALID_CHARACTERS`].
    InvalidCharacters { name: String },
    /// Another entry in the same directory has the exact same suggested name.
    DuplicateInDirectory { name: String },
}

/// A ledger entry together with one detected problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub entry: LedgerEntry,
    pub kind: IssueKind,
}

impl Issue {
    const fn new(entry: LedgerEntry, kind: IssueKind) -> Self {
        Self { entry, kind }
    }

    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self.kind, IssueKind::DuplicateInDirectory { .. })
    }
}

/// Check if the name contains any character that is invalid in file names.
#[must_use]
pub fn has_invalid_characters(name: &str) -> bool {
    name.chars().any(|c| INVALID_CHARACTERS.contains(&c))
}

/// Find all naming issues in a ledger snapshot.
///
/// Pure function of its input: the same snapshot always yields the same issues, in ledger order.
/// An empty suggestion is reported on its own.
/// A non-empty name is checked both for invalid characters and for duplicates,
/// so one entry can produce two issues.
/// Duplicates are symmetric: every entry sharing a name within a directory is flagged.
/// Repeated rows for the same original path count once.
#[must_use]
pub fn detect(entries: &[LedgerEntry]) -> Vec<Issue> {
    let name_counts = entries
        .iter()
        .filter_map(|entry| {
            entry
                .suggestion()
                .map(|name| (entry.directory(), name, entry.original_path.as_path()))
        })
        .unique()
        .map(|(directory, name, _)| (directory, name))
        .counts();

    let mut issues = Vec::new();
    for entry in entries {
        let Some(name) = entry.suggestion() else {
            issues.push(Issue::new(entry.clone(), IssueKind::EmptySuggestion));
            continue;
        };

        if has_invalid_characters(name) {
            issues.push(Issue::new(
                entry.clone(),
                IssueKind::InvalidCharacters { name: name.to_string() },
            ));
        }

        if name_counts.get(&(entry.directory(), name)).is_some_and(|&count| count > 1) {
            issues.push(Issue::new(
                entry.clone(),
                IssueKind::DuplicateInDirectory { name: name.to_string() },
            ));
        }
    }

    issues
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySuggestion => write!(f, "Recommended name is empty or not provided"),
            Self::InvalidCharacters { name } => write!(f, "Invalid characters in recommended name: {name}"),
            Self::DuplicateInDirectory { name } => {
                write!(f, "Duplicate recommended name in the same directory: {name} already exists")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;

    fn entry(path: &str, recommended: Option<&str>) -> LedgerEntry {
        let name = Path::new(path).file_name().unwrap().to_string_lossy().to_string();
        LedgerEntry::new(path, name, recommended)
    }

    #[test]
    fn clean_ledger_has_no_issues() {
        let entries = vec![entry("/m/a.mkv", Some("Show A")), entry("/m/b.mkv", Some("Show B"))];
        assert!(detect(&entries).is_empty());
    }

    #[test]
    fn empty_suggestion_takes_precedence() {
        let entries = vec![
            entry("/m/a.mkv", None),
            entry("/m/b.mkv", Some("")),
            entry("/m/c.mkv", Some("  ")),
        ];
        let issues = detect(&entries);
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|issue| issue.kind == IssueKind::EmptySuggestion));
    }

    #[test]
    fn empty_suggestions_are_not_duplicates_of_each_other() {
        let entries = vec![entry("/m/a.mkv", Some("")), entry("/m/b.mkv", Some(""))];
        let issues = detect(&entries);
        assert!(!issues.iter().any(Issue::is_duplicate));
    }

    #[test]
    fn each_invalid_character_is_detected() {
        for character in INVALID_CHARACTERS {
            let name = format!("Show{character}Name");
            let issues = detect(&[entry("/m/a.mkv", Some(&name))]);
            let expected = Issue::new(
                entry("/m/a.mkv", Some(&name)),
                IssueKind::InvalidCharacters { name: name.clone() },
            );
            assert_eq!(issues, vec![expected]);
        }
    }

    #[test]
    fn duplicates_in_same_directory_are_flagged_symmetrically() {
        let entries = vec![
            entry("/m/A.mkv", Some("Show (2021)")),
            entry("/m/B.mkv", Some("Show (2021)")),
        ];
        let issues = detect(&entries);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(Issue::is_duplicate));
        assert_eq!(issues[0].entry.original_name, "A.mkv");
        assert_eq!(issues[1].entry.original_name, "B.mkv");
    }

    #[test]
    fn repeated_row_is_not_its_own_duplicate() {
        let entries = vec![entry("/m/a.mkv", Some("Show")), entry("/m/a.mkv", Some("Show"))];
        assert!(detect(&entries).is_empty());

        let entries = vec![
            entry("/m/a.mkv", Some("Show")),
            entry("/m/a.mkv", Some("Show")),
            entry("/m/b.mkv", Some("Show")),
        ];
        let issues = detect(&entries);
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(Issue::is_duplicate));
    }

    #[test]
    fn same_name_in_different_directories_is_fine() {
        let entries = vec![
            entry("/m/one/A.mkv", Some("Show")),
            entry("/m/two/B.mkv", Some("Show")),
        ];
        assert!(detect(&entries).is_empty());
    }

    #[test]
    fn duplicate_comparison_is_exact() {
        let entries = vec![entry("/m/A.mkv", Some("Show")), entry("/m/B.mkv", Some("show"))];
        assert!(detect(&entries).is_empty());
    }

    #[test]
    fn invalid_and_duplicate_are_both_reported() {
        let entries = vec![entry("/m/A.mkv", Some("Show: Pilot")), entry("/m/B.mkv", Some("Show: Pilot"))];
        let issues = detect(&entries);
        assert_eq!(issues.len(), 4);
        assert!(matches!(issues[0].kind, IssueKind::InvalidCharacters { .. }));
        assert!(issues[1].is_duplicate());
    }

    #[test]
    fn detection_is_deterministic() {
        let entries = vec![
            entry("/m/A.mkv", Some("Show")),
            entry("/m/B.mkv", None),
            entry("/m/C.mkv", Some("Show")),
            entry("/m/D.mkv", Some("a|b")),
        ];
        assert_eq!(detect(&entries), detect(&entries));
    }

    #[test]
    fn issue_messages() {
        assert_eq!(
            IssueKind::EmptySuggestion.to_string(),
            "Recommended name is empty or not provided"
        );
        assert_eq!(
            IssueKind::InvalidCharacters { name: "a:b".to_string() }.to_string(),
            "Invalid characters in recommended name: a:b"
        );
    }
}
