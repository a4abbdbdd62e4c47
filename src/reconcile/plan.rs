//! Ordered mapping from original path to corrected name.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::model::LedgerEntry;
use crate::reconcile::resolve::{ResolvedName, pass_through};
use crate::reconcile::validate::Issue;

/// One planned rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRename {
    pub original_path: PathBuf,
    pub corrected_name: String,
}

/// Renames to perform, keyed by original path, in stable insertion order.
///
/// Built fresh for every run from the ledger and the issue resolution.
#[derive(Debug, Default, Clone)]
pub struct RenamePlan {
    entries: Vec<PlannedRename>,
    index: HashMap<PathBuf, usize>,
}

impl PlannedRename {
    /// Directory containing the original file.
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.original_path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Full path the file should end up at.
    #[must_use]
    pub fn target_path(&self) -> PathBuf {
        self.directory().join(&self.corrected_name)
    }
}

impl RenamePlan {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the plan in ledger order.
    ///
    /// Flagged entries use their resolved name and are left out if they have none.
    /// Entries without issues pass through with the suggested name.
    #[must_use]
    pub fn build(entries: &[LedgerEntry], issues: &[Issue], resolved: &[ResolvedName]) -> Self {
        let flagged: HashSet<&Path> = issues
            .iter()
            .map(|issue| issue.entry.original_path.as_path())
            .collect();
        let corrected: HashMap<&Path, &str> = resolved
            .iter()
            .map(|name| (name.original_path.as_path(), name.corrected_name.as_str()))
            .collect();

        let mut plan = Self::new();
        for entry in entries {
            let path = entry.original_path.as_path();
            if flagged.contains(path) {
                if let Some(name) = corrected.get(path) {
                    plan.insert(path.to_path_buf(), (*name).to_string());
                }
            } else if let Some(name) = pass_through(entry) {
                plan.insert(name.original_path, name.corrected_name);
            }
        }
        plan
    }

    /// Add a rename. A repeated original path replaces the earlier name but keeps its position.
    pub fn insert(&mut self, original_path: PathBuf, corrected_name: String) {
        if let Some(&position) = self.index.get(&original_path) {
            self.entries[position].corrected_name = corrected_name;
        } else {
            self.index.insert(original_path.clone(), self.entries.len());
            self.entries.push(PlannedRename {
                original_path,
                corrected_name,
            });
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlannedRename> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if the path is the original path of any planned rename.
    #[must_use]
    pub fn contains_original(&self, path: &Path) -> bool {
        self.index.contains_key(path)
    }

    /// All target paths of the plan.
    #[must_use]
    pub fn target_paths(&self) -> HashSet<PathBuf> {
        self.entries.iter().map(PlannedRename::target_path).collect()
    }
}

impl<'a> IntoIterator for &'a RenamePlan {
    type Item = &'a PlannedRename;
    type IntoIter = std::slice::Iter<'a, PlannedRename>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
