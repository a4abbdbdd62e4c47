//! Apply a rename plan to the live filesystem.
//!
//! Every decision is derived from the plan and the current state of the filesystem,
//! so an interrupted run can simply be started again.
//! An existing file is never overwritten.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::locator::MediaLocator;
use crate::reconcile::fs::{FileSystem, LocalFileSystem};
use crate::reconcile::plan::{PlannedRename, RenamePlan};
use crate::{normalize_name, path_to_file_stem_string, path_to_filename_string};

/// Terminal state of one planned rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// The original file was renamed to the target name.
    Renamed { from: PathBuf, to: PathBuf },
    /// A file renamed by an earlier run without its extension was moved to the target name.
    FixedExtension { from: PathBuf, to: PathBuf },
    /// A file renamed by an earlier run to an intermediate name was moved to the target name.
    Recovered { from: PathBuf, to: PathBuf },
    /// The target path is already occupied.
    SkippedConflict { source: PathBuf, target: PathBuf },
    /// Nothing left to do for this entry.
    AlreadyDone { original: PathBuf },
    /// The filesystem refused the operation.
    Failed { source: PathBuf, cause: String },
}

/// Counts and outcomes for one `apply` run.
#[derive(Debug, Default)]
pub struct RenameReport {
    pub outcomes: Vec<RenameOutcome>,
    /// Successful renames, including recoveries.
    pub renamed: usize,
    /// Renames that completed the work of an earlier run.
    pub recovered: usize,
    pub skipped_conflict: usize,
    pub already_done: usize,
    pub failed: usize,
    pub dryrun: bool,
}

/// Rename reconciliation engine.
#[derive(Debug, Default)]
pub struct Reconciler<F: FileSystem = LocalFileSystem> {
    fs: F,
    dryrun: bool,
    /// Decides which leftover files may be picked up by recovery.
    locator: MediaLocator,
    /// Files that recovery must never move, such as the ledger.
    protected: HashSet<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
enum Recovery {
    Extension,
    BaseName,
}

/// State for a single pass over the plan.
struct Run<'a, F: FileSystem> {
    fs: &'a F,
    plan: &'a RenamePlan,
    locator: &'a MediaLocator,
    protected: &'a HashSet<PathBuf>,
    targets: HashSet<PathBuf>,
    dryrun: bool,
    /// Sorted directory contents, dropped after a rename in that directory.
    listings: HashMap<PathBuf, Vec<String>>,
    /// Paths created by simulated renames.
    added: HashSet<PathBuf>,
    /// Paths vacated by simulated renames.
    removed: HashSet<PathBuf>,
}

impl Reconciler {
    /// Engine operating on the real filesystem.
    #[must_use]
    pub fn new(dryrun: bool) -> Self {
        Self::with_file_system(LocalFileSystem, dryrun)
    }
}

impl<F: FileSystem> Reconciler<F> {
    #[must_use]
    pub fn with_file_system(fs: F, dryrun: bool) -> Self {
        Self {
            fs,
            dryrun,
            locator: MediaLocator::default(),
            protected: HashSet::new(),
        }
    }

    /// Use the given media extensions when looking for leftovers of an earlier run.
    #[must_use]
    pub fn with_locator(mut self, locator: MediaLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Never move these files during recovery.
    #[must_use]
    pub fn with_protected<I>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
    {
        self.protected.extend(paths);
        self
    }

    /// Apply all planned renames in plan order.
    pub fn apply(&self, plan: &RenamePlan) -> RenameReport {
        self.apply_with(plan, |_, _| {})
    }

    /// Apply all planned renames in plan order, calling `on_outcome` after each entry.
    ///
    /// Entries are independent: a conflict or failure is recorded and the run continues.
    pub fn apply_with<C>(&self, plan: &RenamePlan, mut on_outcome: C) -> RenameReport
    where
        C: FnMut(&PlannedRename, &RenameOutcome),
    {
        let mut run = Run::new(self, plan);
        let mut report = RenameReport::new(self.dryrun);
        for rename in plan {
            let outcome = run.reconcile(rename);
            on_outcome(rename, &outcome);
            report.add(outcome);
        }
        report
    }
}

impl<'a, F: FileSystem> Run<'a, F> {
    fn new(reconciler: &'a Reconciler<F>, plan: &'a RenamePlan) -> Self {
        Self {
            fs: &reconciler.fs,
            plan,
            locator: &reconciler.locator,
            protected: &reconciler.protected,
            targets: plan.target_paths(),
            dryrun: reconciler.dryrun,
            listings: HashMap::new(),
            added: HashSet::new(),
            removed: HashSet::new(),
        }
    }

    fn reconcile(&mut self, rename: &PlannedRename) -> RenameOutcome {
        let source = &rename.original_path;
        let target = rename.target_path();

        if self.exists(source) {
            self.rename_direct(source, target)
        } else {
            self.recover(rename, target)
        }
    }

    fn rename_direct(&mut self, source: &Path, target: PathBuf) -> RenameOutcome {
        if source == target {
            return RenameOutcome::AlreadyDone {
                original: source.to_path_buf(),
            };
        }

        let case_only = self.is_case_only_change(source, &target);
        if self.exists(&target) && !case_only {
            return RenameOutcome::SkippedConflict {
                source: source.to_path_buf(),
                target,
            };
        }

        match self.move_file(source, &target, case_only) {
            Ok(()) => RenameOutcome::Renamed {
                from: source.to_path_buf(),
                to: target,
            },
            Err(error) => RenameOutcome::Failed {
                source: source.to_path_buf(),
                cause: error.to_string(),
            },
        }
    }

    /// The original file is gone: look for what an earlier run left behind.
    fn recover(&mut self, rename: &PlannedRename, target: PathBuf) -> RenameOutcome {
        let directory = rename.directory();
        let names = match self.list_dir(directory) {
            Ok(names) => names,
            Err(error) => {
                return RenameOutcome::Failed {
                    source: rename.original_path.clone(),
                    cause: format!("Failed to list {}: {error}", directory.display()),
                };
            }
        };

        let target_stem = file_stem(&rename.corrected_name);
        if let Some(found) = self.find_candidate(directory, &names, target_stem, &target) {
            return self.complete(found, target, Recovery::Extension, &rename.original_path);
        }

        let original_stem = path_to_file_stem_string(&rename.original_path);
        if let Some(found) = self.find_candidate(directory, &names, &original_stem, &target) {
            return self.complete(found, target, Recovery::BaseName, &rename.original_path);
        }

        RenameOutcome::AlreadyDone {
            original: rename.original_path.clone(),
        }
    }

    fn complete(&mut self, found: PathBuf, target: PathBuf, recovery: Recovery, original: &Path) -> RenameOutcome {
        if found == target {
            return RenameOutcome::AlreadyDone {
                original: original.to_path_buf(),
            };
        }
        if self.exists(&target) {
            return RenameOutcome::SkippedConflict { source: found, target };
        }

        match self.move_file(&found, &target, false) {
            Ok(()) => match recovery {
                Recovery::Extension => RenameOutcome::FixedExtension { from: found, to: target },
                Recovery::BaseName => RenameOutcome::Recovered { from: found, to: target },
            },
            Err(error) => RenameOutcome::Failed {
                source: found,
                cause: error.to_string(),
            },
        }
    }

    /// Find a file in `directory` whose name starts with `prefix`.
    ///
    /// Names are compared in composed Unicode form.
    /// The target itself wins if it matches.
    /// Files that belong to other planned renames and protected files are never picked.
    /// Other candidates must be the bare prefix, have no extension, or be media files.
    fn find_candidate(&self, directory: &Path, names: &[String], prefix: &str, target: &Path) -> Option<PathBuf> {
        if prefix.is_empty() {
            return None;
        }

        let prefix = normalize_name(prefix);
        let candidates: Vec<PathBuf> = names
            .iter()
            .map(|name| (normalize_name(name), directory.join(name)))
            .filter(|(name, _)| name.starts_with(&prefix))
            .filter(|(name, path)| path == target || *name == prefix || self.is_leftover_media(path))
            .map(|(_, path)| path)
            .filter(|path| !self.protected.contains(path))
            .filter(|path| !self.plan.contains_original(path))
            .filter(|path| path == target || !self.targets.contains(path))
            .filter(|path| self.is_file(path))
            .collect();

        candidates
            .iter()
            .find(|path| *path == target)
            .or_else(|| candidates.first())
            .cloned()
    }

    /// A partially renamed file either lost its extension or kept a media extension.
    fn is_leftover_media(&self, path: &Path) -> bool {
        path.extension().is_none() || self.locator.is_media_file(path)
    }

    /// Target differs from the source only by letter case and points to the same file.
    fn is_case_only_change(&self, source: &Path, target: &Path) -> bool {
        let source_name = path_to_filename_string(source);
        let target_name = path_to_filename_string(target);
        source_name != target_name
            && source_name.to_lowercase() == target_name.to_lowercase()
            && !self.added.contains(target)
            && self.fs.is_same_file(source, target)
    }

    fn exists(&self, path: &Path) -> bool {
        !self.removed.contains(path) && (self.added.contains(path) || self.fs.exists(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        !self.removed.contains(path) && (self.added.contains(path) || self.fs.is_file(path))
    }

    fn list_dir(&mut self, directory: &Path) -> io::Result<Vec<String>> {
        if !self.listings.contains_key(directory) {
            let mut names = self.fs.list_dir(directory)?;
            names.sort_unstable();
            self.listings.insert(directory.to_path_buf(), names);
        }
        let mut names = self.listings.get(directory).cloned().unwrap_or_default();

        if self.dryrun {
            names.retain(|name| !self.removed.contains(&directory.join(name)));
            names.extend(
                self.added
                    .iter()
                    .filter(|path| path.parent() == Some(directory))
                    .map(|path| path_to_filename_string(path)),
            );
            names.sort_unstable();
            names.dedup();
        }
        Ok(names)
    }

    fn move_file(&mut self, from: &Path, to: &Path, case_only: bool) -> io::Result<()> {
        if self.dryrun {
            self.added.remove(from);
            self.removed.insert(from.to_path_buf());
            self.removed.remove(to);
            self.added.insert(to.to_path_buf());
            return Ok(());
        }

        if case_only {
            self.rename_with_temp_file(from, to)?;
        } else {
            self.fs.rename(from, to)?;
        }
        if let Some(directory) = to.parent() {
            self.listings.remove(directory);
        }
        if let Some(directory) = from.parent() {
            self.listings.remove(directory);
        }
        Ok(())
    }

    /// Case-insensitive filesystems need an intermediate name for a case-only rename.
    fn rename_with_temp_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut temp_name = to.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_file = PathBuf::from(temp_name);
        if self.fs.exists(&temp_file) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("temporary file {} already exists", temp_file.display()),
            ));
        }
        self.fs.rename(from, &temp_file)?;
        self.fs.rename(&temp_file, to)
    }
}

/// Name without its last extension.
fn file_stem(name: &str) -> &str {
    Path::new(name).file_stem().and_then(|stem| stem.to_str()).unwrap_or(name)
}

impl RenameOutcome {
    /// Short classification used in logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Renamed { .. } => "RENAMED",
            Self::FixedExtension { .. } => "FIXED-EXT",
            Self::Recovered { .. } => "RECOVERED",
            Self::SkippedConflict { .. } => "CONFLICT",
            Self::AlreadyDone { .. } => "DONE",
            Self::Failed { .. } => "FAILED",
        }
    }

    /// True if a file was (or in a dry run would be) moved.
    #[must_use]
    pub const fn is_rename(&self) -> bool {
        matches!(
            self,
            Self::Renamed { .. } | Self::FixedExtension { .. } | Self::Recovered { .. }
        )
    }
}

impl RenameReport {
    const fn new(dryrun: bool) -> Self {
        Self {
            outcomes: Vec::new(),
            renamed: 0,
            recovered: 0,
            skipped_conflict: 0,
            already_done: 0,
            failed: 0,
            dryrun,
        }
    }

    fn add(&mut self, outcome: RenameOutcome) {
        match &outcome {
            RenameOutcome::Renamed { .. } => self.renamed += 1,
            RenameOutcome::FixedExtension { .. } | RenameOutcome::Recovered { .. } => {
                self.renamed += 1;
                self.recovered += 1;
            }
            RenameOutcome::SkippedConflict { .. } => self.skipped_conflict += 1,
            RenameOutcome::AlreadyDone { .. } => self.already_done += 1,
            RenameOutcome::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn print_summary(&self) {
        let header = if self.dryrun {
            "\n--- Rename Summary (dryrun) ---"
        } else {
            "\n--- Rename Summary ---"
        };
        println!("{}", header.bold().magenta());
        println!("Renamed:            {}", self.renamed);
        if self.recovered > 0 {
            println!("  - Recovered:      {}", self.recovered);
        }
        println!(
            "Conflicts skipped:  {}",
            if self.skipped_conflict > 0 {
                self.skipped_conflict.to_string().yellow()
            } else {
                "0".normal()
            }
        );
        println!("Already done:       {}", self.already_done);
        println!(
            "Failed:             {}",
            if self.failed > 0 {
                self.failed.to_string().red()
            } else {
                "0".normal()
            }
        );
        println!("{self}");
    }
}

impl fmt::Display for RenameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Renamed { from, to } => write!(f, "Renamed: {} -> {}", from.display(), to.display()),
            Self::FixedExtension { from, to } => write!(
                f,
                "Fixed extension for previously renamed file: {} -> {}",
                from.display(),
                to.display()
            ),
            Self::Recovered { from, to } => write!(
                f,
                "Recovered previously modified file: {} -> {}",
                from.display(),
                to.display()
            ),
            Self::SkippedConflict { target, .. } => {
                write!(f, "Target name already exists, skipping: {}", target.display())
            }
            Self::AlreadyDone { original } => write!(
                f,
                "Original file not found at {}, it may have already been renamed",
                original.display()
            ),
            Self::Failed { source, cause } => write!(f, "Error renaming {}: {cause}", source.display()),
        }
    }
}

impl fmt::Display for RenameReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Renaming summary: {} renamed ({} recovered), {} conflicts skipped, {} already done, {} failed",
            self.renamed, self.recovered, self.skipped_conflict, self.already_done, self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::fs;

    use tempfile::TempDir;

    /// Local filesystem that refuses to rename the given source files.
    struct FailingFileSystem {
        fail_sources: Vec<PathBuf>,
    }

    impl FileSystem for FailingFileSystem {
        fn exists(&self, path: &Path) -> bool {
            LocalFileSystem.exists(path)
        }

        fn is_file(&self, path: &Path) -> bool {
            LocalFileSystem.is_file(path)
        }

        fn list_dir(&self, directory: &Path) -> io::Result<Vec<String>> {
            LocalFileSystem.list_dir(directory)
        }

        fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
            if self.fail_sources.iter().any(|path| path == from) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"));
            }
            LocalFileSystem.rename(from, to)
        }

        fn is_same_file(&self, a: &Path, b: &Path) -> bool {
            LocalFileSystem.is_same_file(a, b)
        }
    }

    /// Local filesystem that matches names case-insensitively, like the macOS and Windows defaults.
    #[derive(Default)]
    struct CaseInsensitiveFileSystem {
        renames: RefCell<Vec<(PathBuf, PathBuf)>>,
    }

    impl CaseInsensitiveFileSystem {
        fn find(path: &Path) -> Option<PathBuf> {
            let directory = path.parent()?;
            let name = path_to_filename_string(path).to_lowercase();
            LocalFileSystem
                .list_dir(directory)
                .ok()?
                .into_iter()
                .find(|existing| existing.to_lowercase() == name)
                .map(|existing| directory.join(existing))
        }
    }

    impl FileSystem for CaseInsensitiveFileSystem {
        fn exists(&self, path: &Path) -> bool {
            Self::find(path).is_some()
        }

        fn is_file(&self, path: &Path) -> bool {
            Self::find(path).is_some_and(|found| found.is_file())
        }

        fn list_dir(&self, directory: &Path) -> io::Result<Vec<String>> {
            LocalFileSystem.list_dir(directory)
        }

        fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
            self.renames.borrow_mut().push((from.to_path_buf(), to.to_path_buf()));
            LocalFileSystem.rename(from, to)
        }

        fn is_same_file(&self, a: &Path, b: &Path) -> bool {
            matches!((Self::find(a), Self::find(b)), (Some(first), Some(second)) if first == second)
        }
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, name).unwrap();
        path
    }

    fn plan(dir: &Path, renames: &[(&str, &str)]) -> RenamePlan {
        let mut plan = RenamePlan::new();
        for (original, corrected) in renames {
            plan.insert(dir.join(original), (*corrected).to_string());
        }
        plan
    }

    fn file_names(dir: &Path) -> Vec<String> {
        let mut names = LocalFileSystem.list_dir(dir).unwrap();
        names.sort();
        names
    }

    #[test]
    fn renames_existing_file() {
        let temp = TempDir::new().unwrap();
        let source = touch(temp.path(), "ep01.mkv");
        let plan = plan(temp.path(), &[("ep01.mkv", "Show S1 EP01.mkv")]);

        let report = Reconciler::new(false).apply(&plan);

        assert_eq!(
            report.outcomes,
            vec![RenameOutcome::Renamed {
                from: source,
                to: temp.path().join("Show S1 EP01.mkv"),
            }]
        );
        assert_eq!(report.renamed, 1);
        assert_eq!(file_names(temp.path()), vec!["Show S1 EP01.mkv"]);
    }

    #[test]
    fn never_overwrites_existing_target() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "ep01.mkv");
        let existing = touch(temp.path(), "Show.mkv");
        let plan = plan(temp.path(), &[("ep01.mkv", "Show.mkv")]);

        let report = Reconciler::new(false).apply(&plan);

        assert!(matches!(report.outcomes[0], RenameOutcome::SkippedConflict { .. }));
        assert_eq!(report.skipped_conflict, 1);
        assert_eq!(report.renamed, 0);
        assert_eq!(fs::read_to_string(&existing).unwrap(), "Show.mkv");
        assert_eq!(
            fs::read_to_string(temp.path().join("ep01.mkv")).unwrap(),
            "ep01.mkv"
        );
    }

    #[test]
    fn first_duplicate_wins_and_second_conflicts() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "A.mkv");
        touch(temp.path(), "B.mkv");
        let plan = plan(
            temp.path(),
            &[("A.mkv", "Show (2021)_duplicate.mkv"), ("B.mkv", "Show (2021)_duplicate.mkv")],
        );

        let report = Reconciler::new(false).apply(&plan);

        assert!(matches!(report.outcomes[0], RenameOutcome::Renamed { .. }));
        assert!(matches!(report.outcomes[1], RenameOutcome::SkippedConflict { .. }));
        assert_eq!(file_names(temp.path()), vec!["B.mkv", "Show (2021)_duplicate.mkv"]);
        assert_eq!(
            fs::read_to_string(temp.path().join("Show (2021)_duplicate.mkv")).unwrap(),
            "A.mkv"
        );
    }

    #[test]
    fn second_run_is_a_no_op() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a.mkv");
        touch(temp.path(), "b.avi");
        let plan = plan(temp.path(), &[("a.mkv", "Alpha.mkv"), ("b.avi", "Beta.avi")]);
        let reconciler = Reconciler::new(false);

        let first = reconciler.apply(&plan);
        assert_eq!(first.renamed, 2);
        let after_first = file_names(temp.path());

        let second = reconciler.apply(&plan);
        assert_eq!(second.already_done, 2);
        assert_eq!(second.renamed, 0);
        assert_eq!(file_names(temp.path()), after_first);
    }

    #[test]
    fn target_already_in_place_is_done() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "Show Title.avi");
        let plan = plan(temp.path(), &[("X.avi", "Show Title.avi")]);

        let report = Reconciler::new(false).apply(&plan);

        assert_eq!(
            report.outcomes,
            vec![RenameOutcome::AlreadyDone {
                original: temp.path().join("X.avi"),
            }]
        );
        assert_eq!(file_names(temp.path()), vec!["Show Title.avi"]);
    }

    #[test]
    fn recovers_file_renamed_without_extension() {
        let temp = TempDir::new().unwrap();
        let partial = touch(temp.path(), "Show Title");
        let plan = plan(temp.path(), &[("ep01.mkv", "Show Title.mkv")]);

        let report = Reconciler::new(false).apply(&plan);

        assert_eq!(
            report.outcomes,
            vec![RenameOutcome::FixedExtension {
                from: partial,
                to: temp.path().join("Show Title.mkv"),
            }]
        );
        assert_eq!(report.renamed, 1);
        assert_eq!(report.recovered, 1);
        assert_eq!(file_names(temp.path()), vec!["Show Title.mkv"]);
    }

    #[test]
    fn recovers_file_with_intermediate_name() {
        let temp = TempDir::new().unwrap();
        let partial = touch(temp.path(), "ep01_tmp.mkv");
        let plan = plan(temp.path(), &[("ep01.mkv", "Show.mkv")]);

        let report = Reconciler::new(false).apply(&plan);

        assert_eq!(
            report.outcomes,
            vec![RenameOutcome::Recovered {
                from: partial,
                to: temp.path().join("Show.mkv"),
            }]
        );
        assert_eq!(file_names(temp.path()), vec!["Show.mkv"]);
    }

    #[test]
    fn recovery_does_not_overwrite_occupied_target() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "Show");
        fs::create_dir(temp.path().join("Show.mkv")).unwrap();
        let plan = plan(temp.path(), &[("ep01.mkv", "Show.mkv")]);

        let report = Reconciler::new(false).apply(&plan);

        assert_eq!(
            report.outcomes,
            vec![RenameOutcome::SkippedConflict {
                source: temp.path().join("Show"),
                target: temp.path().join("Show.mkv"),
            }]
        );
        assert!(temp.path().join("Show").is_file());
    }

    #[test]
    fn recovery_ignores_files_of_other_entries() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "Show 2.mkv");
        let plan = plan(temp.path(), &[("ep01.mkv", "Show.mkv"), ("Show 2.mkv", "Other.mkv")]);

        let report = Reconciler::new(false).apply(&plan);

        assert!(matches!(report.outcomes[0], RenameOutcome::AlreadyDone { .. }));
        assert!(matches!(report.outcomes[1], RenameOutcome::Renamed { .. }));
        assert_eq!(file_names(temp.path()), vec!["Other.mkv"]);
    }

    #[test]
    fn missing_file_without_candidates_is_done() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "unrelated.mkv");
        let plan = plan(temp.path(), &[("ep01.mkv", "Show.mkv")]);

        let report = Reconciler::new(false).apply(&plan);

        assert_eq!(report.already_done, 1);
        assert_eq!(file_names(temp.path()), vec!["unrelated.mkv"]);
    }

    #[test]
    fn directory_listing_is_refreshed_after_rename() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a.mkv");
        let plan = plan(
            temp.path(),
            &[("gone.mkv", "Gone.mkv"), ("a.mkv", "Show.mkv"), ("b.mkv", "Show.mkv")],
        );

        let report = Reconciler::new(false).apply(&plan);

        assert!(matches!(report.outcomes[0], RenameOutcome::AlreadyDone { .. }));
        assert!(matches!(report.outcomes[1], RenameOutcome::Renamed { .. }));
        assert!(matches!(report.outcomes[2], RenameOutcome::AlreadyDone { .. }));
        assert_eq!(file_names(temp.path()), vec!["Show.mkv"]);
    }

    #[test]
    fn failure_is_isolated_to_one_entry() {
        let temp = TempDir::new().unwrap();
        let locked = touch(temp.path(), "a.mkv");
        touch(temp.path(), "b.mkv");
        let plan = plan(temp.path(), &[("a.mkv", "Alpha.mkv"), ("b.mkv", "Beta.mkv")]);
        let reconciler = Reconciler::with_file_system(
            FailingFileSystem {
                fail_sources: vec![locked.clone()],
            },
            false,
        );

        let report = reconciler.apply(&plan);

        assert_eq!(
            report.outcomes[0],
            RenameOutcome::Failed {
                source: locked,
                cause: "permission denied".to_string(),
            }
        );
        assert!(matches!(report.outcomes[1], RenameOutcome::Renamed { .. }));
        assert_eq!(report.failed, 1);
        assert_eq!(report.renamed, 1);
        assert_eq!(file_names(temp.path()), vec!["Beta.mkv", "a.mkv"]);
    }

    #[test]
    fn failed_recovery_rename_does_not_stop_the_run() {
        let temp = TempDir::new().unwrap();
        let partial = touch(temp.path(), "Show Title");
        touch(temp.path(), "b.mkv");
        let plan = plan(temp.path(), &[("ep01.mkv", "Show Title.mkv"), ("b.mkv", "Beta.mkv")]);
        let reconciler = Reconciler::with_file_system(
            FailingFileSystem {
                fail_sources: vec![partial.clone()],
            },
            false,
        );

        let report = reconciler.apply(&plan);

        assert_eq!(
            report.outcomes[0],
            RenameOutcome::Failed {
                source: partial,
                cause: "permission denied".to_string(),
            }
        );
        assert!(matches!(report.outcomes[1], RenameOutcome::Renamed { .. }));
        assert_eq!(report.failed, 1);
        assert_eq!(report.recovered, 0);
        assert_eq!(file_names(temp.path()), vec!["Beta.mkv", "Show Title"]);
    }

    #[test]
    fn case_only_rename_goes_through_temp_file() {
        let temp = TempDir::new().unwrap();
        let source = touch(temp.path(), "show.mkv");
        let target = temp.path().join("Show.mkv");
        let temp_file = temp.path().join("Show.mkv.tmp");
        let plan = plan(temp.path(), &[("show.mkv", "Show.mkv")]);
        let reconciler = Reconciler::with_file_system(CaseInsensitiveFileSystem::default(), false);

        let report = reconciler.apply(&plan);

        assert_eq!(
            report.outcomes,
            vec![RenameOutcome::Renamed {
                from: source.clone(),
                to: target.clone(),
            }]
        );
        assert_eq!(
            *reconciler.fs.renames.borrow(),
            vec![(source, temp_file.clone()), (temp_file, target)]
        );
        assert_eq!(file_names(temp.path()), vec!["Show.mkv"]);
    }

    #[test]
    fn case_only_rename_fails_if_temp_file_exists() {
        let temp = TempDir::new().unwrap();
        let source = touch(temp.path(), "show.mkv");
        touch(temp.path(), "Show.mkv.tmp");
        let plan = plan(temp.path(), &[("show.mkv", "Show.mkv")]);
        let reconciler = Reconciler::with_file_system(CaseInsensitiveFileSystem::default(), false);

        let report = reconciler.apply(&plan);

        assert_eq!(report.failed, 1);
        assert!(
            matches!(&report.outcomes[0], RenameOutcome::Failed { source: failed, cause } if *failed == source && cause.contains("already exists"))
        );
        assert!(reconciler.fs.renames.borrow().is_empty());
        assert_eq!(file_names(temp.path()), vec!["Show.mkv.tmp", "show.mkv"]);
    }

    #[test]
    fn different_name_on_case_insensitive_filesystem_still_conflicts() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a.mkv");
        touch(temp.path(), "show.mkv");
        let plan = plan(temp.path(), &[("a.mkv", "Show.mkv")]);
        let reconciler = Reconciler::with_file_system(CaseInsensitiveFileSystem::default(), false);

        let report = reconciler.apply(&plan);

        assert_eq!(report.skipped_conflict, 1);
        assert!(reconciler.fs.renames.borrow().is_empty());
    }

    #[test]
    fn ledger_is_never_recovered() {
        let temp = TempDir::new().unwrap();
        let ledger = touch(temp.path(), "media_naming_report.csv");
        let plan = plan(temp.path(), &[("media.mp4", "Clip.mp4")]);

        let report = Reconciler::new(false).with_protected([ledger.clone()]).apply(&plan);

        assert_eq!(
            report.outcomes,
            vec![RenameOutcome::AlreadyDone {
                original: temp.path().join("media.mp4"),
            }]
        );
        assert!(ledger.is_file());
        assert_eq!(file_names(temp.path()), vec!["media_naming_report.csv"]);
    }

    #[test]
    fn protected_media_file_is_never_recovered() {
        let temp = TempDir::new().unwrap();
        let protected = touch(temp.path(), "media_sample.mp4");
        let plan = plan(temp.path(), &[("media.mp4", "Clip.mp4")]);

        let report = Reconciler::new(false).with_protected([protected]).apply(&plan);

        assert_eq!(report.already_done, 1);
        assert_eq!(file_names(temp.path()), vec!["media_sample.mp4"]);
    }

    #[test]
    fn sidecar_files_are_never_recovered() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "ep01.srt");
        touch(temp.path(), "ep01.nfo");
        let plan = plan(temp.path(), &[("ep01.mkv", "Show S01E01.mkv")]);

        let report = Reconciler::new(false).apply(&plan);

        assert_eq!(report.already_done, 1);
        assert_eq!(file_names(temp.path()), vec!["ep01.nfo", "ep01.srt"]);
    }

    #[test]
    fn media_leftover_is_preferred_over_sidecar() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "ep01.srt");
        let partial = touch(temp.path(), "ep01_part.mkv");
        let plan = plan(temp.path(), &[("ep01.mkv", "Show S01E01.mkv")]);

        let report = Reconciler::new(false).apply(&plan);

        assert_eq!(
            report.outcomes,
            vec![RenameOutcome::Recovered {
                from: partial,
                to: temp.path().join("Show S01E01.mkv"),
            }]
        );
        assert_eq!(file_names(temp.path()), vec!["Show S01E01.mkv", "ep01.srt"]);
    }

    #[test]
    fn extra_extensions_allow_recovery() {
        let temp = TempDir::new().unwrap();
        let partial = touch(temp.path(), "ep01_part.webm");
        let plan = plan(temp.path(), &[("ep01.webm", "Show.webm")]);

        let skipped = Reconciler::new(false).apply(&plan);
        assert_eq!(skipped.already_done, 1);

        let report = Reconciler::new(false)
            .with_locator(MediaLocator::new(&["webm".to_string()]))
            .apply(&plan);
        assert_eq!(
            report.outcomes,
            vec![RenameOutcome::Recovered {
                from: partial,
                to: temp.path().join("Show.webm"),
            }]
        );
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn recovery_matches_decomposed_names() {
        let temp = TempDir::new().unwrap();
        let partial = touch(temp.path(), "Ha\u{30a}kon");
        let plan = plan(temp.path(), &[("ep01.mkv", "H\u{e5}kon.mkv")]);

        let report = Reconciler::new(false).apply(&plan);

        assert_eq!(
            report.outcomes,
            vec![RenameOutcome::FixedExtension {
                from: partial,
                to: temp.path().join("H\u{e5}kon.mkv"),
            }]
        );
    }

    #[test]
    fn missing_directory_fails_entry() {
        let temp = TempDir::new().unwrap();
        let mut plan = RenamePlan::new();
        plan.insert(temp.path().join("missing").join("a.mkv"), "A.mkv".to_string());

        let report = Reconciler::new(false).apply(&plan);

        assert_eq!(report.failed, 1);
        assert!(matches!(report.outcomes[0], RenameOutcome::Failed { .. }));
    }

    #[test]
    fn dryrun_reports_without_touching_files() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "A.mkv");
        touch(temp.path(), "B.mkv");
        touch(temp.path(), "Show Title");
        let plan = plan(
            temp.path(),
            &[
                ("A.mkv", "Show_duplicate.mkv"),
                ("B.mkv", "Show_duplicate.mkv"),
                ("ep01.mkv", "Show Title.mkv"),
            ],
        );
        let before = file_names(temp.path());

        let report = Reconciler::new(true).apply(&plan);

        assert!(report.dryrun);
        assert!(matches!(report.outcomes[0], RenameOutcome::Renamed { .. }));
        assert!(matches!(report.outcomes[1], RenameOutcome::SkippedConflict { .. }));
        assert!(matches!(report.outcomes[2], RenameOutcome::FixedExtension { .. }));
        assert_eq!(file_names(temp.path()), before);
    }

    #[test]
    fn callback_sees_every_entry() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a.mkv");
        let plan = plan(temp.path(), &[("a.mkv", "A.mkv"), ("missing.mkv", "M.mkv")]);

        let mut labels = Vec::new();
        let report = Reconciler::new(false).apply_with(&plan, |_, outcome| labels.push(outcome.label()));

        assert_eq!(labels, vec!["RENAMED", "DONE"]);
        assert_eq!(report.total(), 2);
    }

    #[test]
    fn summary_line() {
        let mut report = RenameReport::new(false);
        report.add(RenameOutcome::Renamed {
            from: PathBuf::from("/m/a.mkv"),
            to: PathBuf::from("/m/A.mkv"),
        });
        report.add(RenameOutcome::Recovered {
            from: PathBuf::from("/m/b_tmp.mkv"),
            to: PathBuf::from("/m/B.mkv"),
        });
        report.add(RenameOutcome::AlreadyDone {
            original: PathBuf::from("/m/c.mkv"),
        });
        assert_eq!(
            report.to_string(),
            "Renaming summary: 2 renamed (1 recovered), 0 conflicts skipped, 1 already done, 0 failed"
        );
    }
}
