use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use media_namer::backup::backup_file_names;
use media_namer::ledger::{LedgerWriter, read_ledger};
use media_namer::locator::MediaLocator;
use media_namer::model::{LedgerEntry, MediaEntry};
use media_namer::oracle::{ChatOracle, SuggestionOutcome, suggest_name};
use media_namer::reconcile::{Issue, Reconciler, RenameOutcome, RenamePlan, Resolution, detect, resolve};
use media_namer::{get_relative_path_or_filename, path_to_filename_string, print_bold, print_error, print_warning};

use crate::MediaNameArgs;
use crate::config::Config;
use crate::logger::FileLogger;

const PROGRESS_BAR_CHARS: &str = "=>-";
const PROGRESS_BAR_TEMPLATE: &str = "[{elapsed_precise}] {bar:80.magenta/blue} {pos}/{len} {percent}%";

/// Suggest names for media files and rename them.
#[derive(Debug)]
pub struct MediaNamer {
    config: Config,
    locator: MediaLocator,
}

impl MediaNamer {
    /// Create a new instance from command line arguments.
    ///
    /// # Errors
    /// Returns an error if the config is invalid.
    pub fn new(args: MediaNameArgs) -> Result<Self> {
        let config = Config::from_args(args)?;
        let locator = MediaLocator::new(&config.extensions);
        Ok(Self { config, locator })
    }

    /// Run the whole pipeline: suggest, review, confirm and rename.
    ///
    /// Declining any confirmation ends the run without touching media files.
    pub async fn run(&self) -> Result<()> {
        if self.config.skip_suggest {
            println!("Using existing ledger: {}", self.config.ledger.display());
        } else if !self.suggest_names().await? {
            return Ok(());
        }

        let Some(plan) = self.review()? else {
            return Ok(());
        };
        if plan.is_empty() {
            println!("No files to rename");
            return Ok(());
        }

        if self.config.dryrun {
            print_bold!("Dryrun: showing what would be renamed");
        } else if !self.confirm(&format!("Rename {} files now?", plan.len()))? {
            println!("Exiting without making changes");
            return Ok(());
        }

        self.rename(&plan)
    }

    /// Ask the naming service for every media file and write the ledger.
    ///
    /// Returns false if there is nothing to do or the operator declined.
    async fn suggest_names(&self) -> Result<bool> {
        let files = self.locator.gather_media_files(&self.config.root);
        if files.is_empty() {
            print_warning!("No media files found in {}", self.config.root.display());
            return Ok(false);
        }

        println!("Found {} media files", files.len());
        if self.config.oracle.api_key.is_none() {
            print_warning!("No API key configured: every suggestion will use a fallback name");
        }
        if !self.confirm(&format!("Request name suggestions for {} files?", files.len()))? {
            println!("Exiting without making changes");
            return Ok(false);
        }

        let oracle = ChatOracle::new(self.config.oracle.clone()).context("Failed to create HTTP client")?;
        let mut writer = LedgerWriter::create(&self.config.ledger)?;
        let progress_bar = Self::create_progress_bar(files.len() as u64);

        let mut failures: usize = 0;
        for path in files {
            let entry = MediaEntry::from_path(path)?;
            let outcome = suggest_name(&oracle, &entry).await;
            match &outcome {
                SuggestionOutcome::Named(name) => {
                    if self.config.verbose {
                        progress_bar.suspend(|| println!("{} -> {name}", entry.original_name));
                    }
                }
                SuggestionOutcome::Empty(_) => {
                    failures += 1;
                    progress_bar.suspend(|| print_warning!("Empty suggestion for {}", entry.original_name));
                }
                SuggestionOutcome::Failed { error, .. } => {
                    failures += 1;
                    progress_bar.suspend(|| print_warning!("Suggestion failed for {}: {error}", entry.original_name));
                }
            }
            writer.append(&entry.with_suggestion(Some(outcome.into_name())))?;
            progress_bar.inc(1);
        }
        progress_bar.finish_and_clear();

        if failures > 0 {
            print_warning!("{failures} files got a fallback name");
        }
        println!(
            "{}",
            format!("Suggestions saved to {}", self.config.ledger.display()).green()
        );
        Ok(true)
    }

    /// Validate the ledger twice, with a chance to edit it in between.
    ///
    /// The final plan is always built from a fresh read of the ledger.
    fn review(&self) -> Result<Option<RenamePlan>> {
        let entries = read_ledger(&self.config.ledger)?;
        if entries.is_empty() {
            print_warning!("Ledger {} has no entries", self.config.ledger.display());
            return Ok(None);
        }
        let Some(plan) = self.prepare_plan(&entries)? else {
            return Ok(None);
        };
        if plan.is_empty() {
            return Ok(Some(plan));
        }

        self.wait_for_edits()?;

        println!("Reloading ledger to use the latest changes");
        let entries = read_ledger(&self.config.ledger)?;
        let Some(plan) = self.prepare_plan(&entries)? else {
            return Ok(None);
        };
        self.print_plan(&plan);
        Ok(Some(plan))
    }

    /// Detect issues, ask for consent and build the rename plan.
    ///
    /// Returns `None` if the operator declined the corrections.
    fn prepare_plan(&self, entries: &[LedgerEntry]) -> Result<Option<RenamePlan>> {
        let issues = detect(entries);
        let resolution = if issues.is_empty() {
            println!("{}", "No naming issues found".green());
            Resolution::default()
        } else {
            Self::print_issues(&issues);
            let consent = self.confirm(&format!("Apply automatic corrections for {} issues?", issues.len()))?;
            let resolution = resolve(&issues, consent);
            if !consent {
                println!("Exiting without making changes");
                return Ok(None);
            }
            Self::print_corrections(&resolution);
            resolution
        };

        Ok(Some(RenamePlan::build(entries, &issues, &resolution.resolved)))
    }

    /// Write the backup and apply the plan.
    fn rename(&self, plan: &RenamePlan) -> Result<()> {
        let mut logger = match FileLogger::new() {
            Ok(logger) => Some(logger),
            Err(error) => {
                print_warning!("Failed to create log file: {error}");
                None
            }
        };
        if let Some(logger) = logger.as_mut() {
            logger.log_init(&self.config);
        }

        if !self.config.dryrun {
            let backup_file = backup_file_names(&self.config.root, &self.locator)
                .context("Failed to back up original names, no files were renamed")?;
            println!("Original names saved to {}", backup_file.display());
            if let Some(logger) = logger.as_mut() {
                logger.log_backup(&backup_file);
            }
        }

        let reconciler = Reconciler::new(self.config.dryrun)
            .with_locator(self.locator.clone())
            .with_protected(self.protected_paths());
        let report = reconciler.apply_with(plan, |_, outcome| {
            self.print_outcome(outcome);
            if let Some(logger) = logger.as_mut() {
                logger.log_outcome(outcome);
            }
        });

        report.print_summary();
        if let Some(logger) = logger.as_mut() {
            logger.log_stats(&report);
        }
        Ok(())
    }

    /// Files next to the media that recovery must leave alone.
    fn protected_paths(&self) -> Vec<PathBuf> {
        let ledger = dunce::canonicalize(&self.config.ledger).unwrap_or_else(|_| self.config.ledger.clone());
        vec![ledger]
    }

    fn print_outcome(&self, outcome: &RenameOutcome) {
        match outcome {
            RenameOutcome::Renamed { from, to } => {
                self.show_rename(from, to);
            }
            RenameOutcome::FixedExtension { from, to } => {
                println!("{}", "Fixed extension:".cyan());
                self.show_rename(from, to);
            }
            RenameOutcome::Recovered { from, to } => {
                println!("{}", "Recovered previously modified file:".cyan());
                self.show_rename(from, to);
            }
            RenameOutcome::SkippedConflict { .. } => print_warning!("{outcome}"),
            RenameOutcome::AlreadyDone { .. } => {
                if self.config.verbose {
                    println!("{}", outcome.to_string().dimmed());
                }
            }
            RenameOutcome::Failed { .. } => print_error!("{outcome}"),
        }
    }

    fn show_rename(&self, from: &std::path::Path, to: &std::path::Path) {
        media_namer::show_diff(
            &get_relative_path_or_filename(from, &self.config.root),
            &get_relative_path_or_filename(to, &self.config.root),
        );
    }

    fn print_issues(issues: &[Issue]) {
        print_bold!("Found {} naming issues:", issues.len());
        for (number, issue) in issues.iter().enumerate() {
            println!("{}. {}", number + 1, issue.entry.original_path.display());
            println!("   Original name:    {}", issue.entry.original_name);
            println!(
                "   Recommended name: {}",
                issue.entry.recommended_name.as_deref().unwrap_or_default()
            );
            println!("   Issue:            {}", issue.kind.to_string().yellow());
        }
    }

    fn print_corrections(resolution: &Resolution) {
        for entry in &resolution.skipped {
            print_warning!(
                "No suggested name for {}, leaving it for a later run",
                entry.original_path.display()
            );
        }
        if resolution.is_empty() {
            return;
        }
        print_bold!("The following corrections will be applied:");
        for resolved in &resolution.resolved {
            println!("{}", resolved.original_path.display());
            println!("   Original name:    {}", resolved.original_name);
            println!(
                "   Recommended name: {}",
                resolved.recommended_name.as_deref().unwrap_or_default()
            );
            println!("   Corrected name:   {}", resolved.corrected_name.green());
        }
    }

    fn print_plan(&self, plan: &RenamePlan) {
        let changes: Vec<_> = plan
            .iter()
            .filter(|rename| path_to_filename_string(&rename.original_path) != rename.corrected_name)
            .collect();
        print_bold!("Planned renames: {}", changes.len());
        if self.config.verbose {
            for rename in changes {
                self.show_rename(&rename.original_path, &rename.target_path());
            }
        }
    }

    /// Give the operator a chance to edit the ledger before it is read again.
    fn wait_for_edits(&self) -> Result<()> {
        if self.config.yes {
            return Ok(());
        }
        print!(
            "{} {} ",
            format!("Edit {} now if needed.", self.config.ledger.display()).cyan(),
            "[press Enter to continue]".dimmed()
        );
        io::stdout().flush().context("Failed to flush stdout")?;
        let mut input = String::new();
        io::stdin().read_line(&mut input).context("Failed to read input")?;
        Ok(())
    }

    /// Ask a yes/no question. Always yes with `--yes`.
    fn confirm(&self, question: &str) -> Result<bool> {
        if self.config.yes {
            return Ok(true);
        }
        print!("{} {} ", question.cyan(), "[y/N]".dimmed());
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        io::stdin().read_line(&mut input).context("Failed to read input")?;
        Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
    }

    /// Create a progress bar that is hidden during tests.
    fn create_progress_bar(len: u64) -> ProgressBar {
        #[cfg(test)]
        {
            let _ = len;
            ProgressBar::hidden()
        }
        #[cfg(not(test))]
        {
            let progress_bar = ProgressBar::new(len);
            if let Ok(style) = ProgressStyle::default_bar().template(PROGRESS_BAR_TEMPLATE) {
                progress_bar.set_style(style.progress_chars(PROGRESS_BAR_CHARS));
            }
            progress_bar
        }
    }
}
