use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;

use media_namer::reconcile::{RenameOutcome, RenameReport};

use crate::config::Config;

/// Simple file logger for rename runs with buffered writes
pub struct FileLogger {
    writer: BufWriter<File>,
}

impl FileLogger {
    /// Create a new file logger, writing to ~/logs/media-namer/media_name_<timestamp>.log
    pub(crate) fn new() -> Result<Self> {
        let log_dir = media_namer::config::LOG_DIR
            .as_deref()
            .context("Failed to get home directory")?;

        if !log_dir.exists() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }

        let log_path = log_dir.join(format!("media_name_{}.log", Local::now().format("%Y-%m-%d_%H-%M-%S")));
        Self::open(&log_path)
    }

    fn open(log_path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    fn timestamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Log when starting the rename phase
    pub(crate) fn log_init(&mut self, config: &Config) {
        let _ = writeln!(
            self.writer,
            "[{}] INIT \"{}\"",
            Self::timestamp(),
            config.root.display()
        );
        let _ = writeln!(self.writer, "  ledger: {}", config.ledger.display());
        let _ = writeln!(self.writer, "  model: {}", config.oracle.model);
        let _ = writeln!(self.writer, "  base_url: {}", config.oracle.base_url);
        if !config.extensions.is_empty() {
            let _ = writeln!(self.writer, "  extensions: {:?}", config.extensions);
        }
        let _ = writeln!(self.writer, "  skip_suggest: {}", config.skip_suggest);
        let _ = writeln!(self.writer, "  dryrun: {}", config.dryrun);
        let _ = writeln!(self.writer, "  yes: {}", config.yes);
        let _ = writeln!(self.writer, "  verbose: {}", config.verbose);
        let _ = self.writer.flush();
    }

    /// Log the backup file written before renaming
    pub(crate) fn log_backup(&mut self, backup_file: &Path) {
        let _ = writeln!(
            self.writer,
            "[{}] BACKUP    \"{}\"",
            Self::timestamp(),
            backup_file.display()
        );
        let _ = self.writer.flush();
    }

    /// Log the outcome of a single planned rename
    pub(crate) fn log_outcome(&mut self, outcome: &RenameOutcome) {
        let details = match outcome {
            RenameOutcome::Renamed { from, to }
            | RenameOutcome::FixedExtension { from, to }
            | RenameOutcome::Recovered { from, to } => {
                format!("\"{}\" -> \"{}\"", from.display(), to.display())
            }
            RenameOutcome::SkippedConflict { source, target } => {
                format!("\"{}\" | target exists: \"{}\"", source.display(), target.display())
            }
            RenameOutcome::AlreadyDone { original } => format!("\"{}\"", original.display()),
            RenameOutcome::Failed { source, cause } => format!("\"{}\" | {cause}", source.display()),
        };
        let _ = writeln!(
            self.writer,
            "[{}] {:<9} {details}",
            Self::timestamp(),
            outcome.label()
        );
        let _ = self.writer.flush();
    }

    /// Log final statistics
    pub(crate) fn log_stats(&mut self, report: &RenameReport) {
        let _ = writeln!(self.writer, "[{}] STATISTICS", Self::timestamp());
        if report.dryrun {
            let _ = writeln!(self.writer, "  Dryrun: no files were changed");
        }
        let _ = writeln!(self.writer, "  Renamed:           {}", report.renamed);
        let _ = writeln!(self.writer, "    - Recovered:     {}", report.recovered);
        let _ = writeln!(self.writer, "  Conflicts skipped: {}", report.skipped_conflict);
        let _ = writeln!(self.writer, "  Already done:      {}", report.already_done);
        let _ = writeln!(self.writer, "  Failed:            {}", report.failed);
        let _ = writeln!(self.writer, "[{}] END", Self::timestamp());
        let _ = self.writer.flush();
    }
}
