//! Suggestion ledger persisted as a CSV table.
//!
//! The ledger is the durable, human-editable record of suggested names.
//! Columns: `Original Path`, `Original Name`, `Recommended Name`.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::LedgerEntry;
use crate::{path_to_filename_string, path_to_string, print_warning};

pub const ORIGINAL_PATH_COLUMN: &str = "Original Path";
pub const ORIGINAL_NAME_COLUMN: &str = "Original Name";
pub const RECOMMENDED_NAME_COLUMN: &str = "Recommended Name";

/// One CSV row. Missing columns and values fall back to defaults.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerRow {
    #[serde(rename = "Original Path", default)]
    original_path: String,
    #[serde(rename = "Original Name", default)]
    original_name: String,
    #[serde(rename = "Recommended Name", default)]
    recommended_name: Option<String>,
}

/// Writes ledger rows one at a time so partial progress survives an interrupted run.
pub struct LedgerWriter {
    writer: csv::Writer<File>,
    path: PathBuf,
}

impl LedgerWriter {
    /// Create a new ledger file, replacing any previous one.
    pub fn create(path: &Path) -> Result<Self> {
        let writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create ledger file: {}", path.display()))?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
        })
    }

    /// Append a single entry and flush it to disk.
    pub fn append(&mut self, entry: &LedgerEntry) -> Result<()> {
        self.writer
            .serialize(LedgerRow::from(entry))
            .with_context(|| format!("Failed to write ledger row to {}", self.path.display()))?;
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush ledger file: {}", self.path.display()))
    }
}

/// Write all entries to a new ledger file.
pub fn write_ledger(path: &Path, entries: &[LedgerEntry]) -> Result<()> {
    let mut writer = LedgerWriter::create(path)?;
    for entry in entries {
        writer.append(entry)?;
    }
    Ok(())
}

/// Read all entries from a ledger file in file order.
///
/// A missing file, a missing `Original Path` column or an unparseable row is an error.
/// Rows without a path are skipped with a warning.
/// A missing `Recommended Name` column or value reads as no suggestion.
pub fn read_ledger(path: &Path) -> Result<Vec<LedgerEntry>> {
    if !path.is_file() {
        anyhow::bail!("The ledger file {} was not found", path.display());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)
        .with_context(|| format!("Failed to open ledger file: {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read ledger header: {}", path.display()))?;
    if !headers.iter().any(|header| header == ORIGINAL_PATH_COLUMN) {
        anyhow::bail!(
            "Ledger file {} is missing the '{ORIGINAL_PATH_COLUMN}' column",
            path.display()
        );
    }

    let mut entries = Vec::new();
    for (index, row) in reader.deserialize::<LedgerRow>().enumerate() {
        // Header is line 1
        let line = index + 2;
        let row = row.with_context(|| format!("Failed to read ledger row on line {line}: {}", path.display()))?;
        if row.original_path.trim().is_empty() {
            print_warning!("Skipping ledger row on line {line} without an original path");
            continue;
        }
        entries.push(LedgerEntry::from(row));
    }

    Ok(entries)
}

impl From<&LedgerEntry> for LedgerRow {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            original_path: path_to_string(&entry.original_path),
            original_name: entry.original_name.clone(),
            recommended_name: entry.recommended_name.clone(),
        }
    }
}

impl From<LedgerRow> for LedgerEntry {
    fn from(row: LedgerRow) -> Self {
        let original_path = PathBuf::from(row.original_path);
        let original_name = if row.original_name.is_empty() {
            path_to_filename_string(&original_path)
        } else {
            row.original_name
        };
        Self {
            original_path,
            original_name,
            recommended_name: row.recommended_name.filter(|name| !name.is_empty()),
        }
    }
}
