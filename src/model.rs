//! Records describing media files and the names suggested for them.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::{get_normalized_dir_name, os_str_to_string};

/// One physical file under consideration, as found during directory traversal.
///
/// A snapshot of the pre-rename state that is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MediaEntry {
    /// Path to the file, unique within a run.
    pub original_path: PathBuf,
    /// File name component of `original_path` at discovery time.
    pub original_name: String,
    /// Name of the immediate containing directory.
    pub folder_context: String,
}

/// A ledger row: a media file together with the name suggested for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub original_path: PathBuf,
    pub original_name: String,
    /// Suggested name, `None` when nothing was recorded.
    pub recommended_name: Option<String>,
}

impl MediaEntry {
    /// Create an entry from a discovered file path.
    pub fn from_path(path: PathBuf) -> Result<Self> {
        let original_name = os_str_to_string(
            path.file_name()
                .with_context(|| format!("Failed to get file name: {}", path.display()))?,
        );
        let folder_context = path
            .parent()
            .and_then(|parent| get_normalized_dir_name(parent).ok())
            .unwrap_or_default();
        Ok(Self {
            original_path: path,
            original_name,
            folder_context,
        })
    }

    /// Attach a suggested name to this entry.
    #[must_use]
    pub fn with_suggestion(self, recommended_name: Option<String>) -> LedgerEntry {
        LedgerEntry {
            original_path: self.original_path,
            original_name: self.original_name,
            recommended_name,
        }
    }
}

impl LedgerEntry {
    pub fn new(
        original_path: impl Into<PathBuf>,
        original_name: impl Into<String>,
        recommended_name: Option<&str>,
    ) -> Self {
        Self {
            original_path: original_path.into(),
            original_name: original_name.into(),
            recommended_name: recommended_name.map(ToString::to_string),
        }
    }

    /// Directory the file originally lived in.
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.original_path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// The suggested name, if one exists and is not blank.
    #[must_use]
    pub fn suggestion(&self) -> Option<&str> {
        self.recommended_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }

    /// Extension of the original file name including the leading dot, or empty if there is none.
    #[must_use]
    pub fn original_extension(&self) -> String {
        original_extension(&self.original_name)
    }
}

/// Extension of a file name including the leading dot, or an empty string.
///
/// Names that only consist of a leading dot part, like `.hidden`, have no extension.
#[must_use]
pub fn original_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|extension| format!(".{}", os_str_to_string(extension)))
        .unwrap_or_default()
}
