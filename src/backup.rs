//! Record the original file paths before anything gets renamed.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::locator::MediaLocator;

/// Name of the backup directory created under the media root.
pub const BACKUP_DIR_NAME: &str = "backup_names";

/// Write a timestamped list of every media file path under `root`.
///
/// The list goes to `<root>/backup_names/original_names_<timestamp>.txt`.
/// An existing backup is never overwritten: a numeric suffix is added if needed.
/// Returns the path of the written file.
pub fn backup_file_names(root: &Path, locator: &MediaLocator) -> Result<PathBuf> {
    let backup_dir = root.join(BACKUP_DIR_NAME);
    fs::create_dir_all(&backup_dir)
        .with_context(|| format!("Failed to create backup directory: {}", backup_dir.display()))?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let backup_file = unused_path(&backup_dir, &format!("original_names_{timestamp}"));

    let file = File::create_new(&backup_file)
        .with_context(|| format!("Failed to create backup file: {}", backup_file.display()))?;
    let mut writer = BufWriter::new(file);

    for path in locator.media_files(root) {
        writeln!(writer, "{}", path.display())
            .with_context(|| format!("Failed to write backup file: {}", backup_file.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write backup file: {}", backup_file.display()))?;

    Ok(backup_file)
}

fn unused_path(dir: &Path, stem: &str) -> PathBuf {
    let mut path = dir.join(format!("{stem}.txt"));
    let mut index = 2;
    while path.exists() {
        path = dir.join(format!("{stem}_{index}.txt"));
        index += 1;
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn backup_lists_all_media_files() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        File::create(root.join("a.mkv")).unwrap();
        File::create(root.join("b.mp3")).unwrap();
        File::create(root.join("readme.txt")).unwrap();

        let backup = backup_file_names(root, &MediaLocator::default()).unwrap();
        assert!(backup.starts_with(root.join(BACKUP_DIR_NAME)));

        let contents = fs::read_to_string(&backup).unwrap();
        let mut lines: Vec<&str> = contents.lines().collect();
        lines.sort_unstable();
        assert_eq!(
            lines,
            vec![
                root.join("a.mkv").display().to_string(),
                root.join("b.mp3").display().to_string()
            ]
        );
    }

    #[test]
    fn repeated_backups_do_not_overwrite() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        File::create(root.join("a.mkv")).unwrap();

        let first = backup_file_names(root, &MediaLocator::default()).unwrap();
        let second = backup_file_names(root, &MediaLocator::default()).unwrap();
        assert_ne!(first, second);
        assert!(first.exists());
        assert!(second.exists());
    }
}
