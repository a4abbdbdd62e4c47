//! Find media files under a directory tree.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::backup::BACKUP_DIR_NAME;

/// Video container extensions.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "wmv", "flv", "mpeg", "mpg", "m4v", "3gp", "rmvb", "iso", "rm",
];

/// Audio container extensions.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac", "aac", "wma", "m4a"];

/// Walks a directory tree and yields media files matching an extension allow-list.
#[derive(Debug, Clone)]
pub struct MediaLocator {
    extensions: Vec<String>,
}

impl Default for MediaLocator {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl MediaLocator {
    /// Create a locator for the built-in media extensions plus any given extras.
    #[must_use]
    pub fn new(extra_extensions: &[String]) -> Self {
        let mut extensions: Vec<String> = VIDEO_EXTENSIONS
            .iter()
            .chain(AUDIO_EXTENSIONS)
            .map(|extension| (*extension).to_string())
            .collect();

        for extension in extra_extensions {
            let extension = extension.trim().trim_start_matches('.').to_lowercase();
            if !extension.is_empty() && !extensions.contains(&extension) {
                extensions.push(extension);
            }
        }

        Self { extensions }
    }

    /// Check if a file is a media file based on its extension.
    #[must_use]
    pub fn is_media_file(&self, path: &Path) -> bool {
        path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| {
            self.extensions
                .iter()
                .any(|media_ext| media_ext.eq_ignore_ascii_case(ext))
        })
    }

    /// Lazily walk `root` recursively and yield all media file paths.
    ///
    /// The backup directory is never entered. Unreadable entries are skipped.
    /// Order follows the filesystem.
    pub fn media_files<'a>(&'a self, root: &Path) -> impl Iterator<Item = PathBuf> + 'a {
        WalkDir::new(root)
            .into_iter()
            .filter_entry(|entry| !(entry.file_type().is_dir() && entry.file_name() == BACKUP_DIR_NAME))
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| self.is_media_file(path))
    }

    /// All media files under `root`, sorted for a stable ledger order.
    #[must_use]
    pub fn gather_media_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.media_files(root).collect();
        files.sort();
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::{self, File};

    use tempfile::TempDir;

    #[test]
    fn recognizes_video_and_audio_extensions() {
        let locator = MediaLocator::default();
        assert!(locator.is_media_file(Path::new("movie.mkv")));
        assert!(locator.is_media_file(Path::new("movie.MP4")));
        assert!(locator.is_media_file(Path::new("song.flac")));
        assert!(locator.is_media_file(Path::new("clip.rm")));
        assert!(!locator.is_media_file(Path::new("notes.txt")));
        assert!(!locator.is_media_file(Path::new("mkv")));
    }

    #[test]
    fn extra_extensions_are_normalized() {
        let locator = MediaLocator::new(&[".WEBM".to_string(), "  ".to_string()]);
        assert!(locator.is_media_file(Path::new("clip.webm")));
        assert!(!locator.is_media_file(Path::new("clip")));
    }

    #[test]
    fn walks_recursively_and_skips_backup_dir() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let season = root.join("Season 1");
        let backup = root.join(BACKUP_DIR_NAME);
        fs::create_dir_all(&season).unwrap();
        fs::create_dir_all(&backup).unwrap();

        File::create(root.join("b.mp4")).unwrap();
        File::create(root.join("cover.jpg")).unwrap();
        File::create(season.join("a.mkv")).unwrap();
        File::create(backup.join("stale.mkv")).unwrap();

        let files = MediaLocator::default().gather_media_files(root);
        assert_eq!(files, vec![season.join("a.mkv"), root.join("b.mp4")]);
    }
}
