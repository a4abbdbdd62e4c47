//! Filesystem operations used by the reconciliation engine.

use std::fs;
use std::io;
use std::path::Path;

/// Filesystem access needed to apply a rename plan.
///
/// Lets the engine run against a failure-injecting implementation in tests.
pub trait FileSystem {
    /// Check if anything exists at the path, including broken symlinks.
    fn exists(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    /// File names of the direct children of a directory.
    fn list_dir(&self, directory: &Path) -> io::Result<Vec<String>>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Check if two paths point to the same file.
    /// Used to tell a case-only rename apart from a real collision on case-insensitive filesystems.
    fn is_same_file(&self, a: &Path, b: &Path) -> bool;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.symlink_metadata().is_ok()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn list_dir(&self, directory: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(directory)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    #[cfg(unix)]
    fn is_same_file(&self, a: &Path, b: &Path) -> bool {
        use std::os::unix::fs::MetadataExt;

        match (fs::metadata(a), fs::metadata(b)) {
            (Ok(first), Ok(second)) => first.dev() == second.dev() && first.ino() == second.ino(),
            _ => false,
        }
    }

    #[cfg(not(unix))]
    fn is_same_file(&self, a: &Path, b: &Path) -> bool {
        match (dunce::canonicalize(a), dunce::canonicalize(b)) {
            (Ok(first), Ok(second)) => first == second,
            _ => false,
        }
    }
}
