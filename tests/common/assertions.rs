//! Filesystem assertions over a download directory

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Every regular file under `dir`, sorted
pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Panic if any `.part` leftovers remain under `dir`
pub fn assert_no_partial_files(dir: &Path) {
    let leftovers: Vec<_> = files_under(dir)
        .into_iter()
        .filter(|p| p.extension().is_some_and(|ext| ext == "part"))
        .collect();
    assert!(leftovers.is_empty(), "partial files left behind: {leftovers:?}");
}

/// Paths of `files` relative to `root`, as forward-slash strings
pub fn relative(root: &Path, files: &[PathBuf]) -> Vec<String> {
    files
        .iter()
        .filter_map(|p| p.strip_prefix(root).ok())
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .collect()
}
