use std::fs;
use std::path::{Path, PathBuf};

use crate::media::{file_name_of, FileTask};

/// Everything found at the top level of the input directories.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub tasks: Vec<FileTask>,
    /// Names of subdirectories seen (never entered)
    pub skipped_dirs: Vec<String>,
    /// Input directories that could not be listed, with the reason
    pub unreadable: Vec<(PathBuf, String)>,
}

/// Split a comma-separated directory list, resolving relative entries
/// against `base`. Empty entries are dropped.
pub fn parse_directory_list(list: &str, base: &Path) -> Vec<PathBuf> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let p = PathBuf::from(s);
            if p.is_absolute() {
                p
            } else {
                base.join(p)
            }
        })
        .collect()
}

/// List each directory non-recursively. A directory that cannot be listed is
/// recorded and skipped; it never aborts the scan.
pub fn scan_directories(directories: &[PathBuf]) -> ScanResult {
    let mut result = ScanResult::default();

    for dir in directories {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cannot read directory {}: {}", dir.display(), e);
                result.unreadable.push((dir.clone(), e.to_string()));
                continue;
            }
        };

        let mut paths: Vec<PathBuf> = entries.flatten().map(|e| e.path()).collect();
        paths.sort();

        for path in paths {
            if path.is_dir() {
                tracing::debug!("Skipped directory: {}", path.display());
                result.skipped_dirs.push(file_name_of(&path));
            } else {
                let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                result.tasks.push(FileTask::new(path, size));
            }
        }
    }

    result
}
