use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A regular file discovered in an input directory.
#[derive(Debug, Clone)]
pub struct FileTask {
    pub path: PathBuf,
    /// Just the filename
    pub filename: String,
    /// Size at discovery time
    pub original_size: u64,
}

impl FileTask {
    pub fn new(path: PathBuf, original_size: u64) -> Self {
        let filename = file_name_of(&path);
        Self {
            path,
            filename,
            original_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    Matched,
    NotMatched,
    Skipped,
    /// Failed and the file could not be relocated either; it stays in place.
    WriteError,
}

/// Terminal result of one `FileTask`, produced exactly once by a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub filename: String,
    pub timestamp: Option<NaiveDateTime>,
    /// Text the timestamp was read from
    pub raw_timestamp: Option<String>,
    pub status: OutcomeStatus,
    pub message: Option<String>,
    pub size_before: u64,
    pub size_after: Option<u64>,
    /// Where the file ended up if it was moved
    pub moved_to: Option<PathBuf>,
}

impl FileOutcome {
    pub fn skipped(filename: &str, size_before: u64, message: impl Into<String>) -> Self {
        Self {
            filename: filename.to_string(),
            timestamp: None,
            raw_timestamp: None,
            status: OutcomeStatus::Skipped,
            message: Some(message.into()),
            size_before,
            size_after: None,
            moved_to: None,
        }
    }

    /// Signed size delta, when the after-size is known.
    pub fn size_delta(&self) -> Option<i128> {
        self.size_after
            .map(|after| after as i128 - self.size_before as i128)
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
