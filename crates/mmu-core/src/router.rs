use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const RIFF_DIR: &str = "riff";
pub const FAILED_DIR: &str = "failed";
pub const MANUAL_DIR: &str = "manual";

/// Why a file is being relocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteReason {
    /// The tool says the container is really RIFF (e.g. WEBP named `.jpg`)
    RiffDetected,
    WriteFailed,
    NoPatternMatched,
    InvalidDate,
    /// Written, but needs a human look
    ManualReview,
}

/// Moves files into the holding areas. `riff/` and `failed/` live in the
/// run's working directory; `manual/` lives next to the file itself.
#[derive(Debug, Clone)]
pub struct FileRouter {
    work_dir: PathBuf,
}

impl FileRouter {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub fn destination_dir(&self, path: &Path, reason: RouteReason) -> PathBuf {
        match reason {
            RouteReason::RiffDetected => self.work_dir.join(RIFF_DIR),
            RouteReason::WriteFailed | RouteReason::NoPatternMatched | RouteReason::InvalidDate => {
                self.work_dir.join(FAILED_DIR)
            }
            RouteReason::ManualReview => path
                .parent()
                .map(|p| p.join(MANUAL_DIR))
                .unwrap_or_else(|| PathBuf::from(MANUAL_DIR)),
        }
    }

    /// Relocate `path` and return its new location. Never overwrites: an
    /// occupied name becomes `name (1).ext`, `name (2).ext`, ...
    pub fn route(&self, path: &Path, reason: RouteReason) -> Result<PathBuf> {
        let dir = self.destination_dir(path, reason);
        // create_dir_all treats an existing directory as success
        fs::create_dir_all(&dir)?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let (dest, placeholder) = claim_destination(&dir, &filename)?;
        drop(placeholder);

        if let Err(e) = move_file(path, &dest) {
            // Release the claimed name so a later run can use it
            let _ = fs::remove_file(&dest);
            return Err(e.into());
        }

        tracing::debug!("Moved {} -> {}", path.display(), dest.display());
        Ok(dest)
    }
}

/// `stem (n).ext`, or `stem (n)` without an extension.
pub fn disambiguated_name(filename: &str, counter: u32) -> String {
    let name = Path::new(filename);
    let stem = name
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    match name.extension().and_then(|s| s.to_str()) {
        Some(ext) => format!("{} ({}).{}", stem, counter, ext),
        None => format!("{} ({})", stem, counter),
    }
}

/// Atomically reserve a free name in `dir` by creating it exclusively, so
/// two workers routing the same filename never pick the same target.
fn claim_destination(dir: &Path, filename: &str) -> io::Result<(PathBuf, File)> {
    let mut counter = 0u32;
    loop {
        let candidate = if counter == 0 {
            dir.join(filename)
        } else {
            dir.join(disambiguated_name(filename, counter))
        };
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => counter += 1,
            Err(e) => return Err(e),
        }
    }
}

/// Rename when possible, otherwise copy then delete the original. A crash
/// between the copy and the delete leaves both files behind.
fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    if fs::rename(src, dest).is_ok() {
        return Ok(());
    }

    let meta = fs::metadata(src)?;
    fs::copy(src, dest)?;
    let atime = filetime::FileTime::from_last_access_time(&meta);
    let mtime = filetime::FileTime::from_last_modification_time(&meta);
    filetime::set_file_times(dest, atime, mtime).ok();
    fs::remove_file(src)
}
