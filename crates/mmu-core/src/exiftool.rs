// ExifTool wrapper for writing capture timestamps

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use chrono::NaiveDateTime;

use crate::date::exif_timestamp;
use crate::error::{MmuError, Result};

/// Diagnostic exiftool prints when a `.jpg` is really a RIFF container.
pub const RIFF_SIGNATURE: &str = "Not a valid JPG (looks more like a RIFF)";

/// Environment override for the exiftool binary.
pub const EXIFTOOL_ENV: &str = "MMU_EXIFTOOL_PATH";

/// What the tool reported for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub success: bool,
    /// Trimmed stderr
    pub diagnostic: String,
}

impl WriteReport {
    pub fn ok() -> Self {
        Self {
            success: true,
            diagnostic: String::new(),
        }
    }

    pub fn failed(diagnostic: impl Into<String>) -> Self {
        Self {
            success: false,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn is_riff_mismatch(&self) -> bool {
        self.diagnostic.contains(RIFF_SIGNATURE)
    }

    pub fn has_warning(&self) -> bool {
        self.diagnostic
            .lines()
            .any(|l| l.trim_start().starts_with("Warning"))
    }
}

/// Applies a timestamp to a file's metadata in place. Blocking.
pub trait MetadataWriter: Sync {
    fn write(&self, path: &Path, timestamp: &NaiveDateTime) -> WriteReport;
}

/// Runs the external `exiftool` binary.
#[derive(Debug, Clone)]
pub struct ExifTool {
    program: PathBuf,
}

impl ExifTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolution order: explicit path, `MMU_EXIFTOOL_PATH`, `exiftool` in
    /// the working directory, then `exiftool` on PATH.
    pub fn resolve(explicit: Option<&Path>, work_dir: &Path) -> Self {
        if let Some(p) = explicit {
            return Self::new(p);
        }
        if let Ok(v) = env::var(EXIFTOOL_ENV) {
            let p = PathBuf::from(&v);
            if p.exists() {
                return Self::new(p);
            }
        }

        let mut filename = "exiftool".to_string();
        if cfg!(windows) {
            filename.push_str(".exe");
        }
        let local = work_dir.join(&filename);
        if local.is_file() {
            return Self::new(local);
        }
        Self::new(filename)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run(&self, path: &Path, timestamp: &str) -> Result<Output> {
        Command::new(&self.program)
            .arg("-overwrite_original")
            .arg(format!("-DateTimeOriginal={}", timestamp))
            .arg(format!("-AllDates={}", timestamp))
            .arg(format!("-CreationTime={}", timestamp))
            .arg(format!("-ModifyDate={}", timestamp))
            .arg(path)
            .output()
            .map_err(|e| {
                MmuError::ExternalTool(format!(
                    "Failed to run {}: {}",
                    self.program.display(),
                    e
                ))
            })
    }
}

impl MetadataWriter for ExifTool {
    fn write(&self, path: &Path, timestamp: &NaiveDateTime) -> WriteReport {
        let output = match self.run(path, &exif_timestamp(timestamp)) {
            Ok(output) => output,
            Err(e) => return WriteReport::failed(e.to_string()),
        };

        WriteReport {
            success: output.status.success(),
            diagnostic: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }
}
