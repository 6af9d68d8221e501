use std::fs;
use std::io;
use std::path::PathBuf;

use crate::date::{self, Extraction, PatternCatalog};
use crate::exiftool::MetadataWriter;
use crate::media::{FileOutcome, FileTask, OutcomeStatus};
use crate::router::{FileRouter, RouteReason};

/// Shared, read-only context every worker runs against.
pub(crate) struct Worker<'a> {
    pub catalog: &'a PatternCatalog,
    pub writer: &'a dyn MetadataWriter,
    pub router: &'a FileRouter,
    pub manual_on_warning: bool,
}

impl Worker<'_> {
    /// Take one file from discovery to a terminal outcome.
    pub fn process(&self, task: &FileTask) -> FileOutcome {
        let name = task.filename.as_str();
        let size_before = match fs::metadata(&task.path) {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => return FileOutcome::skipped(name, task.original_size, "no longer a regular file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return FileOutcome::skipped(name, task.original_size, "file vanished before processing")
            }
            Err(e) => {
                return FileOutcome::skipped(name, task.original_size, format!("size unreadable: {}", e))
            }
        };

        let found = match date::extract(name, self.catalog) {
            Extraction::Resolved(found) => found,
            Extraction::InvalidDate { fallback, raw } => {
                let reason = format!("Fallback {} parse error ({})", fallback.label(), raw);
                return self.fail(task, size_before, None, RouteReason::InvalidDate, reason);
            }
            Extraction::NoMatch => {
                return self.fail(
                    task,
                    size_before,
                    None,
                    RouteReason::NoPatternMatched,
                    "No pattern matched".to_string(),
                );
            }
        };

        tracing::debug!("{}: resolved {} via {:?}", name, found.raw, found.rule);
        let report = self.writer.write(&task.path, &found.timestamp);
        let size_after = fs::metadata(&task.path)
            .map(|m| m.len())
            .unwrap_or(size_before);

        if !report.success {
            let (route, reason) = if report.is_riff_mismatch() {
                (RouteReason::RiffDetected, "RIFF detected".to_string())
            } else {
                (RouteReason::WriteFailed, format!("Exiftool error: {}", report.diagnostic))
            };
            return self.fail(task, size_before, Some(size_after), route, reason);
        }

        let mut outcome = FileOutcome {
            filename: name.to_string(),
            timestamp: Some(found.timestamp),
            raw_timestamp: Some(found.raw),
            status: OutcomeStatus::Matched,
            message: None,
            size_before,
            size_after: Some(size_after),
            moved_to: None,
        };

        if self.manual_on_warning && report.has_warning() {
            let note = match self.router.route(&task.path, RouteReason::ManualReview) {
                Ok(dest) => {
                    let note = format!("manual review → moved to {}", dest.display());
                    outcome.moved_to = Some(dest);
                    note
                }
                Err(e) => format!("manual review needed, move failed: {}", e),
            };
            tracing::debug!("{}: {} ({})", name, note, report.diagnostic);
            outcome.message = Some(note);
        }

        outcome
    }

    /// Route a failed file and describe where it went.
    fn fail(
        &self,
        task: &FileTask,
        size_before: u64,
        size_after: Option<u64>,
        route: RouteReason,
        reason: String,
    ) -> FileOutcome {
        let (status, message, moved_to): (_, _, Option<PathBuf>) =
            match self.router.route(&task.path, route) {
                Ok(dest) => (
                    OutcomeStatus::NotMatched,
                    format!("{} → moved to {}", reason, dest.display()),
                    Some(dest),
                ),
                Err(e) => {
                    tracing::warn!("Could not move {}: {}", task.path.display(), e);
                    (
                        OutcomeStatus::WriteError,
                        format!("{} → move failed: {}", reason, e),
                        None,
                    )
                }
            };

        FileOutcome {
            filename: task.filename.clone(),
            timestamp: None,
            raw_timestamp: None,
            status,
            message: Some(message),
            size_before,
            size_after: Some(size_after.unwrap_or(size_before)),
            moved_to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exiftool::{WriteReport, RIFF_SIGNATURE};
    use crate::report::{Aggregator, RunLogs, NOT_MATCH_LOG};
    use crate::router::FAILED_DIR;
    use chrono::NaiveDateTime;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    /// Appends the timestamp to the file; names containing `riff` or
    /// `broken` fail the way exiftool would.
    struct StubWriter;

    impl MetadataWriter for StubWriter {
        fn write(&self, path: &Path, timestamp: &NaiveDateTime) -> WriteReport {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            if name.contains("riff") {
                return WriteReport::failed(format!("Error: {}", RIFF_SIGNATURE));
            }
            if name.contains("broken") {
                return WriteReport::failed("Error: Truncated JPEG");
            }
            fs::write(path, format!("DATE={}", date::exif_timestamp(timestamp))).unwrap();
            WriteReport::ok()
        }
    }

    struct Setup {
        input: TempDir,
        work: TempDir,
        catalog: PatternCatalog,
        router: FileRouter,
    }

    impl Setup {
        fn new() -> Self {
            let input = tempdir().unwrap();
            let work = tempdir().unwrap();
            let router = FileRouter::new(work.path());
            Self {
                input,
                work,
                catalog: PatternCatalog::builtin(),
                router,
            }
        }

        fn worker(&self) -> Worker<'_> {
            Worker {
                catalog: &self.catalog,
                writer: &StubWriter,
                router: &self.router,
                manual_on_warning: false,
            }
        }

        fn task(&self, name: &str) -> FileTask {
            let path = self.input.path().join(name);
            fs::write(&path, b"x").unwrap();
            FileTask::new(path, 1)
        }
    }

    #[test]
    fn test_vanished_file_is_skipped() {
        let setup = Setup::new();
        let task = setup.task("230501 beach.jpg");
        fs::remove_file(&task.path).unwrap();

        let outcome = setup.worker().process(&task);
        assert_eq!(outcome.status, OutcomeStatus::Skipped);
        assert_eq!(outcome.message.as_deref(), Some("file vanished before processing"));
        assert_eq!(outcome.size_after, None);
        assert!(!setup.work.path().join(FAILED_DIR).exists());
    }

    #[test]
    fn test_unreadable_size_is_skipped() {
        let setup = Setup::new();
        let parent = setup.task("230501 beach.jpg");
        // A path below a regular file cannot be stat'ed, even by root
        let task = FileTask::new(parent.path.join("child.jpg"), 1);

        let outcome = setup.worker().process(&task);
        assert_eq!(outcome.status, OutcomeStatus::Skipped);
        assert!(outcome
            .message
            .as_deref()
            .unwrap()
            .starts_with("size unreadable: "));
    }

    #[test]
    fn test_directory_in_place_of_file_is_skipped() {
        let setup = Setup::new();
        let path = setup.input.path().join("230501 beach.jpg");
        fs::create_dir(&path).unwrap();

        let outcome = setup.worker().process(&FileTask::new(path.clone(), 0));
        assert_eq!(outcome.status, OutcomeStatus::Skipped);
        assert!(path.is_dir());
    }

    #[test]
    fn test_route_failure_is_write_error() {
        let setup = Setup::new();
        // A regular file where the failed/ directory should go
        fs::write(setup.work.path().join(FAILED_DIR), b"").unwrap();

        let task = setup.task("holiday.jpg");
        let outcome = setup.worker().process(&task);
        assert_eq!(outcome.status, OutcomeStatus::WriteError);
        let message = outcome.message.as_deref().unwrap();
        assert!(message.starts_with("No pattern matched → move failed: "), "{}", message);
        assert_eq!(outcome.moved_to, None);
        assert!(task.path.exists());

        let task = setup.task("230501-broken.jpg");
        let outcome = setup.worker().process(&task);
        assert_eq!(outcome.status, OutcomeStatus::WriteError);
        assert!(outcome
            .message
            .as_deref()
            .unwrap()
            .starts_with("Exiftool error: Error: Truncated JPEG → move failed: "));
        assert!(task.path.exists());
    }

    #[test]
    fn test_matched_and_routed_files() {
        let setup = Setup::new();

        let task = setup.task("230501 beach.jpg");
        let outcome = setup.worker().process(&task);
        assert_eq!(outcome.status, OutcomeStatus::Matched);
        assert_eq!(outcome.raw_timestamp.as_deref(), Some("2023-05-01"));
        assert_eq!(outcome.size_before, 1);
        assert_eq!(outcome.size_after, Some("DATE=2023:05:01 00:00:00".len() as u64));
        assert!(task.path.exists());

        let task = setup.task("230501 riff.jpg");
        let outcome = setup.worker().process(&task);
        assert_eq!(outcome.status, OutcomeStatus::NotMatched);
        let dest = outcome.moved_to.unwrap();
        assert_eq!(dest, setup.work.path().join("riff").join("230501 riff.jpg"));
        assert!(dest.exists());
        assert!(!task.path.exists());

        let task = setup.task("230199 vacation.jpg");
        let outcome = setup.worker().process(&task);
        assert_eq!(outcome.status, OutcomeStatus::NotMatched);
        assert!(outcome
            .message
            .as_deref()
            .unwrap()
            .starts_with("Fallback YYMMDD<space> parse error (2023-01-99) → moved to "));
    }

    #[test]
    fn test_every_outcome_kind_keeps_summary_consistent() {
        let setup = Setup::new();
        let vanished = setup.task("230501 gone.jpg");
        fs::remove_file(&vanished.path).unwrap();
        let unreadable = FileTask::new(setup.task("230501 parent.jpg").path.join("x.jpg"), 1);
        let tasks = vec![
            setup.task("230501 beach.jpg"),
            setup.task("230501 riff.jpg"),
            vanished,
            unreadable,
        ];

        let logs_dir = tempdir().unwrap();
        let mut aggregator = Aggregator::new(RunLogs::create(logs_dir.path()).unwrap());
        aggregator.skip_directory("thumbnails").unwrap();
        for task in &tasks {
            aggregator.apply(&setup.worker().process(task)).unwrap();
        }

        // Blocks failed/ only after the earlier files went through
        fs::write(setup.work.path().join(FAILED_DIR), b"").unwrap();
        aggregator
            .apply(&setup.worker().process(&setup.task("holiday.jpg")))
            .unwrap();

        let summary = aggregator.finish().unwrap();
        assert_eq!(summary.total, 6);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.not_matched, 2);
        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.size_increased, 1);
        assert!(summary.is_consistent());

        let log = fs::read_to_string(logs_dir.path().join(NOT_MATCH_LOG)).unwrap();
        assert!(log.contains("230501 gone.jpg --> skipped: file vanished before processing"));
        assert!(log.contains("x.jpg --> skipped: size unreadable: "));
        assert!(log.contains("holiday.jpg --> No pattern matched → move failed: "));
    }
}
