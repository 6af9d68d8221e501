use std::fs::File;
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::media::{FileOutcome, OutcomeStatus};

pub const MATCH_LOG: &str = "0Match.log";
pub const NOT_MATCH_LOG: &str = "0NotMatch.log";
pub const CHANGED_LOG: &str = "0FileChanged.log";

/// Run counters. `total == matched + not_matched + skipped` once a run ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: u64,
    pub matched: u64,
    pub not_matched: u64,
    pub skipped: u64,
    pub size_increased: u64,
    pub size_decreased: u64,
}

impl Summary {
    pub fn is_consistent(&self) -> bool {
        self.total == self.matched + self.not_matched + self.skipped
    }
}

/// The three per-run text logs, truncated when created.
pub struct RunLogs {
    matched: LineWriter<File>,
    not_matched: LineWriter<File>,
    changed: LineWriter<File>,
}

impl RunLogs {
    pub fn create(dir: &Path) -> anyhow::Result<Self> {
        let open = |name: &str| -> anyhow::Result<LineWriter<File>> {
            let path = dir.join(name);
            let file = File::create(&path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            Ok(LineWriter::new(file))
        };
        Ok(Self {
            matched: open(MATCH_LOG)?,
            not_matched: open(NOT_MATCH_LOG)?,
            changed: open(CHANGED_LOG)?,
        })
    }

    pub fn paths(dir: &Path) -> [PathBuf; 3] {
        [dir.join(MATCH_LOG), dir.join(NOT_MATCH_LOG), dir.join(CHANGED_LOG)]
    }

    fn flush(&mut self) -> io::Result<()> {
        self.matched.flush()?;
        self.not_matched.flush()?;
        self.changed.flush()
    }
}

/// Sole owner of the summary and the logs. Outcomes are applied one at a
/// time, in arrival order.
pub struct Aggregator {
    summary: Summary,
    logs: RunLogs,
}

impl Aggregator {
    pub fn new(logs: RunLogs) -> Self {
        Self {
            summary: Summary::default(),
            logs,
        }
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn skip_directory(&mut self, name: &str) -> io::Result<()> {
        self.summary.total += 1;
        self.summary.skipped += 1;
        writeln!(self.logs.not_matched, "{} --> skipped directory", name)
    }

    pub fn apply(&mut self, outcome: &FileOutcome) -> io::Result<()> {
        self.summary.total += 1;
        let name = &outcome.filename;
        let message = outcome.message.as_deref().unwrap_or("Unknown error");

        match outcome.status {
            OutcomeStatus::Matched => {
                self.summary.matched += 1;
                let raw = outcome.raw_timestamp.as_deref().unwrap_or_default();
                match &outcome.message {
                    Some(note) => writeln!(self.logs.matched, "{} --> {} [{}]", name, raw, note)?,
                    None => writeln!(self.logs.matched, "{} --> {}", name, raw)?,
                }
            }
            OutcomeStatus::NotMatched | OutcomeStatus::WriteError => {
                self.summary.not_matched += 1;
                writeln!(self.logs.not_matched, "{} --> {}", name, message)?;
            }
            OutcomeStatus::Skipped => {
                self.summary.skipped += 1;
                writeln!(self.logs.not_matched, "{} --> skipped: {}", name, message)?;
            }
        }

        let (before, after) = (outcome.size_before, outcome.size_after.unwrap_or_default());
        match outcome.size_delta() {
            Some(delta) if delta > 0 => {
                self.summary.size_increased += 1;
                writeln!(
                    self.logs.changed,
                    "{} --> size increased ({} → {} bytes)",
                    name, before, after
                )?;
            }
            Some(delta) if delta < 0 => {
                self.summary.size_decreased += 1;
                writeln!(
                    self.logs.changed,
                    "{} --> size decreased ({} → {} bytes)",
                    name, before, after
                )?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Flush the logs and hand back the final counters.
    pub fn finish(mut self) -> io::Result<Summary> {
        self.logs.flush()?;
        Ok(self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn outcome(name: &str, status: OutcomeStatus, before: u64, after: Option<u64>) -> FileOutcome {
        FileOutcome {
            filename: name.to_string(),
            timestamp: None,
            raw_timestamp: Some("2023-05-01T143000Z".to_string()),
            status,
            message: match status {
                OutcomeStatus::Matched => None,
                _ => Some("No pattern matched → moved to /w/failed/x.jpg".to_string()),
            },
            size_before: before,
            size_after: after,
            moved_to: None,
        }
    }

    #[test]
    fn test_logs_and_counters() {
        let dir = tempdir().unwrap();
        let mut agg = Aggregator::new(RunLogs::create(dir.path()).unwrap());

        agg.skip_directory("thumbnails").unwrap();
        agg.apply(&outcome("a.jpg", OutcomeStatus::Matched, 100, Some(120))).unwrap();
        agg.apply(&outcome("b.jpg", OutcomeStatus::Matched, 100, Some(90))).unwrap();
        agg.apply(&outcome("c.jpg", OutcomeStatus::Matched, 100, Some(100))).unwrap();
        agg.apply(&outcome("x.jpg", OutcomeStatus::NotMatched, 5, Some(5))).unwrap();
        agg.apply(&FileOutcome::skipped("gone.jpg", 0, "file vanished before processing"))
            .unwrap();
        let summary = agg.finish().unwrap();

        assert_eq!(
            summary,
            Summary {
                total: 6,
                matched: 3,
                not_matched: 1,
                skipped: 2,
                size_increased: 1,
                size_decreased: 1,
            }
        );
        assert!(summary.is_consistent());

        let matched = fs::read_to_string(dir.path().join(MATCH_LOG)).unwrap();
        assert_eq!(matched.lines().count(), 3);
        assert!(matched.starts_with("a.jpg --> 2023-05-01T143000Z\n"));

        let not_matched = fs::read_to_string(dir.path().join(NOT_MATCH_LOG)).unwrap();
        let lines: Vec<_> = not_matched.lines().collect();
        assert_eq!(lines[0], "thumbnails --> skipped directory");
        assert_eq!(lines[1], "x.jpg --> No pattern matched → moved to /w/failed/x.jpg");
        assert_eq!(lines[2], "gone.jpg --> skipped: file vanished before processing");

        let changed = fs::read_to_string(dir.path().join(CHANGED_LOG)).unwrap();
        assert_eq!(
            changed,
            "a.jpg --> size increased (100 → 120 bytes)\nb.jpg --> size decreased (100 → 90 bytes)\n"
        );
    }

    #[test]
    fn test_logs_are_truncated() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(MATCH_LOG), "stale line\n").unwrap();
        let agg = Aggregator::new(RunLogs::create(dir.path()).unwrap());
        agg.finish().unwrap();
        assert_eq!(fs::read_to_string(dir.path().join(MATCH_LOG)).unwrap(), "");
    }
}
