pub mod cancel;
pub mod check;
pub mod date;
pub mod error;
pub mod exiftool;
pub mod media;
pub mod report;
pub mod router;
pub mod scan;
pub mod workers;

mod batch;

use std::path::PathBuf;
use std::sync::mpsc;

use anyhow::Context;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::batch::Worker;
use crate::date::{CatalogSource, PatternCatalog, PATTERN_FILENAME};
use crate::exiftool::{ExifTool, MetadataWriter};
use crate::media::FileOutcome;
use crate::report::{Aggregator, RunLogs};
use crate::router::FileRouter;

pub use cancel::CancellationToken;
pub use check::{check_directories, CheckReport, Classification};
pub use error::MmuError;
pub use media::{FileTask, OutcomeStatus};
pub use report::Summary;
pub use scan::parse_directory_list;
pub use workers::WorkerSpec;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Directories to scan, non-recursively
    pub directories: Vec<PathBuf>,
    /// Working location: logs, `pattern.json`, `riff/` and `failed/`
    pub work_dir: PathBuf,
    #[serde(default)]
    pub workers: WorkerSpec,
    /// Overrides `<work_dir>/pattern.json`
    #[serde(default)]
    pub pattern_file: Option<PathBuf>,
    /// Overrides exiftool discovery
    #[serde(default)]
    pub exiftool: Option<PathBuf>,
    /// Send files the tool tagged with warnings to `manual/` for review
    #[serde(default)]
    pub manual_on_warning: bool,
}

impl ProcessOptions {
    pub fn new(directories: Vec<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            directories,
            work_dir: work_dir.into(),
            workers: WorkerSpec::default(),
            pattern_file: None,
            exiftool: None,
            manual_on_warning: false,
        }
    }

    pub fn pattern_path(&self) -> PathBuf {
        self.pattern_file
            .clone()
            .unwrap_or_else(|| self.work_dir.join(PATTERN_FILENAME))
    }

    pub fn load_catalog(&self) -> PatternCatalog {
        PatternCatalog::load(&self.pattern_path())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResult {
    pub summary: Summary,
    /// Workers actually used
    pub workers: usize,
    /// Threads available on this machine
    pub threads: usize,
    /// Input directories that could not be listed
    #[serde(default)]
    pub unreadable_dirs: Vec<PathBuf>,
    /// Whether `pattern.json` was used
    #[serde(default)]
    pub external_patterns: bool,
}

/// Control options for process execution (cancellation).
#[derive(Debug, Clone, Default)]
pub struct ProcessControl {
    /// Cancellation token; cancelling stops new files from being started.
    pub cancel_token: Option<CancellationToken>,
}

impl ProcessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_token
            .as_ref()
            .is_some_and(|t| t.check().is_err())
    }
}

/// Called after each outcome is recorded: (outcome, completed, total files).
pub type ProgressCallback<'a> = dyn Fn(&FileOutcome, u64, u64) + Send + Sync + 'a;

/// Run the full pipeline with exiftool as the metadata writer.
pub fn process(
    options: &ProcessOptions,
    progress_callback: &ProgressCallback<'_>,
) -> anyhow::Result<ProcessResult> {
    process_with_control(options, &ProcessControl::default(), progress_callback)
}

/// Run the full pipeline with exiftool and control options.
pub fn process_with_control(
    options: &ProcessOptions,
    control: &ProcessControl,
    progress_callback: &ProgressCallback<'_>,
) -> anyhow::Result<ProcessResult> {
    let tool = ExifTool::resolve(options.exiftool.as_deref(), &options.work_dir);
    tracing::info!("Using exiftool at {}", tool.program().display());
    process_with_writer(options, control, &tool, progress_callback)
}

/// Run the full pipeline against any metadata writer.
///
/// Files are spread over a fixed pool of workers; each outcome is sent back
/// over a channel and applied to the logs and counters by this thread alone,
/// in completion order.
pub fn process_with_writer(
    options: &ProcessOptions,
    control: &ProcessControl,
    writer: &dyn MetadataWriter,
    progress_callback: &ProgressCallback<'_>,
) -> anyhow::Result<ProcessResult> {
    let catalog = options.load_catalog();
    let threads = workers::available_threads();
    let worker_count = options.workers.resolve(threads);

    // Stage 1: Scan input directories
    let scan = scan::scan_directories(&options.directories);
    tracing::info!(
        "Found {} file(s) and {} subdirector(ies) in {} input director(ies)",
        scan.tasks.len(),
        scan.skipped_dirs.len(),
        options.directories.len()
    );

    std::fs::create_dir_all(&options.work_dir).with_context(|| {
        format!("Failed to create working directory {}", options.work_dir.display())
    })?;
    let mut aggregator = Aggregator::new(RunLogs::create(&options.work_dir)?);
    for name in &scan.skipped_dirs {
        if let Err(e) = aggregator.skip_directory(name) {
            tracing::warn!("Failed to write log entry for {}: {}", name, e);
        }
    }

    // Stage 2: Classify, tag and route on the worker pool
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count)
        .thread_name(|i| format!("mmu-worker-{}", i))
        .build()
        .context("Failed to build worker pool")?;
    tracing::info!("Using {} worker(s) out of {} available thread(s)", worker_count, threads);

    let router = FileRouter::new(&options.work_dir);
    let worker = Worker {
        catalog: &catalog,
        writer,
        router: &router,
        manual_on_warning: options.manual_on_warning,
    };
    let tasks = &scan.tasks;
    let total = tasks.len() as u64;
    let (tx, rx) = mpsc::channel::<FileOutcome>();

    std::thread::scope(|s| {
        let worker = &worker;
        let pool = &pool;
        s.spawn(move || {
            pool.install(|| {
                // One file per job so a hung tool call holds up only its own file
                tasks
                    .par_iter()
                    .with_max_len(1)
                    .for_each_with(tx, |tx, task| {
                        let outcome = if control.is_cancelled() {
                            FileOutcome::skipped(&task.filename, task.original_size, "cancelled")
                        } else {
                            worker.process(task)
                        };
                        // The receiver only goes away if the aggregator is gone
                        let _ = tx.send(outcome);
                    });
            });
        });

        // Stage 3: Aggregate as results arrive
        let mut completed = 0u64;
        for outcome in rx {
            completed += 1;
            if let Err(e) = aggregator.apply(&outcome) {
                tracing::warn!("Failed to write log entry for {}: {}", outcome.filename, e);
            }
            progress_callback(&outcome, completed, total);
        }
    });

    let summary = aggregator.finish().context("Failed to flush log files")?;
    debug_assert!(summary.is_consistent());

    Ok(ProcessResult {
        summary,
        workers: worker_count,
        threads,
        unreadable_dirs: scan.unreadable.into_iter().map(|(dir, _)| dir).collect(),
        external_patterns: matches!(catalog.source(), CatalogSource::External(_)),
    })
}

/// Dry run: report how each file would be classified.
pub fn check(options: &ProcessOptions) -> CheckReport {
    check_directories(&options.directories, &options.load_catalog())
}
