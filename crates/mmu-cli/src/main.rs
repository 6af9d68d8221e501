mod logging;

use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use mmu_core::media::FileOutcome;
use mmu_core::report::RunLogs;
use mmu_core::{
    parse_directory_list, CancellationToken, CheckReport, Classification, OutcomeStatus,
    ProcessControl, ProcessOptions, WorkerSpec,
};

/// Scanned when --directory is not given
const DEFAULT_DIRECTORIES: &str = "/data";

#[derive(Parser)]
#[command(
    name = "media-metadata-updater",
    version,
    about = "Media Metadata Updater - write capture dates from filenames into media metadata"
)]
struct Cli {
    /// Percentage of CPU threads to use (e.g. 50, 80, 100) or "all"
    #[arg(long, default_value = "80")]
    workers: String,

    /// Print detailed logs for each file instead of a progress bar
    #[arg(long)]
    verbose: bool,

    /// Comma-separated list of directories to scan (non-recursive)
    #[arg(long, default_value = DEFAULT_DIRECTORIES)]
    directory: String,

    /// Only report how files would be classified; nothing is written or moved
    #[arg(long)]
    check: bool,

    /// Pattern file (default: ./pattern.json)
    #[arg(long)]
    patterns: Option<PathBuf>,

    /// Path to the exiftool binary
    #[arg(long)]
    exiftool: Option<PathBuf>,

    /// Move files that exiftool tagged with warnings into a manual/ folder
    #[arg(long)]
    manual_on_warning: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);
    let t_total = std::time::Instant::now();

    let cwd = std::env::current_dir()?;
    let directories = parse_directory_list(&cli.directory, &cwd);
    if cli.verbose {
        eprintln!("Using directories: {:?}", directories);
    }

    let mut options = ProcessOptions::new(directories, &cwd);
    options.workers = WorkerSpec::parse(&cli.workers);
    options.pattern_file = cli.patterns;
    options.exiftool = cli.exiftool;
    options.manual_on_warning = cli.manual_on_warning;

    if cli.check {
        print_check_report(&mmu_core::check(&options));
        return Ok(());
    }

    let token = CancellationToken::new();
    {
        let token = token.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nInterrupted: finishing files in progress, starting no new ones");
            token.cancel();
        })?;
    }
    let control = ProcessControl::new().with_cancel_token(token);

    let pb = ProgressBar::hidden();
    if !cli.verbose {
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.set_style(
            ProgressStyle::default_bar()
                .template("Processing files: |{bar:40}| {pos}/{len} ({percent}%)")?
                .progress_chars("█░"),
        );
    }

    let verbose = cli.verbose;
    let result = mmu_core::process_with_control(&options, &control, &|outcome, completed, total| {
        if verbose {
            print_outcome(outcome, completed, total);
        } else {
            pb.set_length(total);
            pb.set_position(completed);
        }
    })?;
    pb.finish_and_clear();

    let s = &result.summary;
    eprintln!(
        "Used {} worker(s) out of {} available thread(s){}",
        result.workers,
        result.threads,
        if result.external_patterns { ", patterns from pattern.json" } else { "" }
    );
    for dir in &result.unreadable_dirs {
        eprintln!("Could not read directory: {}", dir.display());
    }

    println!("\n=== Summary ===");
    println!("Total entries scanned: {}", s.total);
    println!("Matched: {}", s.matched);
    println!("Not matched: {}", s.not_matched);
    println!("Skipped: {}", s.skipped);
    println!("Size increased: {}", s.size_increased);
    println!("Size decreased: {}", s.size_decreased);

    if verbose {
        for path in RunLogs::paths(&options.work_dir) {
            eprintln!("Log: {}", path.display());
        }
    }
    eprintln!("Done! ({:.2}s)", t_total.elapsed().as_secs_f64());

    Ok(())
}

fn print_outcome(outcome: &FileOutcome, completed: u64, total: u64) {
    eprintln!("\n--- Checking file: {} ---", outcome.filename);
    match outcome.status {
        OutcomeStatus::Matched => {
            eprintln!(
                "Matched timestamp: {}",
                outcome.raw_timestamp.as_deref().unwrap_or_default()
            );
            if let Some(note) = &outcome.message {
                eprintln!("{}", note);
            }
        }
        OutcomeStatus::NotMatched | OutcomeStatus::WriteError => {
            eprintln!("{}", outcome.message.as_deref().unwrap_or("Unknown error"));
        }
        OutcomeStatus::Skipped => {
            eprintln!("Skipped ({}).", outcome.message.as_deref().unwrap_or("not a file"));
        }
    }
    if let (Some(delta), Some(after)) = (outcome.size_delta(), outcome.size_after) {
        let before = outcome.size_before;
        if delta > 0 {
            eprintln!("File size increased ({} → {} bytes).", before, after);
        } else if delta < 0 {
            eprintln!("File size decreased ({} → {} bytes).", before, after);
        }
    }
    eprintln!("[{}/{}] Finished processing: {}", completed, total, outcome.filename);
}

fn print_check_report(report: &CheckReport) {
    for dir in &report.unreadable {
        eprintln!("Directory not found: {}", dir.display());
    }

    println!("=== Matched files ===");
    for entry in &report.entries {
        match &entry.classification {
            Classification::Main { pattern, timestamp }
            | Classification::Fallback { pattern, timestamp } => {
                println!("{}", entry.filename);
                println!("--- matched pattern: {}", pattern);
                println!("--- extracted timestamp: {}", timestamp);
            }
            Classification::None => {}
        }
    }

    println!("\n=== Not matched files ===");
    for entry in &report.entries {
        if entry.classification == Classification::None {
            println!("{}", entry.filename);
        }
    }

    println!("\n=== Pattern check summary ===");
    println!("Total files: {}", report.total);
    println!("Matched (main + fallback): {}", report.matched_total());
    println!("  - Main matches: {}", report.main);
    println!("  - Fallback matches: {}", report.fallback);
    println!("Not matched: {}", report.none);
}
