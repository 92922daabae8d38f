//! mcp - Media Copy
//!
//! Copy photos and videos into a date-organised tree, powered by mediacopy.

mod logging;

use chrono::{DateTime, Local};
use clap::{ArgAction, ArgGroup, Parser, ValueEnum};
use mediacopy::{
    DEFAULT_RESUME_LOG, DEFAULT_STORE_PATH, DateLayout, Error as MediaError, ErrorCode,
    IngestOptions, IngestReport, MediaKind, Overwrite, RemovedFile, ScanReport, Spinner,
    ingest, remove_copied_sources, scan,
};
use serde_json::{Value, json};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

/// mcp - Media Copy
///
/// Copy photos or videos into a tree organised by creation date, skipping
/// content that is already there. Interrupted runs resume where they stopped.
///
/// Usage:
///   mcp --image --in DIR --out DIR [--dirformat DATE|YEAR-MONTH|NOF]
///   mcp --video --in DIR --out DIR
///   mcp --scan --in DIR --out DIR
#[derive(Parser, Debug)]
#[command(name = "mcp", version, about, long_about = None)]
#[command(group(ArgGroup::new("mode").required(true).args(["image", "video", "scan"])))]
struct Args {
    /// Input directory
    #[arg(long = "in", value_name = "DIR")]
    input: PathBuf,

    /// Output directory
    #[arg(long = "out", value_name = "DIR", default_value = ".")]
    out: PathBuf,

    /// Copy images, dated from EXIF
    #[arg(long)]
    image: bool,

    /// Copy videos, dated from the movie header
    #[arg(long)]
    video: bool,

    /// Hash both trees and list input files already present in the output
    #[arg(long)]
    scan: bool,

    /// Descend into subdirectories of the input
    #[arg(short = 'r', long)]
    recursive: bool,

    /// Copy even if the content or the file is already present
    #[arg(short = 'f', long)]
    force: bool,

    /// What to do when a file with the same name already exists
    #[arg(long, value_enum, default_value = "no")]
    overwrite: OverwritePolicy,

    /// Destination layout: DATE (YYYY-MM-DD), YEAR-MONTH (YYYY/MM), or NOF (flat)
    #[arg(long, value_name = "FORMAT", default_value = "NOF")]
    dirformat: DateLayout,

    /// Sample large files when hashing (default)
    #[arg(long, overrides_with = "no_fast_hash")]
    fast_hash: bool,

    /// Hash large files in full instead of sampling them
    #[arg(long, overrides_with = "fast_hash")]
    no_fast_hash: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "10")]
    workers: usize,

    /// Delete sources listed in the resume log once the run finishes
    #[arg(long, alias = "removesource")]
    remove_source: bool,

    /// Resume log path
    #[arg(long, value_name = "PATH", default_value = DEFAULT_RESUME_LOG)]
    resume_log: PathBuf,

    /// Fingerprint store directory
    #[arg(long = "store", value_name = "DIR", default_value = DEFAULT_STORE_PATH)]
    store: PathBuf,

    /// Keep the fingerprint store after the run
    #[arg(long)]
    keep_store: bool,

    /// Do not call fsync after each file (faster but less safe)
    #[arg(long)]
    no_sync: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    output: OutputMode,

    /// Disable the spinner and all logging below errors
    #[arg(short = 'q', long)]
    quiet: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OverwritePolicy {
    /// Replace the existing file
    Yes,
    /// Keep the existing file (default, enables resume)
    No,
    /// Ask for each existing file
    Ask,
}

impl From<OverwritePolicy> for Overwrite {
    fn from(p: OverwritePolicy) -> Self {
        match p {
            OverwritePolicy::Yes => Overwrite::Yes,
            OverwritePolicy::No => Overwrite::No,
            OverwritePolicy::Ask => Overwrite::Ask,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Image,
    Video,
    Scan,
}

impl Mode {
    fn from_args(args: &Args) -> Self {
        if args.scan {
            Self::Scan
        } else if args.video {
            Self::Video
        } else {
            Self::Image
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Scan => "scan",
        }
    }
}

type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error("Failed to open log file: {path}: {source}")]
    LogFile {
        path: PathBuf,
        source: tracing_appender::rolling::InitError,
    },

    #[error("{source}")]
    Run { source: MediaError },

    #[error("Failed to remove sources: {source}")]
    Remove { source: MediaError },

    #[error("Failed to serialize JSON output: {source}")]
    JsonSerialize { source: serde_json::Error },
}

impl CliError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::LogFile { .. } => ErrorCode::InvalidInput,
            Self::Run { source } | Self::Remove { source } => source.code(),
            Self::JsonSerialize { .. } => ErrorCode::Internal,
        }
    }

    fn cancellation(&self) -> Option<(usize, usize, usize)> {
        match self {
            Self::Run {
                source:
                    MediaError::Cancelled {
                        copied,
                        skipped,
                        errored,
                    },
            } => Some((*copied, *skipped, *errored)),
            _ => None,
        }
    }
}

/// What a run produced, ready for printing.
enum RunOutput {
    Ingest(IngestReport),
    Scan(ScanReport),
}

fn exit_code_for(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::InvalidInput => 2,
        _ => 1,
    }
}

fn main() {
    let args = Args::parse();
    let output = args.output;
    if let Err(error) = run(args) {
        if let Some((copied, skipped, errored)) = error.cancellation() {
            eprintln!("Cancelled after copying {copied} files ({skipped} skipped, {errored} failed).");
            eprintln!("Re-run with the same command to resume.");
            std::process::exit(130);
        }
        if output == OutputMode::Json {
            let payload = json!({
                "schema_version": "1.0",
                "error": { "code": error.code().as_str(), "message": error.to_string() },
            });
            println!("{payload}");
        }
        eprintln!("error[{}]: {}", error.code(), error);
        std::process::exit(exit_code_for(error.code()));
    }
}

fn run(args: Args) -> CliResult<()> {
    let _log_guard = logging::init(args.verbose, args.quiet, args.log_file.as_deref())?;
    let mode = Mode::from_args(&args);
    let mut options = build_options(&args, mode);

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel_clone = cancel.clone();
        ctrlc::set_handler(move || {
            if cancel_clone.load(Ordering::Relaxed) {
                eprintln!("\nForce quit.");
                std::process::exit(130);
            }
            cancel_clone.store(true, Ordering::Relaxed);
            eprintln!(
                "\nCancelling... finishing in-flight files. Press Ctrl+C again to abort immediately."
            );
        })
        .ok();
    }
    options = options.with_cancel_token(cancel);

    // The prompt reads stdin, which a spinner would draw over.
    let spinner = if args.output == OutputMode::Human
        && !args.quiet
        && options.overwrite != Overwrite::Ask
    {
        let (tx, rx) = crossbeam_channel::bounded(100);
        options = options.with_progress(tx);
        Some(Spinner::follow(rx))
    } else {
        None
    };

    tracing::info!(
        mode = mode.as_str(),
        input = %args.input.display(),
        out = %args.out.display(),
        "starting"
    );
    let result = match mode {
        Mode::Scan => scan(&args.input, &args.out, &options).map(RunOutput::Scan),
        Mode::Image | Mode::Video => {
            ingest(&args.input, &args.out, &options).map(RunOutput::Ingest)
        }
    };

    if let Some(spinner) = spinner {
        spinner.finish();
    }
    let output = result.map_err(|source| CliError::Run { source })?;

    let removed = if args.remove_source {
        remove_copied_sources(&options.resume_log, &options)
            .map_err(|source| CliError::Remove { source })?
    } else {
        Vec::new()
    };

    match args.output {
        OutputMode::Human => {
            print_human(&output, args.verbose > 0);
            if args.remove_source {
                print_removed(&removed);
            }
            Ok(())
        }
        OutputMode::Json => print_json_value(&json_report(&args, mode, &output, &removed)),
    }
}

fn build_options(args: &Args, mode: Mode) -> IngestOptions {
    let kind = if mode == Mode::Video {
        MediaKind::Video
    } else {
        MediaKind::Image
    };
    let mut options = IngestOptions::default()
        .with_kind(kind)
        .with_workers(args.workers)
        .with_overwrite(args.overwrite.into())
        .with_date_layout(args.dirformat)
        .with_resume_log(&args.resume_log)
        .with_store_path(&args.store);

    if args.recursive {
        options = options.with_recursive();
    }
    if args.force {
        options = options.with_force_copy();
    }
    if args.no_fast_hash && !args.fast_hash {
        options = options.without_fast_hash();
    }
    if args.keep_store {
        options = options.with_keep_store();
    }
    if args.no_sync {
        options = options.without_fsync();
    }
    if options.overwrite == Overwrite::Ask {
        options = options.with_prompt_handler(ask_overwrite);
    }
    options
}

/// Interactive `y/n` for an existing destination. Anything but yes keeps the file.
fn ask_overwrite(path: &Path) -> bool {
    eprint!("{} exists, overwrite? (y/n): ", path.display());
    let _ = io::stderr().flush();
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn effective_config(args: &Args, mode: Mode) -> Value {
    json!({
        "mode": mode.as_str(),
        "overwrite": format!("{:?}", Overwrite::from(args.overwrite)).to_ascii_lowercase(),
        "force": args.force,
        "recursive": args.recursive,
        "dirformat": format!("{:?}", args.dirformat),
        "fast_hash": args.fast_hash || !args.no_fast_hash,
        "workers": args.workers.max(1),
        "fsync": !args.no_sync,
        "resume_log": display_path(&args.resume_log),
        "store": display_path(&args.store),
    })
}

fn json_report(args: &Args, mode: Mode, output: &RunOutput, removed: &[RemovedFile]) -> Value {
    let mut payload = json!({
        "schema_version": "1.0",
        "mode": mode.as_str(),
        "effective_config": effective_config(args, mode),
    });
    let body = match output {
        RunOutput::Ingest(report) => json!({
            "summary": {
                "candidates": report.candidates,
                "already_copied": report.already_copied,
                "copied": report.copied.len(),
                "skipped": report.skipped.len(),
                "errored": report.errored.len(),
                "bytes_copied": report.bytes_copied,
                "duration_ms": duration_ms(report.duration),
            },
            "copied": report.copied.iter().map(|c| json!({
                "source": display_path(&c.source),
                "destination": display_path(&c.destination),
                "date": format_date(&c.timestamp),
                "bytes_copied": c.bytes,
            })).collect::<Vec<Value>>(),
            "skipped": report.skipped.iter().map(|s| json!({
                "source": display_path(&s.source),
                "destination": s.destination.as_deref().map(display_path),
                "reason": s.reason.as_str(),
            })).collect::<Vec<Value>>(),
            "errors": errors_json(&report.errored),
        }),
        RunOutput::Scan(report) => json!({
            "summary": {
                "source_fingerprints": report.source_count,
                "destination_fingerprints": report.destination_count,
                "matched": report.matches.len(),
                "errored": report.errored.len(),
                "duration_ms": duration_ms(report.duration),
            },
            "matches": report.matches.iter().map(|m| json!({
                "source": display_path(&m.source),
                "destination": display_path(&m.destination),
            })).collect::<Vec<Value>>(),
            "errors": errors_json(&report.errored),
        }),
    };
    if let (Value::Object(target), Value::Object(extra)) = (&mut payload, body) {
        target.extend(extra);
        if args.remove_source {
            target.insert(
                "removed".to_owned(),
                removed
                    .iter()
                    .map(|r| {
                        json!({
                            "name": r.name(),
                            "directory": display_path(r.directory()),
                            "modified": r.modified.to_rfc3339(),
                        })
                    })
                    .collect(),
            );
        }
    }
    payload
}

fn errors_json(errored: &[mediacopy::ErrorRecord]) -> Vec<Value> {
    errored
        .iter()
        .map(|e| {
            json!({
                "name": e.name(),
                "directory": display_path(e.directory()),
                "date": format_date(&e.timestamp),
                "message": e.message,
            })
        })
        .collect()
}

fn print_human(output: &RunOutput, verbose: bool) {
    match output {
        RunOutput::Ingest(report) => print_ingest(report, verbose),
        RunOutput::Scan(report) => print_scan(report),
    }
}

fn print_ingest(report: &IngestReport, verbose: bool) {
    if report.copied.is_empty() {
        if report.candidates == 0 {
            println!("Nothing to copy");
        } else {
            println!(
                "Nothing to copy ({} skipped, {} already copied)",
                report.skipped.len(),
                report.already_copied
            );
        }
    } else {
        println!(
            "Copied {} files ({}) in {:.2}s",
            report.copied.len(),
            format_bytes(report.bytes_copied),
            report.duration.as_secs_f64()
        );
        if verbose {
            for c in &report.copied {
                println!("  {} => {}", c.source.display(), c.destination.display());
            }
        }
    }

    if !report.skipped.is_empty() {
        println!("Skipped: {}", report.skipped.len());
        if verbose {
            for s in &report.skipped {
                println!("  {} ({})", s.source.display(), s.reason.as_str());
            }
        }
    }
    if report.already_copied > 0 && !report.copied.is_empty() {
        println!("Already copied: {}", report.already_copied);
    }
    print_errors(&report.errored);
}

fn print_scan(report: &ScanReport) {
    println!("Files matched: {}", report.matches.len());
    for m in &report.matches {
        println!(
            "  Source {} => Destination {}",
            m.source.display(),
            m.destination.display()
        );
    }
    println!(
        "Indexed {} source and {} destination fingerprints in {:.2}s",
        report.source_count,
        report.destination_count,
        report.duration.as_secs_f64()
    );
    print_errors(&report.errored);
}

fn print_errors(errored: &[mediacopy::ErrorRecord]) {
    if errored.is_empty() {
        return;
    }
    println!("Errors: {}", errored.len());
    for e in errored {
        println!(
            "  {} => Date {} => {}",
            e.path.display(),
            format_date(&e.timestamp),
            e.message
        );
    }
}

fn print_removed(removed: &[RemovedFile]) {
    println!("Removed files: {}", removed.len());
    for r in removed {
        println!("  {} ({})", r.path.display(), format_date(&r.modified));
    }
}

fn print_json_value(value: &Value) -> CliResult<()> {
    let serialized =
        serde_json::to_string(value).map_err(|source| CliError::JsonSerialize { source })?;
    println!("{serialized}");
    Ok(())
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

fn format_date(ts: &DateTime<Local>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(9), "9 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_mode_requires_exactly_one() {
        assert!(Args::try_parse_from(["mcp", "--in", "x"]).is_err());
        assert!(Args::try_parse_from(["mcp", "--in", "x", "--image", "--video"]).is_err());
        let args = Args::try_parse_from(["mcp", "--in", "x", "--video"]).unwrap();
        assert_eq!(Mode::from_args(&args), Mode::Video);
    }

    #[test]
    fn test_build_options() {
        let args = Args::try_parse_from([
            "mcp",
            "--in",
            "x",
            "--image",
            "--dirformat",
            "YEAR-MONTH",
            "--overwrite",
            "yes",
            "-j",
            "0",
            "--no-fast-hash",
            "-r",
        ])
        .unwrap();
        let options = build_options(&args, Mode::Image);
        assert_eq!(options.date_layout, DateLayout::YearMonth);
        assert_eq!(options.overwrite, Overwrite::Yes);
        assert_eq!(options.workers, 1);
        assert!(!options.fast_hash);
        assert!(options.recursive);
        assert!(options.prompt_handler.is_none());
    }

    #[test]
    fn test_fast_hash_flags_last_wins() {
        let args =
            Args::try_parse_from(["mcp", "--in", "x", "--video", "--no-fast-hash", "--fast-hash"])
                .unwrap();
        assert!(build_options(&args, Mode::Video).fast_hash);
    }

    #[test]
    fn test_unknown_dirformat_is_flat() {
        let args =
            Args::try_parse_from(["mcp", "--in", "x", "--image", "--dirformat", "weekly"]).unwrap();
        assert_eq!(args.dirformat, DateLayout::Flat);
    }
}
