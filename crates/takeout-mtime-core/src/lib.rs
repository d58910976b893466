pub mod cancel;
pub mod date;
pub mod error;
pub mod media;
pub mod normalize;
pub mod sidecar;

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

pub use cancel::{CancellationToken, CancelledError};
pub use date::{CaptureTimestamp, TimeSource};
pub use error::Error;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Takeout folders, processed in this order
    pub directories: Vec<PathBuf>,
    /// Skip the sidecar rename pass
    #[serde(default)]
    pub no_normalize: bool,
}

/// Control options for process execution.
#[derive(Debug, Clone, Default)]
pub struct ProcessControl {
    /// Checked between files.
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

    fn check(&self) -> Result<(), CancelledError> {
        match &self.cancel_token {
            Some(token) => token.check(),
            None => Ok(()),
        }
    }
}

/// Type alias for progress callback: (stage, current, total, message)
pub type ProgressCallback = dyn Fn(&str, u64, u64, &str) + Send + Sync;

/// Throttled progress reporter - emits at most every 200ms or on completion.
pub struct ThrottledProgress<'a> {
    inner: &'a ProgressCallback,
    last_emit: Cell<Instant>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(inner: &'a ProgressCallback) -> Self {
        let start = Instant::now();
        Self {
            inner,
            last_emit: Cell::new(start.checked_sub(Duration::from_secs(1)).unwrap_or(start)),
        }
    }

    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let is_done = current + 1 >= total;
        if !is_done {
            if self.last_emit.get().elapsed() < Duration::from_millis(200) {
                return;
            }
            self.last_emit.set(Instant::now());
        }
        (self.inner)(stage, current, total, message);
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum FileStatus {
    Updated {
        time: DateTime<Utc>,
        source: TimeSource,
    },
    /// Left untouched; nothing to recover a time from
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub filename: String,
    pub status: FileStatus,
    /// Set when a sidecar was found but could not be used
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DirectoryReport {
    pub directory: PathBuf,
    pub renamed: u64,
    pub updated: u64,
    pub skipped: u64,
    pub failed: u64,
    pub outcomes: Vec<FileOutcome>,
    /// Rename conflicts and other non-fatal problems
    pub warnings: Vec<String>,
    /// Set when the directory could not be processed at all
    pub error: Option<String>,
    /// Stopped by cancellation before every file was processed
    pub cancelled: bool,
}

impl DirectoryReport {
    fn new(directory: &Path) -> Self {
        Self {
            directory: directory.to_path_buf(),
            ..Self::default()
        }
    }

    fn push(&mut self, outcome: FileOutcome) {
        match outcome.status {
            FileStatus::Updated { .. } => self.updated += 1,
            FileStatus::Skipped { .. } => self.skipped += 1,
            FileStatus::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessResult {
    /// Reports for every directory reached, including a partial last one
    pub directories: Vec<DirectoryReport>,
    /// The run was cancelled; remaining directories were not visited
    pub cancelled: bool,
}

impl ProcessResult {
    pub fn files_updated(&self) -> u64 {
        self.directories.iter().map(|d| d.updated).sum()
    }

    pub fn files_skipped(&self) -> u64 {
        self.directories.iter().map(|d| d.skipped).sum()
    }

    pub fn files_failed(&self) -> u64 {
        self.directories.iter().map(|d| d.failed).sum()
    }

    pub fn directories_failed(&self) -> u64 {
        self.directories.iter().filter(|d| d.error.is_some()).count() as u64
    }
}

/// Process every directory of `options` with progress reporting.
pub fn process(
    options: &ProcessOptions,
    progress_callback: &ProgressCallback,
) -> anyhow::Result<ProcessResult> {
    process_with_control(options, &ProcessControl::default(), progress_callback)
}

/// Process every directory in order. A directory that cannot be read is
/// reported and skipped. Cancellation ends the batch early but keeps the
/// reports built so far.
pub fn process_with_control(
    options: &ProcessOptions,
    control: &ProcessControl,
    progress_callback: &ProgressCallback,
) -> anyhow::Result<ProcessResult> {
    let tp = ThrottledProgress::new(progress_callback);
    let mut result = ProcessResult::default();

    for dir in &options.directories {
        if control.check().is_err() {
            result.cancelled = true;
            break;
        }
        let report = match process_directory(dir, options, control, &tp) {
            Ok(report) => report,
            Err(e) => {
                warn!("Skipping {}: {:#}", dir.display(), e);
                DirectoryReport {
                    error: Some(format!("{:#}", e)),
                    ..DirectoryReport::new(dir)
                }
            }
        };
        let stopped = report.cancelled;
        result.directories.push(report);
        if stopped {
            result.cancelled = true;
            break;
        }
    }

    Ok(result)
}

/// Normalize sidecar names in `dir`, then date every non-sidecar file.
pub fn process_directory(
    dir: &Path,
    options: &ProcessOptions,
    control: &ProcessControl,
    progress: &ThrottledProgress,
) -> anyhow::Result<DirectoryReport> {
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }
    let mut report = DirectoryReport::new(dir);

    if !options.no_normalize {
        let normalized = normalize::normalize_directory(dir, progress)?;
        report.renamed = normalized.renamed.len() as u64;
        report
            .warnings
            .extend(normalized.failures.iter().map(|e| e.to_string()));
    }

    let listing = media::scan_files(dir).map_err(|e| Error::io(dir, e))?;
    for path in &listing.non_utf8 {
        warn!("Ignoring {}: file name is not valid UTF-8", path.display());
        report
            .warnings
            .push(format!("ignored {}: file name is not valid UTF-8", path.display()));
    }

    let files: Vec<String> = listing
        .names
        .into_iter()
        .filter(|name| !media::is_sidecar_name(name))
        .collect();
    let total = files.len() as u64;

    for (i, filename) in files.iter().enumerate() {
        if control.check().is_err() {
            warn!("Cancelled in {} after {} of {} files", dir.display(), i, total);
            report.cancelled = true;
            return Ok(report);
        }
        report.push(process_file(dir, filename));
        progress.report("process", i as u64, total, filename);
    }

    info!(
        "Finished with {}: {} updated, {} skipped, {} failed",
        dir.display(),
        report.updated,
        report.skipped,
        report.failed
    );
    Ok(report)
}

/// Resolve, recover and apply the capture time of one file.
/// Never fails; every error becomes part of the outcome.
pub fn process_file(dir: &Path, filename: &str) -> FileOutcome {
    let media = media::MediaFile::new(dir, filename);
    let mut note = None;

    let recovered = match sidecar::resolve(dir, filename) {
        Ok(found) => {
            debug!("{} -> {} [{}]", filename, found.path.display(), found.rule);
            match date::recover(&media, Some(&found.path)) {
                Err(e) if e.is_fallback() => {
                    warn!("{}; falling back to embedded metadata", e);
                    note = Some(e.to_string());
                    date::recover(&media, None)
                }
                other => other,
            }
        }
        Err(e) => {
            debug!("{}", e);
            date::recover(&media, None)
        }
    };

    let applied = recovered.and_then(|ts| {
        date::apply(&media.path(), &ts)?;
        Ok(ts)
    });

    let status = match applied {
        Ok(ts) => {
            info!("{}: {} ({:?})", filename, ts.time, ts.source);
            FileStatus::Updated {
                time: ts.time,
                source: ts.source,
            }
        }
        Err(e @ Error::NoCaptureTime { .. }) => {
            warn!("Skipping {}: {}", filename, e);
            FileStatus::Skipped {
                reason: e.to_string(),
            }
        }
        Err(e) => {
            warn!("Error processing {}: {}", filename, e);
            FileStatus::Failed {
                reason: e.to_string(),
            }
        }
    };

    FileOutcome {
        filename: filename.to_string(),
        status,
        note,
    }
}
