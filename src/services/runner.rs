//! Sequential batch loop: process each file, then move its source.

use crate::engine::EngineSession;
use crate::metrics::Metrics;
use crate::models::{
    ConversionOutcome, FailureReason, FileState, InputFile, RunSummary, WorkingDirectories,
    claim_base_name,
};
use crate::services::processor::{FileProcessor, FileReport};
use crate::state::StateManager;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::sync::Arc;
use thiserror::Error;

/// A source file could not be moved into its destination directory.
#[derive(Error, Debug)]
#[error("Failed to move {from} to {to}: {source}")]
pub struct MoveError {
    pub from: Utf8PathBuf,
    pub to: Utf8PathBuf,
    #[source]
    pub source: io::Error,
}

/// Move `source` into `dest_dir`, keeping its file name.
///
/// An existing file of the same name in `dest_dir` is replaced, but only once
/// the new copy is complete. When a rename is not possible (e.g. across
/// filesystems) the source is copied to a staging file next to the
/// destination, renamed over it, and only then removed.
pub fn move_into(source: &Utf8Path, dest_dir: &Utf8Path) -> Result<Utf8PathBuf, MoveError> {
    let file_name = source.file_name().unwrap_or_default();
    let dest = dest_dir.join(file_name);
    let err = |e: io::Error| MoveError {
        from: source.to_path_buf(),
        to: dest.clone(),
        source: e,
    };

    if dest.is_file() && dest != source {
        tracing::info!("Replacing existing {}", dest);
    }

    let rename_error = match fs::rename(source, &dest) {
        Ok(()) => return Ok(dest),
        Err(e) => e,
    };
    if !source.is_file() {
        return Err(err(rename_error));
    }
    tracing::debug!("Rename failed ({}), copying instead", rename_error);

    let staging = dest_dir.join(format!(".{}.partial", file_name));
    if let Err(e) = fs::copy(source, &staging).and_then(|_| fs::rename(&staging, &dest)) {
        discard(&staging);
        return Err(err(e));
    }

    if let Err(e) = fs::remove_file(source) {
        // The source is still in place, so drop the copy rather than keep two
        discard(&dest);
        return Err(err(e));
    }

    Ok(dest)
}

fn discard(path: &Utf8Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not remove {}: {}", path, e),
    }
}

/// Final record of one file after it has been moved.
#[derive(Debug, Clone)]
pub struct FileResult {
    pub report: FileReport,

    /// Outcome after move handling; a failed move to done downgrades a success
    pub outcome: ConversionOutcome,
    pub state: FileState,

    /// Where the source ended up, `None` if it was left in the input directory
    pub location: Option<Utf8PathBuf>,
}

/// Everything a batch produced.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub summary: RunSummary,
    pub files: Vec<FileResult>,
}

/// Runs the files of one batch strictly in order.
pub struct BatchRunner {
    processor: FileProcessor,
    state: StateManager,
    metrics: Arc<Metrics>,
}

impl BatchRunner {
    pub fn new(processor: FileProcessor, state: StateManager, metrics: Arc<Metrics>) -> Self {
        Self {
            processor,
            state,
            metrics,
        }
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Process every file, moving each source to done or failed before the next.
    pub async fn run(
        &self,
        engine: &mut dyn EngineSession,
        files: &[InputFile],
        dirs: &WorkingDirectories,
    ) -> BatchResult {
        let names: Vec<String> = files.iter().map(|f| f.file_name.clone()).collect();
        self.state.start_run(&names);

        let mut result = BatchResult::default();
        let mut used_bases = HashSet::new();

        for (index, file) in files.iter().enumerate() {
            tracing::info!("[{}/{}] Processing {}", index + 1, files.len(), file.file_name);
            self.state.begin_file(&file.file_name);

            // Two inputs must never write to the same export paths
            let base = claim_base_name(&file.base_name, &mut used_bases);
            let file = if base == file.base_name {
                file.clone()
            } else {
                tracing::warn!(
                    "Export name '{}' already used in this run, exporting {} as '{}'",
                    file.base_name,
                    file.file_name,
                    base
                );
                file.with_base_name(base)
            };

            let report = self.processor.process(engine, &file).await;
            self.metrics.record_file_processed(report.elapsed);

            let file_result = self.settle(report, dirs);
            tracing::info!("[{}/{}] {}: {}", index + 1, files.len(), file.file_name, file_result.outcome);

            self.state
                .finish_file(&file.file_name, file_result.state, &file_result.outcome);
            result.summary.record(&file_result.outcome);
            result.files.push(file_result);
        }

        self.state.finish_run();
        self.metrics.log_summary();
        result
    }

    /// Move the source according to its outcome.
    fn settle(&self, report: FileReport, dirs: &WorkingDirectories) -> FileResult {
        let source = &report.file.path;

        if report.outcome.is_success() {
            match move_into(source, &dirs.done) {
                Ok(location) => {
                    tracing::info!("Moved to done: {}", location);
                    return FileResult {
                        outcome: report.outcome.clone(),
                        state: FileState::MovedDone,
                        location: Some(location),
                        report,
                    };
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    self.metrics.record_move_failed();
                    let outcome =
                        ConversionOutcome::Failure(FailureReason::MoveFailed(e.to_string()));
                    return self.settle_failed(report, outcome, dirs);
                }
            }
        }

        let outcome = report.outcome.clone();
        self.settle_failed(report, outcome, dirs)
    }

    fn settle_failed(
        &self,
        report: FileReport,
        outcome: ConversionOutcome,
        dirs: &WorkingDirectories,
    ) -> FileResult {
        let location = self.move_to_failed(&report.file.path, dirs);
        let state = if location.is_some() {
            FileState::MovedFailed
        } else {
            FileState::LeftInPlace
        };
        FileResult {
            report,
            outcome,
            state,
            location,
        }
    }

    fn move_to_failed(&self, source: &Utf8Path, dirs: &WorkingDirectories) -> Option<Utf8PathBuf> {
        match move_into(source, &dirs.failed) {
            Ok(location) => {
                tracing::info!("Moved to failed: {}", location);
                Some(location)
            }
            Err(e) => {
                tracing::error!("{}; source left in place", e);
                self.metrics.record_move_failed();
                None
            }
        }
    }
}
