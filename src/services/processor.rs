//! Per-file conversion: strategy selection followed by the export fan-out.

use crate::engine::{EngineError, EngineSession};
use crate::metrics::Metrics;
use crate::models::{ConversionOutcome, ExportFormat, FailureReason, InputFile, StrategyKind};
use crate::services::export_report;
use crate::services::strategy::{ConversionStrategy, ExportableSet};
use crate::services::textures::{TextureCollation, TextureCollator};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::fs;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of writing one output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written { path: Utf8PathBuf, bytes: u64 },
    Failed { reason: String },
}

impl ExportOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, ExportOutcome::Written { .. })
    }
}

/// Everything known about one processed file before it is moved.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub file: InputFile,
    pub outcome: ConversionOutcome,

    /// Strategy whose exportable set was exported last, if any
    pub strategy: Option<StrategyKind>,

    /// Per-format results in export order
    pub exports: IndexMap<ExportFormat, ExportOutcome>,

    /// Failure cause of every strategy that did not lead to a success
    pub strategy_errors: Vec<String>,

    pub textures: Option<TextureCollation>,
    pub warnings: Vec<String>,
    pub elapsed: Duration,
}

impl FileReport {
    pub fn written_count(&self) -> usize {
        self.exports.values().filter(|o| o.is_written()).count()
    }

    pub fn all_warnings(&self) -> Vec<&str> {
        self.strategy_errors
            .iter()
            .chain(self.warnings.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Converts a single input file.
///
/// Strategies are tried in order on a freshly reset session. The first one
/// that yields an exportable set is exported to every configured format; a
/// single format failing never stops the others.
pub struct FileProcessor {
    strategies: Vec<Box<dyn ConversionStrategy>>,
    formats: Vec<ExportFormat>,
    output_dir: Utf8PathBuf,
    retry_on_export_failure: bool,
    textures: TextureCollator,
    metrics: Arc<Metrics>,
}

impl FileProcessor {
    pub fn new(
        strategies: Vec<Box<dyn ConversionStrategy>>,
        formats: Vec<ExportFormat>,
        output_dir: Utf8PathBuf,
        metrics: Arc<Metrics>,
    ) -> Self {
        let formats = if formats.is_empty() {
            tracing::warn!("No export formats configured, using all formats");
            ExportFormat::ALL.to_vec()
        } else {
            formats
        };

        Self {
            strategies,
            formats,
            output_dir,
            retry_on_export_failure: true,
            textures: TextureCollator::new(),
            metrics,
        }
    }

    /// When a strategy succeeds but every export fails, try the next strategy.
    pub fn with_retry_on_export_failure(mut self, retry: bool) -> Self {
        self.retry_on_export_failure = retry;
        self
    }

    pub fn formats(&self) -> &[ExportFormat] {
        &self.formats
    }

    pub fn output_dir(&self) -> &Utf8Path {
        &self.output_dir
    }

    /// Run strategy selection and the export fan-out for one file.
    ///
    /// Never fails: every problem ends up in the returned report's outcome.
    pub async fn process(&self, engine: &mut dyn EngineSession, file: &InputFile) -> FileReport {
        let started = Instant::now();
        let mut report = FileReport {
            file: file.clone(),
            outcome: ConversionOutcome::Failure(FailureReason::NoExportableSet(String::new())),
            strategy: None,
            exports: IndexMap::new(),
            strategy_errors: Vec::new(),
            textures: None,
            warnings: Vec::new(),
            elapsed: Duration::ZERO,
        };

        for (index, strategy) in self.strategies.iter().enumerate() {
            let kind = strategy.kind();
            tracing::info!("Attempting {} strategy for {}", kind, file.file_name);
            self.metrics.record_attempt(kind);

            let set = match strategy.attempt(engine, file).await {
                Ok(set) => set,
                Err(e) => {
                    tracing::warn!("{} strategy failed for {}: {}", kind, file.file_name, e);
                    report.strategy_errors.push(format!("{}: {}", kind, e));
                    continue;
                }
            };
            self.metrics.record_strategy_success(kind);

            report.strategy = Some(kind);
            report.warnings.clear();
            report.textures = None;
            let exports = self.export_all(engine, &set, &mut report).await;
            report.exports = exports;

            if report.written_count() > 0 {
                report.outcome = ConversionOutcome::from_strategy(kind);
                break;
            }

            tracing::error!(
                "Every export failed for {} after {} strategy",
                file.file_name,
                kind
            );
            report
                .strategy_errors
                .push(format!("{}: every export format failed", kind));
            report.outcome = ConversionOutcome::Failure(FailureReason::AllExportsFailed);

            let has_next = index + 1 < self.strategies.len();
            if !(self.retry_on_export_failure && has_next) {
                break;
            }
            tracing::info!("Retrying {} with the next strategy", file.file_name);
        }

        if report.strategy.is_none() {
            let cause = report.strategy_errors.join("; ");
            tracing::error!("No strategy succeeded for {}: {}", file.file_name, cause);
            report.outcome = ConversionOutcome::Failure(FailureReason::NoExportableSet(cause));
        } else {
            export_report::write(&report, &self.output_dir);
        }

        report.elapsed = started.elapsed();
        report
    }

    async fn export_all(
        &self,
        engine: &mut dyn EngineSession,
        set: &ExportableSet,
        report: &mut FileReport,
    ) -> IndexMap<ExportFormat, ExportOutcome> {
        let base = report.file.base_name.clone();
        let mut exports = IndexMap::new();

        for &format in &self.formats {
            let dest = format.destination(&self.output_dir, &base);
            let outcome = match self.export_one(engine, set, format, &dest).await {
                Ok(bytes) => {
                    tracing::info!("{} written: {} ({} bytes)", format, dest, bytes);
                    self.metrics.record_export_written(bytes);
                    ExportOutcome::Written {
                        path: dest.clone(),
                        bytes,
                    }
                }
                Err(e) => {
                    tracing::error!("{} export failed for {}: {}", format, report.file.file_name, e);
                    self.metrics.record_export_failed();
                    ExportOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            if format == ExportFormat::Obj && outcome.is_written() {
                self.collate_textures(&dest, report);
            }

            exports.insert(format, outcome);
        }

        exports
    }

    async fn export_one(
        &self,
        engine: &mut dyn EngineSession,
        set: &ExportableSet,
        format: ExportFormat,
        dest: &Utf8Path,
    ) -> Result<u64, EngineError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        // A leftover from an earlier run must not pass verification
        match fs::remove_file(dest) {
            Ok(()) => tracing::debug!("Removed previous export: {}", dest),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        engine.export_format(&set.scene, format, dest).await?;
        verify_export(format, dest)
    }

    fn collate_textures(&self, obj_path: &Utf8Path, report: &mut FileReport) {
        let Some(obj_dir) = obj_path.parent() else {
            return;
        };
        let mtl_path = obj_path.with_extension("mtl");

        match self.textures.collate(obj_dir, &mtl_path) {
            Ok(collation) => {
                tracing::info!(
                    "OBJ textures: {} copied, {} missing",
                    collation.copied,
                    collation.missing.len()
                );
                for missing in &collation.missing {
                    report.warnings.push(format!("OBJ texture not found: {}", missing));
                }
                report.textures = Some(collation);
            }
            Err(e) => {
                tracing::warn!("OBJ texture collation failed: {:#}", e);
                report.warnings.push(format!("OBJ texture collation failed: {}", e));
            }
        }
    }
}

/// An export counts only if its file exists and is not empty.
fn verify_export(format: ExportFormat, path: &Utf8Path) -> Result<u64, EngineError> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(meta.len()),
        _ => Err(EngineError::EmptyOutput {
            format,
            path: path.to_path_buf(),
        }),
    }
}
