//! One complete batch run: resolve, check, scan, convert, report.

use crate::engine::EngineSession;
use crate::metrics::Metrics;
use crate::models::{EngineSettings, ExitStatus, PipelineConfig, RunSummary, WorkingDirectories};
use crate::services::{
    BatchRunner, FileProcessor, FileResult, InputScanner, PathResolver, PreconditionError,
    ResultReporter, default_strategies, preflight,
};
use crate::state::StateManager;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;

/// Directory under the output directory holding the engine's scratch files.
pub const ENGINE_SESSION_DIR: &str = ".engine_session";

/// Caller-supplied parameters of a run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub base_dir: Utf8PathBuf,
    pub input_dir: Option<Utf8PathBuf>,
    pub output_dir: Option<Utf8PathBuf>,
    pub headless: bool,
}

/// What a run produced.
#[derive(Debug)]
pub struct PipelineResult {
    pub status: ExitStatus,
    pub summary: RunSummary,
    pub dirs: WorkingDirectories,
    pub files: Vec<FileResult>,

    /// Human readable end-of-run summary
    pub report: String,

    /// Set when a precondition failed and nothing was scanned
    pub precondition: Option<PreconditionError>,
}

pub struct Pipeline {
    config: PipelineConfig,
    options: RunOptions,
    state: StateManager,
    metrics: Arc<Metrics>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, options: RunOptions) -> Self {
        Self {
            config,
            options,
            state: StateManager::new(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Share an existing state manager, e.g. to observe progress events.
    pub fn with_state(mut self, state: StateManager) -> Self {
        self.state = state;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    fn path_resolver(&self) -> PathResolver {
        PathResolver::new(&self.options.base_dir, self.config.directories.clone())
    }

    /// Where the working directories will be, without creating them.
    pub fn plan_directories(&self) -> WorkingDirectories {
        self.path_resolver().plan(
            self.options.input_dir.as_deref(),
            self.options.output_dir.as_deref(),
        )
    }

    /// Resolve and create the four working directories.
    pub fn resolve_directories(&self) -> WorkingDirectories {
        self.path_resolver().resolve(
            self.options.input_dir.as_deref(),
            self.options.output_dir.as_deref(),
        )
    }

    /// Engine settings with a relative script resolved against the base directory.
    pub fn engine_settings(&self) -> EngineSettings {
        let mut settings = self.config.engine.clone();
        if settings.script.is_relative() {
            settings.script = self.options.base_dir.join(&settings.script);
        }
        settings
    }

    pub fn session_dir(dirs: &WorkingDirectories) -> Utf8PathBuf {
        dirs.output.join(ENGINE_SESSION_DIR)
    }

    /// Run preflight, scan and the batch over the resolved directories.
    pub async fn run(
        &self,
        engine: &mut dyn EngineSession,
        mut dirs: WorkingDirectories,
    ) -> PipelineResult {
        log_directories(&dirs);

        if let Err(e) = preflight::run(&dirs, engine).await {
            return self.fatal(dirs, e);
        }

        let scanner = InputScanner::new(&self.config.input_extension);
        let files = match scanner.scan(&mut dirs) {
            Ok(files) => files,
            Err(e) => return self.fatal(dirs, PreconditionError::Scan(e)),
        };
        tracing::info!(
            "Found {} .{} file(s) in {}",
            files.len(),
            self.config.input_extension,
            dirs.input
        );
        if self.options.headless {
            tracing::info!("Headless mode: rigging is unavailable, files use the fallback strategy");
        }

        let processor = FileProcessor::new(
            default_strategies(self.options.headless),
            self.config.formats.clone(),
            dirs.output.clone(),
            Arc::clone(&self.metrics),
        )
        .with_retry_on_export_failure(self.config.retry_fallback_on_export_failure);
        let runner = BatchRunner::new(processor, self.state.clone(), Arc::clone(&self.metrics));

        let batch = runner.run(engine, &files, &dirs).await;

        let reporter = ResultReporter;
        let status = reporter.status(&batch.summary);
        let report = reporter.render(&batch, &dirs);
        for line in report.lines() {
            tracing::info!("{}", line);
        }

        PipelineResult {
            status,
            summary: batch.summary,
            dirs,
            files: batch.files,
            report,
            precondition: None,
        }
    }

    fn fatal(&self, dirs: WorkingDirectories, error: PreconditionError) -> PipelineResult {
        tracing::error!("Cannot start batch: {}", error);
        PipelineResult {
            status: ExitStatus::Fatal,
            summary: RunSummary::default(),
            report: format!("Batch conversion aborted: {}", error),
            dirs,
            files: Vec::new(),
            precondition: Some(error),
        }
    }
}

fn log_directories(dirs: &WorkingDirectories) {
    for (label, dir) in dirs.all() {
        tracing::info!("{:<6} directory: {}", label, dir);
    }
}

/// Default log directory for a run: `<output>/logs`.
pub fn default_log_dir(output: &Utf8Path) -> Utf8PathBuf {
    output.join("logs")
}
