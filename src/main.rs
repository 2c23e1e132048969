//! vrmbatch - batch conversion of VRM avatars
//!
//! Main entry point for the command line tool.
//!
//! # Execution Flow
//!
//! 1. Parse arguments, load `vrmbatch.yaml` and apply the overrides
//! 2. Locate the output directory and initialize logging → `<output>/logs/<prefix>_<run-id>.log`
//! 3. Resolve the working directories (input, output, done, failed)
//! 4. Create a single-threaded tokio runtime and the engine session
//! 5. Run the pipeline and exit with its status code
//!
//! Exit codes: 0 success, 2 partial (some files failed), 1 fatal.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use std::process::ExitCode;
use vrmbatch::cli::Cli;
use vrmbatch::pipeline::default_log_dir;
use vrmbatch::{APP_NAME, BlenderEngine, ConfigManager, ExitStatus, Pipeline, VERSION};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(status) => ExitCode::from(status.code()),
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("{}: {:#}", APP_NAME, e);
            ExitCode::from(ExitStatus::Fatal.code())
        }
    }
}

fn run(cli: Cli) -> Result<ExitStatus> {
    let base_dir = match &cli.base_dir {
        Some(dir) => dir.clone(),
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            Utf8PathBuf::try_from(cwd).context("Current directory is not valid UTF-8")?
        }
    };

    let config_manager = match &cli.config {
        Some(path) => ConfigManager::from_file(path),
        None => ConfigManager::new(&base_dir),
    };
    let mut config = config_manager.load_config()?;
    cli.apply(&mut config);

    let pipeline = Pipeline::new(config, cli.run_options(base_dir));

    // Resolution logs its decisions, so only plan until logging is up
    let planned = pipeline.plan_directories();
    let logging = &pipeline.config().logging;
    let log_dir = logging
        .directory
        .clone()
        .unwrap_or_else(|| default_log_dir(&planned.output));
    let run_id = vrmbatch::logging::new_run_id();
    let _guard = vrmbatch::logging::setup_logging(
        &log_dir,
        &logging.prefix,
        &run_id,
        logging.debug,
        logging.console,
    )?;

    tracing::info!("Starting {} v{} (run {})", APP_NAME, VERSION, run_id);
    tracing::info!("Configuration: {}", config_manager.config_path());

    let dirs = pipeline.resolve_directories();

    // One engine session, one file at a time
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    let session_dir = Pipeline::session_dir(&dirs);
    let mut engine = BlenderEngine::new(
        &pipeline.engine_settings(),
        pipeline.config().timeouts.clone(),
        session_dir.clone(),
        pipeline.options().headless,
    );

    let result = runtime.block_on(pipeline.run(&mut engine, dirs));

    if session_dir.exists() {
        if let Err(e) = std::fs::remove_dir_all(&session_dir) {
            tracing::warn!("Could not remove engine session directory {}: {}", session_dir, e);
        }
    }

    if !pipeline.config().logging.console {
        println!("{}", result.report);
    }

    tracing::info!("Finished with status {} (exit code {})", result.status, result.status.code());
    Ok(result.status)
}
