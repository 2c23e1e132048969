use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Identifier of one batch run, used to name its log file.
///
/// UUIDv7 ids sort by creation time, so log files list in run order.
pub fn new_run_id() -> String {
    Uuid::now_v7().to_string()
}

/// `<dir>/<prefix>_<run_id>.log`
pub fn log_file_path(log_dir: &Utf8Path, log_prefix: &str, run_id: &str) -> Utf8PathBuf {
    log_dir.join(log_file_name(log_prefix, run_id))
}

fn log_file_name(log_prefix: &str, run_id: &str) -> String {
    format!("{}_{}.log", log_prefix, run_id)
}

/// Setup logging for one run.
///
/// Every run writes to its own file; nothing is rotated or appended across
/// runs.
///
/// # Arguments
/// * `log_dir` - Directory for log files (e.g., "fbx_out/logs")
/// * `log_prefix` - Prefix for log files (e.g., "vrm_pipeline")
/// * `run_id` - Run identifier, see [`new_run_id`]
/// * `debug_mode` - If true, use debug level; otherwise use info level
/// * `console_output` - If true, also log to the console
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn setup_logging(
    log_dir: &Utf8Path,
    log_prefix: &str,
    run_id: &str,
    debug_mode: bool,
    console_output: bool,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }

    let file_appender = rolling::never(log_dir, log_file_name(log_prefix, run_id));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = if debug_mode {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No ANSI codes in log files
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = console_output.then(|| {
        tracing_subscriber::fmt::layer()
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install the tracing subscriber")?;

    tracing::info!(
        "Logging initialized: file={}, debug={}, console={}",
        log_file_path(log_dir, log_prefix, run_id),
        debug_mode,
        console_output
    );

    Ok(guard)
}
