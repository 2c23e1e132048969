// Run metrics module
//
// Lightweight counters for what happened during a batch run

use crate::models::StrategyKind;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counters collected over one batch run
///
/// Uses atomic operations so the struct can be shared by reference without
/// locks. Logged once when the run finishes.
#[derive(Debug)]
pub struct Metrics {
    /// Number of Rich strategy attempts
    pub rich_attempts: AtomicUsize,

    /// Number of Rich strategy attempts that produced an exportable set
    pub rich_successes: AtomicUsize,

    /// Number of Fallback strategy attempts
    pub fallback_attempts: AtomicUsize,

    /// Number of Fallback strategy attempts that produced an exportable set
    pub fallback_successes: AtomicUsize,

    /// Output files written and verified
    pub exports_written: AtomicUsize,

    /// Output formats that failed
    pub exports_failed: AtomicUsize,

    /// Total bytes of verified output
    pub bytes_written: AtomicU64,

    /// Source files that could not be moved to done or failed
    pub moves_failed: AtomicUsize,

    /// Files processed (any outcome)
    pub files_processed: AtomicUsize,

    /// Total per-file processing time in milliseconds
    pub total_processing_time_ms: AtomicU64,

    /// Run start time
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            rich_attempts: AtomicUsize::new(0),
            rich_successes: AtomicUsize::new(0),
            fallback_attempts: AtomicUsize::new(0),
            fallback_successes: AtomicUsize::new(0),
            exports_written: AtomicUsize::new(0),
            exports_failed: AtomicUsize::new(0),
            bytes_written: AtomicU64::new(0),
            moves_failed: AtomicUsize::new(0),
            files_processed: AtomicUsize::new(0),
            total_processing_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record that a strategy was attempted
    pub fn record_attempt(&self, strategy: StrategyKind) {
        match strategy {
            StrategyKind::Rich => self.rich_attempts.fetch_add(1, Ordering::Relaxed),
            StrategyKind::Fallback => self.fallback_attempts.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Record that a strategy produced an exportable set
    pub fn record_strategy_success(&self, strategy: StrategyKind) {
        match strategy {
            StrategyKind::Rich => self.rich_successes.fetch_add(1, Ordering::Relaxed),
            StrategyKind::Fallback => self.fallback_successes.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn record_export_written(&self, bytes: u64) {
        self.exports_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_export_failed(&self) {
        self.exports_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_move_failed(&self) {
        self.moves_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the wall time spent on one file
    pub fn record_file_processed(&self, duration: Duration) {
        self.files_processed.fetch_add(1, Ordering::Relaxed);
        self.total_processing_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average processing time per file in milliseconds
    pub fn avg_processing_time_ms(&self) -> f64 {
        let total = self.total_processing_time_ms.load(Ordering::Relaxed);
        let count = self.files_processed.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Run Metrics ===");
        tracing::info!("Elapsed: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Strategies: rich {}/{} succeeded, fallback {}/{} succeeded",
            self.rich_successes.load(Ordering::Relaxed),
            self.rich_attempts.load(Ordering::Relaxed),
            self.fallback_successes.load(Ordering::Relaxed),
            self.fallback_attempts.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Exports: {} written ({} bytes), {} failed",
            self.exports_written.load(Ordering::Relaxed),
            self.bytes_written.load(Ordering::Relaxed),
            self.exports_failed.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Files: {} processed (avg {:.0}ms), {} move failures",
            self.files_processed.load(Ordering::Relaxed),
            self.avg_processing_time_ms(),
            self.moves_failed.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
