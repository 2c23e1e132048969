use crate::models::{ExitStatus, FileState, RunSummary, WorkingDirectories};
use crate::services::runner::BatchResult;
use std::fmt::Write as _;

/// Turns a finished batch into an exit status and a human readable summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultReporter;

impl ResultReporter {
    pub fn status(&self, summary: &RunSummary) -> ExitStatus {
        ExitStatus::from_summary(summary)
    }

    /// Summary printed and logged at the end of a run.
    pub fn render(&self, result: &BatchResult, dirs: &WorkingDirectories) -> String {
        let summary = &result.summary;
        let mut text = String::new();

        let _ = writeln!(text, "========================================");
        let _ = writeln!(text, "Batch conversion finished: {}", self.status(summary));
        let _ = writeln!(text, "  Total:            {}", summary.total);
        let _ = writeln!(text, "  Rich success:     {}", summary.rich_success);
        let _ = writeln!(text, "  Fallback success: {}", summary.fallback_success);
        let _ = writeln!(text, "  Failed:           {}", summary.failed);

        let failed: Vec<_> = result
            .files
            .iter()
            .filter(|f| !f.outcome.is_success())
            .collect();
        if !failed.is_empty() {
            let _ = writeln!(text);
            let _ = writeln!(text, "Failed files:");
            for file in failed {
                let _ = write!(text, "  {}: {}", file.report.file.file_name, file.outcome);
                if file.state == FileState::LeftInPlace {
                    let _ = write!(text, " [left in {}]", dirs.input);
                }
                let _ = writeln!(text);
            }
        }

        let _ = writeln!(text);
        let _ = writeln!(text, "Input:  {}", dirs.input);
        let _ = writeln!(text, "Output: {}", dirs.output);
        let _ = writeln!(text, "Done:   {}", dirs.done);
        let _ = writeln!(text, "Failed: {}", dirs.failed);
        let _ = write!(text, "========================================");

        text
    }
}
