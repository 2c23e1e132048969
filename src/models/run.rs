use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashSet;
use std::fmt;

/// The four working directories of a run.
///
/// Produced by [`PathResolver`](crate::services::PathResolver). The input
/// directory may be switched once by the scanner when the primary location is
/// empty and was not given explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDirectories {
    pub input: Utf8PathBuf,
    pub output: Utf8PathBuf,
    pub done: Utf8PathBuf,
    pub failed: Utf8PathBuf,

    /// Input directory came from the caller and must not be substituted
    pub input_overridden: bool,
    pub output_overridden: bool,

    /// Alternative input location scanned when the active one is empty
    pub secondary_input: Option<Utf8PathBuf>,
}

impl WorkingDirectories {
    pub fn all(&self) -> [(&'static str, &Utf8Path); 4] {
        [
            ("input", self.input.as_path()),
            ("output", self.output.as_path()),
            ("done", self.done.as_path()),
            ("failed", self.failed.as_path()),
        ]
    }
}

/// One conversion unit discovered by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputFile {
    pub path: Utf8PathBuf,

    /// File name including extension, used for the move into done/failed
    pub file_name: String,

    /// Sanitised stem used to name every export of this file
    pub base_name: String,
}

impl InputFile {
    pub fn new(path: Utf8PathBuf) -> Self {
        let file_name = path.file_name().unwrap_or_default().to_string();
        let base_name = safe_name(path.file_stem().unwrap_or_default());
        Self {
            path,
            file_name,
            base_name,
        }
    }

    /// Copy of this file exporting under a different base name.
    pub fn with_base_name(&self, base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            ..self.clone()
        }
    }
}

/// Sanitise a file stem for use in export names.
///
/// Spaces become underscores; letters and digits of any script, `_` and `-`
/// are kept, everything else is dropped. Returns `"export"` if nothing is left.
pub fn safe_name(stem: &str) -> String {
    let cleaned: String = stem
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();

    if cleaned.is_empty() {
        "export".to_string()
    } else {
        cleaned
    }
}

/// Reserve `base` for this run, or the first free `base__N` if it is taken.
///
/// Names are compared case-insensitively since exports of `Ava` and `ava`
/// land on the same file on case-insensitive filesystems.
pub fn claim_base_name(base: &str, used: &mut HashSet<String>) -> String {
    if used.insert(base.to_lowercase()) {
        return base.to_string();
    }

    let mut index = 1;
    loop {
        let candidate = format!("{}__{}", base, index);
        if used.insert(candidate.to_lowercase()) {
            return candidate;
        }
        index += 1;
    }
}

/// Which strategy produced an exportable set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Rich,
    Fallback,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Rich => f.write_str("rich"),
            StrategyKind::Fallback => f.write_str("fallback"),
        }
    }
}

/// Why a file ended in the failed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// No strategy produced an exportable set
    NoExportableSet(String),
    /// A strategy succeeded but every export format failed
    AllExportsFailed,
    /// Conversion succeeded but the source could not be moved to done
    MoveFailed(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NoExportableSet(cause) => write!(f, "no strategy succeeded: {}", cause),
            FailureReason::AllExportsFailed => f.write_str("every export format failed"),
            FailureReason::MoveFailed(cause) => write!(f, "move failed: {}", cause),
        }
    }
}

/// Classification of one processed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    RichSuccess,
    FallbackSuccess,
    Failure(FailureReason),
}

impl ConversionOutcome {
    pub fn from_strategy(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::Rich => ConversionOutcome::RichSuccess,
            StrategyKind::Fallback => ConversionOutcome::FallbackSuccess,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, ConversionOutcome::Failure(_))
    }
}

impl fmt::Display for ConversionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionOutcome::RichSuccess => f.write_str("rich success"),
            ConversionOutcome::FallbackSuccess => f.write_str("fallback success"),
            ConversionOutcome::Failure(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// Lifecycle of an input file within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Pending,
    Processing,
    MovedDone,
    MovedFailed,
    /// Failed, and the source could not be moved out of the input directory
    LeftInPlace,
}

impl FileState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FileState::MovedDone | FileState::MovedFailed | FileState::LeftInPlace
        )
    }
}

/// Aggregate counters for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub rich_success: usize,
    pub fallback_success: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &ConversionOutcome) {
        self.total += 1;
        match outcome {
            ConversionOutcome::RichSuccess => self.rich_success += 1,
            ConversionOutcome::FallbackSuccess => self.fallback_success += 1,
            ConversionOutcome::Failure(_) => self.failed += 1,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.rich_success + self.fallback_success
    }

    /// `total == rich + fallback + failed`
    pub fn is_consistent(&self) -> bool {
        self.total == self.rich_success + self.fallback_success + self.failed
    }
}

/// Process-wide result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Partial,
    Fatal,
}

impl ExitStatus {
    /// Status for a run that reached scanning.
    ///
    /// Any failed file yields `Partial`, including runs where nothing
    /// succeeded. `Fatal` is reserved for precondition failures.
    pub fn from_summary(summary: &RunSummary) -> Self {
        if summary.failed == 0 {
            ExitStatus::Success
        } else {
            ExitStatus::Partial
        }
    }

    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Fatal => 1,
            ExitStatus::Partial => 2,
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Success => f.write_str("success"),
            ExitStatus::Partial => f.write_str("partial"),
            ExitStatus::Fatal => f.write_str("fatal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_name() {
        assert_eq!(safe_name("My Avatar"), "My_Avatar");
        assert_eq!(safe_name("a.b(c)-d"), "abc-d");
        assert_eq!(safe_name("???"), "export");
        assert_eq!(safe_name(""), "export");
    }

    #[test]
    fn test_safe_name_keeps_non_ascii_letters() {
        assert_eq!(safe_name("ミク"), "ミク");
        assert_eq!(safe_name("Zoë Ñ 2"), "Zoë_Ñ_2");
        assert_ne!(safe_name("ミク"), safe_name("ルカ"));
    }

    #[test]
    fn test_claim_base_name_suffixes_repeats() {
        let mut used = HashSet::new();
        assert_eq!(claim_base_name("a_b", &mut used), "a_b");
        assert_eq!(claim_base_name("a_b", &mut used), "a_b__1");
        assert_eq!(claim_base_name("A_B", &mut used), "A_B__2");
        assert_eq!(claim_base_name("other", &mut used), "other");
    }

    #[test]
    fn test_input_file_names() {
        let file = InputFile::new(Utf8PathBuf::from("/in/Cool Girl v2.vrm"));
        assert_eq!(file.file_name, "Cool Girl v2.vrm");
        assert_eq!(file.base_name, "Cool_Girl_v2");
    }

    #[test]
    fn test_summary_record() {
        let mut summary = RunSummary::default();
        summary.record(&ConversionOutcome::RichSuccess);
        summary.record(&ConversionOutcome::FallbackSuccess);
        summary.record(&ConversionOutcome::Failure(FailureReason::AllExportsFailed));

        assert_eq!(summary.total, 3);
        assert_eq!(summary.rich_success, 1);
        assert_eq!(summary.fallback_success, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded(), 2);
        assert!(summary.is_consistent());
    }

    #[test]
    fn test_exit_status_mapping() {
        let empty = RunSummary::default();
        assert_eq!(ExitStatus::from_summary(&empty), ExitStatus::Success);

        let all_ok = RunSummary {
            total: 2,
            rich_success: 1,
            fallback_success: 1,
            failed: 0,
        };
        assert_eq!(ExitStatus::from_summary(&all_ok), ExitStatus::Success);

        let mixed = RunSummary {
            total: 2,
            rich_success: 1,
            fallback_success: 0,
            failed: 1,
        };
        assert_eq!(ExitStatus::from_summary(&mixed), ExitStatus::Partial);

        let all_failed = RunSummary {
            total: 1,
            rich_success: 0,
            fallback_success: 0,
            failed: 1,
        };
        assert_eq!(ExitStatus::from_summary(&all_failed), ExitStatus::Partial);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitStatus::Success.code(), 0);
        assert_eq!(ExitStatus::Fatal.code(), 1);
        assert_eq!(ExitStatus::Partial.code(), 2);
    }

    #[test]
    fn test_outcome_from_strategy() {
        assert_eq!(
            ConversionOutcome::from_strategy(StrategyKind::Fallback),
            ConversionOutcome::FallbackSuccess
        );
        assert!(ConversionOutcome::RichSuccess.is_success());
        assert!(!ConversionOutcome::Failure(FailureReason::AllExportsFailed).is_success());
    }
}
