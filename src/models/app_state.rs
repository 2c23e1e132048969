use crate::models::{ConversionOutcome, FileState, RunSummary};
use indexmap::IndexMap;

/// Snapshot of a batch run in progress.
///
/// Wrapped by [`crate::state::StateManager`], which is the only place that
/// mutates it and emits [`crate::state::StateChange`] events for every
/// observable difference.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunState {
    pub is_running: bool,

    /// File currently being converted, by file name
    pub current_file: Option<String>,

    /// Files finished so far (moved to done or failed)
    pub progress: usize,
    pub total_files: usize,

    /// Lifecycle state of every scanned file, in scan order
    pub file_states: IndexMap<String, FileState>,

    pub summary: RunSummary,
}

impl RunState {
    /// Start tracking a fresh run over `files`, all pending.
    pub fn begin(&mut self, files: &[String]) {
        *self = Self {
            is_running: true,
            total_files: files.len(),
            file_states: files
                .iter()
                .map(|name| (name.clone(), FileState::Pending))
                .collect(),
            ..Self::default()
        };
    }

    /// Record a finished file and its terminal state.
    pub fn finish_file(&mut self, file: &str, state: FileState, outcome: &ConversionOutcome) {
        self.file_states.insert(file.to_string(), state);
        self.summary.record(outcome);
        self.progress += 1;
        if self.current_file.as_deref() == Some(file) {
            self.current_file = None;
        }
    }

    pub fn pending_files(&self) -> impl Iterator<Item = &str> {
        self.file_states
            .iter()
            .filter(|(_, state)| **state == FileState::Pending)
            .map(|(name, _)| name.as_str())
    }

    /// Every scanned file reached a terminal state.
    pub fn is_complete(&self) -> bool {
        self.file_states.values().all(|state| state.is_terminal())
    }
}
