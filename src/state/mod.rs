// State management module
//
// This module provides the StateManager which wraps RunState with thread-safe access
// using Arc<RwLock<T>> and emits change events for every observable transition.

use crate::models::{ConversionOutcome, FileState, RunState};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

/// Change events emitted when the run state is modified
///
/// Subscribers (progress output, tests) receive these instead of polling.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// A batch run has started
    RunStarted { total_files: usize },

    /// Progress or the current file changed
    ProgressUpdated {
        current: usize,
        total: usize,
        current_file: Option<String>,
    },

    /// A file moved along `Pending -> Processing -> MovedDone | MovedFailed | LeftInPlace`
    FileStateChanged {
        file: String,
        from: FileState,
        to: FileState,
    },

    /// A file has been classified and moved
    FileProcessed { file: String, outcome: String },

    /// The batch run has finished
    RunFinished {
        rich_success: usize,
        fallback_success: usize,
        failed: usize,
    },

    /// State has been reset
    StateReset,
}

/// Thread-safe run state with event emission
///
/// - Provides access to [`RunState`] via `Arc<RwLock<T>>`
/// - Detects state changes and emits [`StateChange`] events
/// - Rejects file transitions that break the lifecycle order
///
/// Always use `StateManager` instead of mutating [`RunState`] directly:
/// - [`read()`](Self::read) for reading state
/// - [`update()`](Self::update) for mutations with automatic event emission
/// - [`subscribe()`](Self::subscribe) for listening to state changes
pub struct StateManager {
    state: Arc<RwLock<RunState>>,

    /// Broadcast channel for emitting state change events
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with an idle state and a buffer of 100 events
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(RunState::default())),
            state_tx,
        }
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, RunState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, RunState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> RunState {
        self.read_guard().clone()
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let done = state_manager.read(|state| state.progress);
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&RunState) -> R,
    {
        f(&self.read_guard())
    }

    /// Update the state and emit change events
    ///
    /// Captures the old state, applies `update_fn`, then emits one event per
    /// detected difference.
    ///
    /// # Returns
    /// The StateChange events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut RunState),
    {
        let mut state = self.write_guard();
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = detect_changes(&old_state, &state);
        for change in &changes {
            // No subscribers is fine
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn emit(&self, change: StateChange, changes: &mut Vec<StateChange>) {
        let _ = self.state_tx.send(change.clone());
        changes.push(change);
    }

    /// Start a run over the scanned files, all `Pending`
    pub fn start_run(&self, files: &[String]) -> Vec<StateChange> {
        self.update(|state| state.begin(files))
    }

    /// Mark a pending file as `Processing`
    ///
    /// Ignored with a warning if the file is unknown or not pending.
    pub fn begin_file(&self, file: &str) -> Vec<StateChange> {
        let current = self.read(|state| state.file_states.get(file).copied());
        if current != Some(FileState::Pending) {
            tracing::warn!("Ignoring start of {} in state {:?}", file, current);
            return Vec::new();
        }

        self.update(|state| {
            state.file_states.insert(file.to_string(), FileState::Processing);
            state.current_file = Some(file.to_string());
        })
    }

    /// Record the terminal state of a processing file
    pub fn finish_file(
        &self,
        file: &str,
        terminal: FileState,
        outcome: &ConversionOutcome,
    ) -> Vec<StateChange> {
        let current = self.read(|state| state.file_states.get(file).copied());
        if current != Some(FileState::Processing) || !terminal.is_terminal() {
            tracing::warn!(
                "Ignoring transition of {} from {:?} to {:?}",
                file,
                current,
                terminal
            );
            return Vec::new();
        }

        let mut changes = self.update(|state| state.finish_file(file, terminal, outcome));
        self.emit(
            StateChange::FileProcessed {
                file: file.to_string(),
                outcome: outcome.to_string(),
            },
            &mut changes,
        );
        changes
    }

    /// Finish the run
    pub fn finish_run(&self) -> Vec<StateChange> {
        self.update(|state| {
            state.is_running = false;
            state.current_file = None;
        })
    }

    /// Reset to an idle state
    pub fn reset(&self) -> Vec<StateChange> {
        let mut changes = self.update(|state| *state = RunState::default());
        self.emit(StateChange::StateReset, &mut changes);
        changes
    }
}

/// Detect what changed between two states and generate events
fn detect_changes(old: &RunState, new: &RunState) -> Vec<StateChange> {
    let mut changes = Vec::new();

    if old.is_running != new.is_running && new.is_running {
        changes.push(StateChange::RunStarted {
            total_files: new.total_files,
        });
    }

    // File transitions in scan order
    for (file, to) in &new.file_states {
        let from = old.file_states.get(file).copied();
        match from {
            Some(from) if from != *to => changes.push(StateChange::FileStateChanged {
                file: file.clone(),
                from,
                to: *to,
            }),
            _ => {}
        }
    }

    if old.progress != new.progress
        || old.total_files != new.total_files
        || old.current_file != new.current_file
    {
        changes.push(StateChange::ProgressUpdated {
            current: new.progress,
            total: new.total_files,
            current_file: new.current_file.clone(),
        });
    }

    if old.is_running != new.is_running && !new.is_running {
        changes.push(StateChange::RunFinished {
            rich_success: new.summary.rich_success,
            fallback_success: new.summary.fallback_success,
            failed: new.summary.failed,
        });
    }

    changes
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
        }
    }
}
