//! Data models for the vrmbatch pipeline.
//!
//! This module contains the core data structures shared by the services:
//! - [`PipelineConfig`]: Engine location, directory names, formats and timeouts loaded from `vrmbatch.yaml`
//! - [`ExportFormat`]: The output formats and their deterministic destinations
//! - [`WorkingDirectories`] and [`InputFile`]: What a run operates on
//! - [`ConversionOutcome`], [`RunSummary`], [`ExitStatus`]: What a run produces
//! - [`RunState`]: Live progress of a run, owned by [`crate::state::StateManager`]
//!
//! # Architecture Note
//!
//! The models are designed to be:
//! - **Serializable**: Config structs derive `Serialize`/`Deserialize` for YAML persistence
//! - **Immutable once produced**: Outcomes and input files are never mutated after creation;
//!   only [`RunSummary`] is updated, additively, by the batch runner

pub mod app_state;
pub mod config;
pub mod format;
pub mod run;

pub use app_state::RunState;
pub use config::{DirectoryNames, EngineSettings, LoggingSettings, PipelineConfig, StageTimeouts};
pub use format::ExportFormat;
pub use run::{
    ConversionOutcome, ExitStatus, FailureReason, FileState, InputFile, RunSummary, StrategyKind,
    WorkingDirectories, claim_base_name, safe_name,
};

