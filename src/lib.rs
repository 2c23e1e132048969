// vrmbatch - batch conversion of VRM avatars with a rigging fallback
//
// This is the library crate containing the pipeline, the engine contract and
// the data structures. The binary crate (main.rs) provides the CLI entry point.

pub mod cli;
pub mod config;
pub mod engine;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use engine::{BlenderEngine, EngineError, EngineSession};
pub use models::{ExitStatus, PipelineConfig, RunSummary};
pub use pipeline::{Pipeline, PipelineResult, RunOptions};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
