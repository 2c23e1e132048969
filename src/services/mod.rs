//! Services module - the batch conversion pipeline stages.
//!
//! Every stage is framework-agnostic and talks to the content engine only
//! through [`crate::engine::EngineSession`], so each can be tested with a
//! mocked or scripted engine.
//!
//! # Components
//!
//! - [`PathResolver`]: Resolves the input, output, done and failed directories
//! - [`InputScanner`]: Lists the files to convert, with a secondary input location
//! - [`RichStrategy`], [`FallbackStrategy`]: The two ways of producing an exportable scene
//! - [`FileProcessor`]: Strategy selection with fallback, then the per-format export fan-out
//! - [`TextureCollator`]: Gathers OBJ textures next to the exported model
//! - [`BatchRunner`]: Sequential loop that moves each source to done or failed
//! - [`ResultReporter`]: Exit status and the end-of-run summary
//! - [`preflight`]: Fatal precondition checks run before scanning
//!
//! # Flow
//!
//! ```text
//! PathResolver -> preflight -> InputScanner -> BatchRunner
//!                                                  |
//!                                  FileProcessor (per file)
//!                                  |- Rich, then Fallback
//!                                  |- FBX, GLB, DAE, OBJ
//!                                  `- export report
//! ```

pub mod export_report;
pub mod paths;
pub mod preflight;
pub mod processor;
pub mod report;
pub mod runner;
pub mod scanner;
pub mod strategy;
pub mod textures;

pub use paths::PathResolver;
pub use preflight::PreconditionError;
pub use processor::{ExportOutcome, FileProcessor, FileReport};
pub use report::ResultReporter;
pub use runner::{BatchResult, BatchRunner, FileResult, MoveError};
pub use scanner::InputScanner;
pub use strategy::{
    ConversionStrategy, ExportableSet, FallbackStrategy, RichStrategy, default_strategies,
};
pub use textures::{TextureCollation, TextureCollator};
