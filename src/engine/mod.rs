//! Content engine contract.
//!
//! The engine (Blender with the VRM importer and the rigging add-on) owns the
//! scene and does all 3D work. The pipeline only sees it through
//! [`EngineSession`], a single stateful session that is reset before each
//! strategy attempt and passed around as `&mut dyn EngineSession` so exactly
//! one caller can drive it at a time.
//!
//! # Components
//!
//! - [`EngineSession`]: The async trait the strategies and the processor call into
//! - [`BlenderEngine`]: Subprocess-backed implementation driving an engine-side pipeline script
//! - [`EngineError`]: Every failure the engine can report, one variant per error class
//! - [`EngineVersion`], [`RiggingSupport`]: Rigging availability and version compatibility

pub mod blender;
pub mod protocol;

pub use blender::BlenderEngine;

use crate::models::ExportFormat;
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by the engine or by the session driving it
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{what} not found: {path}")]
    NotInstalled { what: &'static str, path: Utf8PathBuf },

    #[error("Import failed for {path}: {message}")]
    Import { path: Utf8PathBuf, message: String },

    #[error("Rigging unavailable: {0}")]
    RiggingUnavailable(String),

    #[error("Rigging add-on requires engine {required}, running {running}")]
    RiggingVersionMismatch {
        required: EngineVersion,
        running: EngineVersion,
    },

    #[error("Invalid selection or context for {step}: {message}")]
    RiggingContext { step: RigStep, message: String },

    #[error("Rig step {step} failed: {message}")]
    RigStep { step: RigStep, message: String },

    #[error("{format} export failed: {message}")]
    Export { format: ExportFormat, message: String },

    #[error("{format} export produced no output at {path}")]
    EmptyOutput { format: ExportFormat, path: Utf8PathBuf },

    #[error("Scene handle from session {handle} used in session {current}")]
    StaleScene { handle: u64, current: u64 },

    #[error("{stage} timed out after {timeout:?}")]
    Timeout { stage: String, timeout: Duration },

    #[error("Engine protocol error: {0}")]
    Protocol(String),

    #[error("Engine process error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ordered steps of the rigging pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RigStep {
    AutoScale,
    GuessMarkers,
    MatchToRig,
    BindToRig,
}

impl RigStep {
    pub const ORDERED: [RigStep; 4] = [
        RigStep::AutoScale,
        RigStep::GuessMarkers,
        RigStep::MatchToRig,
        RigStep::BindToRig,
    ];

    /// Operator name understood by the engine-side script.
    pub fn op_name(self) -> &'static str {
        match self {
            RigStep::AutoScale => "auto_scale",
            RigStep::GuessMarkers => "guess_markers",
            RigStep::MatchToRig => "match_to_rig",
            RigStep::BindToRig => "bind_to_rig",
        }
    }
}

impl fmt::Display for RigStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.op_name())
    }
}

/// Engine version as `major.minor.patch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EngineVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl EngineVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Build from a version list such as `[4, 2]` or `[4, 2, 1]`.
    pub fn from_parts(parts: &[u32]) -> Option<Self> {
        match parts {
            [major, minor] => Some(Self::new(*major, *minor, 0)),
            [major, minor, patch, ..] => Some(Self::new(*major, *minor, *patch)),
            _ => None,
        }
    }

    /// Whether an add-on declaring `self` as its minimum runs on `running`.
    ///
    /// Only major and minor are compared; patch releases never block rigging.
    pub fn is_satisfied_by(&self, running: &EngineVersion) -> bool {
        (self.major, self.minor) <= (running.major, running.minor)
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// What the engine reports about the rigging add-on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiggingSupport {
    pub available: bool,
    pub engine_version: EngineVersion,
    /// Minimum engine version declared by the add-on, if it declares one
    pub min_engine_version: Option<EngineVersion>,
}

impl RiggingSupport {
    /// Turn the report into the error a rich attempt should fail with, if any.
    pub fn check(&self) -> Result<(), EngineError> {
        if !self.available {
            return Err(EngineError::RiggingUnavailable(
                "rigging add-on is not installed or could not be enabled".to_string(),
            ));
        }

        if let Some(required) = self.min_engine_version {
            if !required.is_satisfied_by(&self.engine_version) {
                return Err(EngineError::RiggingVersionMismatch {
                    required,
                    running: self.engine_version,
                });
            }
        }

        Ok(())
    }
}

/// A scene loaded into a particular session generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneHandle {
    pub session: u64,
    pub source: Utf8PathBuf,
}

/// Primary objects located in an imported scene.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SceneObjects {
    pub armature: String,
    pub meshes: Vec<String>,
}

/// The single, stateful content engine session.
///
/// Implementations must reject [`SceneHandle`]s from an earlier session
/// generation with [`EngineError::StaleScene`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EngineSession: Send {
    /// Check that the engine and its pipeline entry point can be launched.
    async fn verify_installation(&mut self) -> Result<(), EngineError>;

    /// Discard all scene state.
    async fn reset(&mut self) -> Result<(), EngineError>;

    async fn import_asset(&mut self, path: &Utf8Path) -> Result<SceneHandle, EngineError>;

    /// Locate the primary armature and meshes and apply their transforms.
    async fn prepare_scene(&mut self, scene: &SceneHandle) -> Result<SceneObjects, EngineError>;

    async fn rigging_support(&mut self) -> Result<RiggingSupport, EngineError>;

    async fn run_rig_step(&mut self, scene: &SceneHandle, step: RigStep)
    -> Result<(), EngineError>;

    async fn export_format(
        &mut self,
        scene: &SceneHandle,
        format: ExportFormat,
        dest: &Utf8Path,
    ) -> Result<(), EngineError>;
}
