use crate::models::ExportFormat;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pipeline configuration from `vrmbatch.yaml`
///
/// Every section has defaults so a missing or partial file still yields a
/// usable configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub directories: DirectoryNames,

    /// Extension of the files to convert, without the leading dot
    #[serde(default = "default_input_extension")]
    pub input_extension: String,

    /// Export formats in the order they are written
    #[serde(default = "default_formats")]
    pub formats: Vec<ExportFormat>,

    #[serde(default)]
    pub timeouts: StageTimeouts,

    /// Try the next strategy when a strategy succeeded but every export failed
    #[serde(default = "default_true")]
    pub retry_fallback_on_export_failure: bool,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            engine: EngineSettings::default(),
            directories: DirectoryNames::default(),
            input_extension: default_input_extension(),
            formats: default_formats(),
            timeouts: StageTimeouts::default(),
            retry_fallback_on_export_failure: true,
            logging: LoggingSettings::default(),
        }
    }
}

/// Location of the content engine and its pipeline script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_engine_executable")]
    pub executable: Utf8PathBuf,

    /// Engine-side pipeline script, relative paths resolve against the base directory
    #[serde(default = "default_engine_script")]
    pub script: Utf8PathBuf,

    /// Extra arguments passed to the engine before `--python`
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            executable: default_engine_executable(),
            script: default_engine_script(),
            extra_args: Vec::new(),
        }
    }
}

/// Default directory names looked up under the base directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryNames {
    #[serde(default = "default_input_dir")]
    pub input: String,

    #[serde(default = "default_output_dir")]
    pub output: String,

    #[serde(default = "default_done_dir")]
    pub done: String,

    #[serde(default = "default_failed_dir")]
    pub failed: String,
}

impl Default for DirectoryNames {
    fn default() -> Self {
        Self {
            input: default_input_dir(),
            output: default_output_dir(),
            done: default_done_dir(),
            failed: default_failed_dir(),
        }
    }
}

/// Per-stage limits for engine calls, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTimeouts {
    #[serde(default = "default_probe_secs")]
    pub probe_secs: u64,

    #[serde(default = "default_import_secs")]
    pub import_secs: u64,

    #[serde(default = "default_prepare_secs")]
    pub prepare_secs: u64,

    #[serde(default = "default_rig_step_secs")]
    pub rig_step_secs: u64,

    #[serde(default = "default_export_secs")]
    pub export_secs: u64,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            probe_secs: default_probe_secs(),
            import_secs: default_import_secs(),
            prepare_secs: default_prepare_secs(),
            rig_step_secs: default_rig_step_secs(),
            export_secs: default_export_secs(),
        }
    }
}

impl StageTimeouts {
    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }

    pub fn import(&self) -> Duration {
        Duration::from_secs(self.import_secs)
    }

    pub fn prepare(&self) -> Duration {
        Duration::from_secs(self.prepare_secs)
    }

    pub fn rig_step(&self) -> Duration {
        Duration::from_secs(self.rig_step_secs)
    }

    pub fn export(&self) -> Duration {
        Duration::from_secs(self.export_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log directory; defaults to `<output>/logs` when unset
    #[serde(default)]
    pub directory: Option<Utf8PathBuf>,

    #[serde(default = "default_log_prefix")]
    pub prefix: String,

    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_true")]
    pub console: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: None,
            prefix: default_log_prefix(),
            debug: false,
            console: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_input_extension() -> String {
    "vrm".to_string()
}

fn default_formats() -> Vec<ExportFormat> {
    ExportFormat::ALL.to_vec()
}

fn default_engine_executable() -> Utf8PathBuf {
    Utf8PathBuf::from("blender")
}

fn default_engine_script() -> Utf8PathBuf {
    Utf8PathBuf::from("vrm_pipeline.py")
}

fn default_input_dir() -> String {
    "vrm_in".to_string()
}

fn default_output_dir() -> String {
    "fbx_out".to_string()
}

fn default_done_dir() -> String {
    "vrm_done".to_string()
}

fn default_failed_dir() -> String {
    "vrm_failed".to_string()
}

fn default_probe_secs() -> u64 {
    60
}

fn default_import_secs() -> u64 {
    300
}

fn default_prepare_secs() -> u64 {
    120
}

fn default_rig_step_secs() -> u64 {
    600
}

fn default_export_secs() -> u64 {
    300
}

fn default_log_prefix() -> String {
    "vrm_pipeline".to_string()
}
