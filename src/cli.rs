//! Command line interface.

use crate::models::PipelineConfig;
use crate::pipeline::RunOptions;
use camino::Utf8PathBuf;
use clap::Parser;

/// Batch-convert VRM avatars to FBX, GLB, DAE and OBJ.
///
/// Each file is rigged and exported when possible, otherwise exported as
/// imported. Sources move to the done directory on success and to the failed
/// directory otherwise.
///
/// Exit codes: 0 all files succeeded, 2 some files failed, 1 the run could not start.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "vrmbatch", version, about, long_about = None)]
pub struct Cli {
    /// Run the engine without a window (rigging is skipped)
    #[arg(long)]
    pub headless: bool,

    /// Input directory, used as given
    pub input_dir: Option<Utf8PathBuf>,

    /// Output directory, used as given
    pub output_dir: Option<Utf8PathBuf>,

    /// Directory the default folders and the config file are looked up in
    #[arg(long, value_name = "DIR")]
    pub base_dir: Option<Utf8PathBuf>,

    /// Configuration file [default: <base-dir>/vrmbatch.yaml]
    #[arg(long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Engine executable, overrides the config file
    #[arg(long, value_name = "EXE")]
    pub engine: Option<Utf8PathBuf>,

    /// Engine-side pipeline script, overrides the config file
    #[arg(long, value_name = "FILE")]
    pub script: Option<Utf8PathBuf>,

    /// Debug level logging
    #[arg(long)]
    pub debug: bool,

    /// No console logging, only the final summary
    #[arg(long)]
    pub quiet: bool,
}

impl Cli {
    /// Apply command line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(engine) = &self.engine {
            config.engine.executable = engine.clone();
        }
        if let Some(script) = &self.script {
            config.engine.script = script.clone();
        }
        if self.debug {
            config.logging.debug = true;
        }
        if self.quiet {
            config.logging.console = false;
        }
    }

    pub fn run_options(&self, base_dir: Utf8PathBuf) -> RunOptions {
        RunOptions {
            base_dir,
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            headless: self.headless,
        }
    }
}
