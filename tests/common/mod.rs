//! Shared fixtures for integration tests: a scripted engine and a project layout.

#![allow(dead_code)]

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{HashMap, HashSet};
use std::fs;
use tempfile::TempDir;
use vrmbatch::engine::{
    EngineError, EngineSession, EngineVersion, RigStep, RiggingSupport, SceneHandle, SceneObjects,
};
use vrmbatch::models::ExportFormat;
use vrmbatch::{Pipeline, PipelineConfig, PipelineResult, RunOptions};

/// How an export of one format should behave for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportBehavior {
    Fail,
    Empty,
}

/// In-memory engine whose failures are scripted per input file name.
#[derive(Debug, Default)]
pub struct FakeEngine {
    generation: u64,
    loaded: Option<String>,
    rigged: bool,

    pub missing_install: bool,
    pub rigging_available: bool,
    import_failures: HashSet<String>,
    rig_failures: HashMap<String, RigStep>,
    version_mismatch: bool,
    export_behavior: HashMap<(String, ExportFormat), ExportBehavior>,
    export_all_fail: HashSet<String>,

    /// Every call as `<op> <file>` in order
    pub calls: Vec<String>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            rigging_available: true,
            ..Self::default()
        }
    }

    pub fn missing_install(mut self) -> Self {
        self.missing_install = true;
        self
    }

    pub fn without_rigging(mut self) -> Self {
        self.rigging_available = false;
        self
    }

    pub fn fail_import(mut self, file: &str) -> Self {
        self.import_failures.insert(file.to_string());
        self
    }

    pub fn fail_rig(mut self, file: &str, step: RigStep) -> Self {
        self.rig_failures.insert(file.to_string(), step);
        self
    }

    /// The rigging add-on requires a newer engine than the one running.
    pub fn version_mismatch(mut self) -> Self {
        self.version_mismatch = true;
        self
    }

    pub fn fail_export(mut self, file: &str, format: ExportFormat) -> Self {
        self.export_behavior
            .insert((file.to_string(), format), ExportBehavior::Fail);
        self
    }

    pub fn empty_export(mut self, file: &str, format: ExportFormat) -> Self {
        self.export_behavior
            .insert((file.to_string(), format), ExportBehavior::Empty);
        self
    }

    pub fn fail_all_exports(mut self, file: &str) -> Self {
        self.export_all_fail.insert(file.to_string());
        self
    }

    pub fn count_calls(&self, op: &str) -> usize {
        self.calls
            .iter()
            .filter(|c| c.split(' ').next() == Some(op))
            .count()
    }

    fn check(&self, scene: &SceneHandle) -> Result<String, EngineError> {
        if scene.session != self.generation {
            return Err(EngineError::StaleScene {
                handle: scene.session,
                current: self.generation,
            });
        }
        self.loaded
            .clone()
            .ok_or_else(|| EngineError::Protocol("no scene loaded".to_string()))
    }

    fn record(&mut self, op: &str) {
        let file = self.loaded.clone().unwrap_or_default();
        self.calls.push(format!("{} {}", op, file));
    }
}

#[async_trait]
impl EngineSession for FakeEngine {
    async fn verify_installation(&mut self) -> Result<(), EngineError> {
        self.calls.push("verify".to_string());
        if self.missing_install {
            return Err(EngineError::NotInstalled {
                what: "engine executable",
                path: Utf8PathBuf::from("/nowhere/blender"),
            });
        }
        Ok(())
    }

    async fn reset(&mut self) -> Result<(), EngineError> {
        self.generation += 1;
        self.loaded = None;
        self.rigged = false;
        self.calls.push("reset".to_string());
        Ok(())
    }

    async fn import_asset(&mut self, path: &Utf8Path) -> Result<SceneHandle, EngineError> {
        let name = path.file_name().unwrap_or_default().to_string();
        self.calls.push(format!("import {}", name));
        if self.import_failures.contains(&name) {
            return Err(EngineError::Import {
                path: path.to_path_buf(),
                message: "not a valid VRM".to_string(),
            });
        }
        self.loaded = Some(name);
        Ok(SceneHandle {
            session: self.generation,
            source: path.to_path_buf(),
        })
    }

    async fn prepare_scene(&mut self, scene: &SceneHandle) -> Result<SceneObjects, EngineError> {
        self.check(scene)?;
        self.record("prepare");
        Ok(SceneObjects {
            armature: "Armature".to_string(),
            meshes: vec!["Body".to_string(), "Face".to_string()],
        })
    }

    async fn rigging_support(&mut self) -> Result<RiggingSupport, EngineError> {
        self.record("probe");
        Ok(RiggingSupport {
            available: self.rigging_available,
            engine_version: EngineVersion::new(4, 2, 3),
            min_engine_version: Some(if self.version_mismatch {
                EngineVersion::new(4, 4, 0)
            } else {
                EngineVersion::new(4, 2, 0)
            }),
        })
    }

    async fn run_rig_step(&mut self, scene: &SceneHandle, step: RigStep) -> Result<(), EngineError> {
        let file = self.check(scene)?;
        self.record(step.op_name());
        if self.rig_failures.get(&file) == Some(&step) {
            return Err(EngineError::RiggingContext {
                step,
                message: "no armature selected".to_string(),
            });
        }
        if step == RigStep::BindToRig {
            self.rigged = true;
        }
        Ok(())
    }

    async fn export_format(
        &mut self,
        scene: &SceneHandle,
        format: ExportFormat,
        dest: &Utf8Path,
    ) -> Result<(), EngineError> {
        let file = self.check(scene)?;
        self.record(&format!("export_{}", format.extension()));

        if self.export_all_fail.contains(&file) {
            return Err(EngineError::Export {
                format,
                message: "exporter crashed".to_string(),
            });
        }

        match self.export_behavior.get(&(file, format)) {
            Some(ExportBehavior::Fail) => Err(EngineError::Export {
                format,
                message: "exporter crashed".to_string(),
            }),
            Some(ExportBehavior::Empty) => {
                fs::write(dest, b"")?;
                Ok(())
            }
            None => {
                let body = if self.rigged { "rigged" } else { "as-imported" };
                fs::write(dest, body)?;
                if format == ExportFormat::Obj {
                    fs::write(dest.with_extension("mtl"), "newmtl Body\nKd 1 1 1\n")?;
                }
                Ok(())
            }
        }
    }
}

/// A temporary project with a base directory under a root.
pub struct Project {
    _temp: TempDir,
    pub root: Utf8PathBuf,
    pub base: Utf8PathBuf,
}

impl Project {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        let base = root.join("tools");
        fs::create_dir_all(&base).unwrap();
        Self {
            _temp: temp,
            root,
            base,
        }
    }

    pub fn dir(&self, name: &str) -> Utf8PathBuf {
        self.base.join(name)
    }

    /// Write input files into `<base>/vrm_in`.
    pub fn add_inputs(&self, names: &[&str]) {
        let input = self.dir("vrm_in");
        fs::create_dir_all(&input).unwrap();
        for name in names {
            fs::write(input.join(name), b"glTF").unwrap();
        }
    }

    pub fn options(&self, headless: bool) -> RunOptions {
        RunOptions {
            base_dir: self.base.clone(),
            input_dir: None,
            output_dir: None,
            headless,
        }
    }
}

/// Files directly inside `dir`, sorted.
pub fn list(dir: &Utf8Path) -> Vec<String> {
    let Ok(entries) = dir.read_dir_utf8() else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .flatten()
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string())
        .collect();
    names.sort();
    names
}

pub async fn run_pipeline(
    config: PipelineConfig,
    options: RunOptions,
    engine: &mut FakeEngine,
) -> PipelineResult {
    let pipeline = Pipeline::new(config, options);
    let dirs = pipeline.resolve_directories();
    pipeline.run(engine, dirs).await
}
