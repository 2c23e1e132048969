use super::protocol::{self, ReplyKind, ScriptReply};
use super::{EngineError, EngineSession, RigStep, RiggingSupport, SceneHandle, SceneObjects};
use crate::models::{EngineSettings, ExportFormat, StageTimeouts};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

/// File name of the scratch work file holding the session's scene
const WORKFILE_NAME: &str = "session.blend";

/// Engine session backed by one engine process per operation.
///
/// The scene survives between operations in a scratch work file inside
/// `session_dir`: `import` creates it, every later operation loads and
/// re-saves it, and [`reset`](EngineSession::reset) deletes it. Each reset
/// starts a new session generation so scene handles from an earlier attempt
/// are refused instead of silently operating on a different scene.
///
/// Command line for an operation:
///
/// ```text
/// <executable> [extra args] [--background] --python <script> -- <op> <op args..>
/// ```
///
/// `--background` is only passed in headless mode; the rigging add-on needs a
/// 3D viewport and therefore a windowed engine.
pub struct BlenderEngine {
    executable: Utf8PathBuf,
    script: Utf8PathBuf,
    extra_args: Vec<String>,
    background: bool,
    timeouts: StageTimeouts,
    session_dir: Utf8PathBuf,
    generation: u64,
    support: Option<RiggingSupport>,
}

impl BlenderEngine {
    /// Create an engine session.
    ///
    /// # Arguments
    /// * `settings` - Executable, pipeline script and extra arguments
    /// * `timeouts` - Per-stage limits for engine calls
    /// * `session_dir` - Scratch directory for the session work file
    /// * `headless` - Run the engine without a window
    pub fn new(
        settings: &EngineSettings,
        timeouts: StageTimeouts,
        session_dir: Utf8PathBuf,
        headless: bool,
    ) -> Self {
        Self {
            executable: settings.executable.clone(),
            script: settings.script.clone(),
            extra_args: settings.extra_args.clone(),
            background: headless,
            timeouts,
            session_dir,
            generation: 0,
            support: None,
        }
    }

    pub fn workfile(&self) -> Utf8PathBuf {
        self.session_dir.join(WORKFILE_NAME)
    }

    /// Full argument list for one script operation.
    pub fn build_args(&self, op: &str, op_args: &[String]) -> Vec<String> {
        let mut args = self.extra_args.clone();
        if self.background {
            args.push("--background".to_string());
        }
        args.push("--python".to_string());
        args.push(self.script.to_string());
        args.push("--".to_string());
        args.push(op.to_string());
        args.extend(op_args.iter().cloned());
        args
    }

    fn check_handle(&self, scene: &SceneHandle) -> Result<(), EngineError> {
        if scene.session != self.generation {
            return Err(EngineError::StaleScene {
                handle: scene.session,
                current: self.generation,
            });
        }
        Ok(())
    }

    async fn invoke(
        &self,
        stage: &str,
        op: &str,
        op_args: Vec<String>,
        limit: Duration,
    ) -> Result<ScriptReply, EngineError> {
        let args = self.build_args(op, &op_args);
        tracing::debug!("Engine {}: {} {:?}", stage, self.executable, args);

        let mut cmd = Command::new(self.executable.as_std_path());
        cmd.args(&args);

        let (status, stdout, stderr) = run_with_timeout(cmd, stage, limit).await?;

        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            tracing::debug!("[engine] {}", line);
        }

        match protocol::parse_reply(&stdout) {
            Ok(reply) => Ok(reply),
            Err(_) if status != Some(0) => Err(EngineError::Protocol(format!(
                "{} exited with {:?} without a result: {}",
                stage,
                status,
                tail(&stderr, 500)
            ))),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl EngineSession for BlenderEngine {
    async fn verify_installation(&mut self) -> Result<(), EngineError> {
        if !executable_available(&self.executable).await {
            return Err(EngineError::NotInstalled {
                what: "engine executable",
                path: self.executable.clone(),
            });
        }

        if !self.script.is_file() {
            return Err(EngineError::NotInstalled {
                what: "pipeline script",
                path: self.script.clone(),
            });
        }

        Ok(())
    }

    async fn reset(&mut self) -> Result<(), EngineError> {
        let workfile = self.workfile();
        if workfile.exists() {
            tokio::fs::remove_file(&workfile).await?;
        }
        self.generation += 1;
        tracing::debug!("Engine session reset (generation {})", self.generation);
        Ok(())
    }

    async fn import_asset(&mut self, path: &Utf8Path) -> Result<SceneHandle, EngineError> {
        tokio::fs::create_dir_all(&self.session_dir).await?;

        let args = vec![path.to_string(), self.workfile().to_string()];
        let reply = self
            .invoke("import", "import", args, self.timeouts.import())
            .await?;

        if !reply.ok {
            return Err(EngineError::Import {
                path: path.to_path_buf(),
                message: reply.message,
            });
        }

        Ok(SceneHandle {
            session: self.generation,
            source: path.to_path_buf(),
        })
    }

    async fn prepare_scene(&mut self, scene: &SceneHandle) -> Result<SceneObjects, EngineError> {
        self.check_handle(scene)?;

        let args = vec![self.workfile().to_string()];
        let reply = self
            .invoke("prepare", "prepare", args, self.timeouts.prepare())
            .await?;

        if !reply.ok {
            return Err(EngineError::Import {
                path: scene.source.clone(),
                message: reply.message,
            });
        }

        protocol::scene_objects_from(reply.data)
    }

    async fn rigging_support(&mut self) -> Result<RiggingSupport, EngineError> {
        if let Some(support) = &self.support {
            return Ok(support.clone());
        }

        let reply = self
            .invoke("probe", "probe", Vec::new(), self.timeouts.probe())
            .await?;

        if !reply.ok {
            return Err(EngineError::RiggingUnavailable(reply.message));
        }

        let support = protocol::rigging_support_from(reply.data)?;
        tracing::info!(
            "Engine {} reports rigging available={} (minimum engine {:?})",
            support.engine_version,
            support.available,
            support.min_engine_version.map(|v| v.to_string())
        );
        self.support = Some(support.clone());
        Ok(support)
    }

    async fn run_rig_step(
        &mut self,
        scene: &SceneHandle,
        step: RigStep,
    ) -> Result<(), EngineError> {
        self.check_handle(scene)?;

        let args = vec![step.op_name().to_string(), self.workfile().to_string()];
        let reply = self
            .invoke(step.op_name(), "rig", args, self.timeouts.rig_step())
            .await?;

        if reply.ok {
            return Ok(());
        }

        Err(match reply.kind() {
            ReplyKind::Context => EngineError::RiggingContext {
                step,
                message: reply.message,
            },
            ReplyKind::RiggingUnavailable => EngineError::RiggingUnavailable(reply.message),
            _ => EngineError::RigStep {
                step,
                message: reply.message,
            },
        })
    }

    async fn export_format(
        &mut self,
        scene: &SceneHandle,
        format: ExportFormat,
        dest: &Utf8Path,
    ) -> Result<(), EngineError> {
        self.check_handle(scene)?;

        let args = vec![
            format.extension().to_string(),
            self.workfile().to_string(),
            dest.to_string(),
        ];
        let stage = format!("{} export", format);
        let reply = self
            .invoke(&stage, "export", args, self.timeouts.export())
            .await?;

        if !reply.ok {
            return Err(EngineError::Export {
                format,
                message: reply.message,
            });
        }

        Ok(())
    }
}

/// Run a command to completion, killing it when `limit` elapses.
///
/// Returns the exit code and the captured stdout/stderr.
pub async fn run_with_timeout(
    mut cmd: Command,
    stage: &str,
    limit: Duration,
) -> Result<(Option<i32>, String, String), EngineError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let child = cmd.spawn()?;

    let output = timeout(limit, child.wait_with_output())
        .await
        .map_err(|_| {
            tracing::warn!("Engine {} timed out after {:?}", stage, limit);
            EngineError::Timeout {
                stage: stage.to_string(),
                timeout: limit,
            }
        })??;

    let exit_code = output.status.code();
    tracing::debug!(
        "Engine {} finished in {:.2}s with exit code {:?}",
        stage,
        start.elapsed().as_secs_f32(),
        exit_code
    );

    Ok((
        exit_code,
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    ))
}

/// Whether the executable exists as a path or can be found on `PATH`.
pub async fn executable_available(executable: &Utf8Path) -> bool {
    if executable.components().count() > 1 {
        return executable.is_file();
    }

    let finder = if cfg!(target_os = "windows") {
        "where"
    } else {
        "which"
    };

    match Command::new(finder)
        .arg(executable.as_str())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
    {
        Ok(status) => status.success(),
        Err(_) => false,
    }
}

fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(max_chars)).collect()
}
