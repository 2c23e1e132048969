//! Checks that must pass before any file is scanned.

use crate::engine::{EngineError, EngineSession};
use crate::models::WorkingDirectories;
use camino::Utf8PathBuf;
use thiserror::Error;

/// A run cannot start. Always fatal (exit code 1).
#[derive(Error, Debug)]
pub enum PreconditionError {
    #[error("{label} directory is unavailable: {path}")]
    DirectoryUnavailable { label: &'static str, path: Utf8PathBuf },

    #[error("Engine executable not found: {0}")]
    EngineMissing(Utf8PathBuf),

    #[error("Engine pipeline script not found: {0}")]
    ScriptMissing(Utf8PathBuf),

    #[error("Engine check failed: {0}")]
    Engine(EngineError),

    #[error("Could not scan input directory: {0:#}")]
    Scan(anyhow::Error),
}

impl From<EngineError> for PreconditionError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::NotInstalled { what: "pipeline script", path } => {
                PreconditionError::ScriptMissing(path)
            }
            EngineError::NotInstalled { path, .. } => PreconditionError::EngineMissing(path),
            other => PreconditionError::Engine(other),
        }
    }
}

/// Every working directory must exist and be a directory.
pub fn check_directories(dirs: &WorkingDirectories) -> Result<(), PreconditionError> {
    for (label, path) in dirs.all() {
        if !path.is_dir() {
            return Err(PreconditionError::DirectoryUnavailable {
                label,
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}

/// Check the directories, then that the engine and its script can be launched.
pub async fn run(
    dirs: &WorkingDirectories,
    engine: &mut dyn EngineSession,
) -> Result<(), PreconditionError> {
    check_directories(dirs)?;
    engine.verify_installation().await?;
    tracing::info!("Preflight checks passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockEngineSession;
    use camino::Utf8Path;
    use std::fs;
    use tempfile::TempDir;

    fn dirs(root: &Utf8Path) -> WorkingDirectories {
        WorkingDirectories {
            input: root.join("in"),
            output: root.join("out"),
            done: root.join("done"),
            failed: root.join("failed"),
            input_overridden: false,
            output_overridden: false,
            secondary_input: None,
        }
    }

    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        (temp_dir, root)
    }

    #[test]
    fn test_missing_directory() {
        let (_temp, root) = temp_root();
        let dirs = dirs(&root);
        fs::create_dir_all(&dirs.input).unwrap();
        fs::create_dir_all(&dirs.output).unwrap();
        fs::create_dir_all(&dirs.done).unwrap();

        let err = check_directories(&dirs).unwrap_err();
        assert!(matches!(
            err,
            PreconditionError::DirectoryUnavailable { label: "failed", .. }
        ));
    }

    #[test]
    fn test_file_in_place_of_directory() {
        let (_temp, root) = temp_root();
        let dirs = dirs(&root);
        fs::write(&dirs.input, b"not a dir").unwrap();
        assert!(check_directories(&dirs).is_err());
    }

    #[tokio::test]
    async fn test_engine_missing_is_fatal() {
        let (_temp, root) = temp_root();
        let dirs = dirs(&root);
        for (_, dir) in dirs.all() {
            fs::create_dir_all(dir).unwrap();
        }

        let mut engine = MockEngineSession::new();
        engine.expect_verify_installation().returning(|| {
            Err(EngineError::NotInstalled {
                what: "engine executable",
                path: Utf8PathBuf::from("/opt/blender/blender"),
            })
        });

        let err = run(&dirs, &mut engine).await.unwrap_err();
        assert!(matches!(err, PreconditionError::EngineMissing(_)));
    }

    #[tokio::test]
    async fn test_script_missing_is_fatal() {
        let (_temp, root) = temp_root();
        let dirs = dirs(&root);
        for (_, dir) in dirs.all() {
            fs::create_dir_all(dir).unwrap();
        }

        let mut engine = MockEngineSession::new();
        engine.expect_verify_installation().returning(|| {
            Err(EngineError::NotInstalled {
                what: "pipeline script",
                path: Utf8PathBuf::from("/tools/vrm_pipeline.py"),
            })
        });

        let err = run(&dirs, &mut engine).await.unwrap_err();
        assert!(matches!(err, PreconditionError::ScriptMissing(_)));
    }

    #[tokio::test]
    async fn test_directories_checked_before_engine() {
        let (_temp, root) = temp_root();
        let mut engine = MockEngineSession::new();
        engine.expect_verify_installation().never();

        assert!(run(&dirs(&root), &mut engine).await.is_err());
    }
}
