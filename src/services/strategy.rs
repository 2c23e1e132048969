//! Conversion strategies.
//!
//! A strategy turns one input file into an [`ExportableSet`] using the engine.
//! The processor holds an ordered list of strategies and tries them until one
//! succeeds; every attempt starts from a freshly reset session.

use crate::engine::{EngineError, EngineSession, RigStep, SceneHandle, SceneObjects};
use crate::models::{InputFile, StrategyKind};
use async_trait::async_trait;

/// Scene objects ready to be written to the output formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportableSet {
    pub strategy: StrategyKind,
    pub scene: SceneHandle,
    pub objects: SceneObjects,
}

#[async_trait]
pub trait ConversionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn attempt(
        &self,
        engine: &mut dyn EngineSession,
        file: &InputFile,
    ) -> Result<ExportableSet, EngineError>;
}

/// Reset the session, import the file and locate its primary objects.
async fn load_scene(
    engine: &mut dyn EngineSession,
    file: &InputFile,
) -> Result<(SceneHandle, SceneObjects), EngineError> {
    engine.reset().await?;
    let scene = engine.import_asset(&file.path).await?;
    let objects = engine.prepare_scene(&scene).await?;

    tracing::info!(
        "Scene ready: armature '{}', {} mesh(es)",
        objects.armature,
        objects.meshes.len()
    );
    Ok((scene, objects))
}

/// Full rigging before export.
///
/// Rigging support is checked before the file is imported. In headless mode
/// the rigging add-on cannot run (it needs a 3D viewport), so the attempt
/// fails immediately without touching the engine.
#[derive(Debug, Clone, Default)]
pub struct RichStrategy {
    headless: bool,
}

impl RichStrategy {
    pub fn new(headless: bool) -> Self {
        Self { headless }
    }
}

#[async_trait]
impl ConversionStrategy for RichStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Rich
    }

    async fn attempt(
        &self,
        engine: &mut dyn EngineSession,
        file: &InputFile,
    ) -> Result<ExportableSet, EngineError> {
        if self.headless {
            return Err(EngineError::RiggingUnavailable(
                "headless mode, rigging needs a 3D viewport".to_string(),
            ));
        }

        // Engines cache the probe, so an unusable add-on costs no import
        engine.rigging_support().await?.check()?;

        let (scene, objects) = load_scene(engine, file).await?;

        for (index, step) in RigStep::ORDERED.iter().enumerate() {
            tracing::info!(
                "Rig step {}/{}: {}",
                index + 1,
                RigStep::ORDERED.len(),
                step
            );
            engine.run_rig_step(&scene, *step).await?;
        }

        Ok(ExportableSet {
            strategy: StrategyKind::Rich,
            scene,
            objects,
        })
    }
}

/// Export of the as-imported armature and meshes, no rigging.
#[derive(Debug, Clone, Default)]
pub struct FallbackStrategy;

#[async_trait]
impl ConversionStrategy for FallbackStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Fallback
    }

    async fn attempt(
        &self,
        engine: &mut dyn EngineSession,
        file: &InputFile,
    ) -> Result<ExportableSet, EngineError> {
        let (scene, objects) = load_scene(engine, file).await?;
        Ok(ExportableSet {
            strategy: StrategyKind::Fallback,
            scene,
            objects,
        })
    }
}

/// Strategies in selection order: rich first, fallback last.
pub fn default_strategies(headless: bool) -> Vec<Box<dyn ConversionStrategy>> {
    vec![
        Box::new(RichStrategy::new(headless)),
        Box::new(FallbackStrategy),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineVersion, MockEngineSession, RiggingSupport};
    use camino::Utf8PathBuf;
    use mockall::Sequence;

    fn file() -> InputFile {
        InputFile::new(Utf8PathBuf::from("/in/avatar.vrm"))
    }

    fn support(available: bool, min: Option<EngineVersion>) -> RiggingSupport {
        RiggingSupport {
            available,
            engine_version: EngineVersion::new(4, 2, 0),
            min_engine_version: min,
        }
    }

    fn expect_scene(engine: &mut MockEngineSession) {
        engine.expect_reset().times(1).returning(|| Ok(()));
        engine.expect_import_asset().times(1).returning(|path| {
            Ok(SceneHandle {
                session: 1,
                source: path.to_path_buf(),
            })
        });
        engine.expect_prepare_scene().times(1).returning(|_| {
            Ok(SceneObjects {
                armature: "Armature".to_string(),
                meshes: vec!["Body".to_string()],
            })
        });
    }

    #[tokio::test]
    async fn test_rich_runs_steps_in_order() {
        let mut engine = MockEngineSession::new();
        expect_scene(&mut engine);
        engine
            .expect_rigging_support()
            .returning(|| Ok(support(true, None)));

        let mut seq = Sequence::new();
        for step in RigStep::ORDERED {
            engine
                .expect_run_rig_step()
                .withf(move |_, s| *s == step)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| Ok(()));
        }

        let set = RichStrategy::new(false)
            .attempt(&mut engine, &file())
            .await
            .unwrap();
        assert_eq!(set.strategy, StrategyKind::Rich);
        assert_eq!(set.objects.armature, "Armature");
    }

    #[tokio::test]
    async fn test_rich_headless_never_touches_engine() {
        let mut engine = MockEngineSession::new();
        engine.expect_reset().never();
        engine.expect_import_asset().never();

        let result = RichStrategy::new(true).attempt(&mut engine, &file()).await;
        assert!(matches!(result, Err(EngineError::RiggingUnavailable(_))));
    }

    #[tokio::test]
    async fn test_rich_version_mismatch_skips_import_and_rigging() {
        let mut engine = MockEngineSession::new();
        engine.expect_reset().never();
        engine.expect_import_asset().never();
        engine
            .expect_rigging_support()
            .returning(|| Ok(support(true, Some(EngineVersion::new(5, 0, 0)))));
        engine.expect_run_rig_step().never();

        let result = RichStrategy::new(false).attempt(&mut engine, &file()).await;
        assert!(matches!(
            result,
            Err(EngineError::RiggingVersionMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_rich_stops_at_failing_step() {
        let mut engine = MockEngineSession::new();
        expect_scene(&mut engine);
        engine
            .expect_rigging_support()
            .returning(|| Ok(support(true, None)));
        engine
            .expect_run_rig_step()
            .withf(|_, s| *s == RigStep::AutoScale)
            .times(1)
            .returning(|_, _| Ok(()));
        engine
            .expect_run_rig_step()
            .withf(|_, s| *s == RigStep::GuessMarkers)
            .times(1)
            .returning(|_, step| {
                Err(EngineError::RiggingContext {
                    step,
                    message: "no active object".to_string(),
                })
            });

        let result = RichStrategy::new(false).attempt(&mut engine, &file()).await;
        assert!(matches!(
            result,
            Err(EngineError::RiggingContext {
                step: RigStep::GuessMarkers,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_fallback_never_rigs() {
        let mut engine = MockEngineSession::new();
        expect_scene(&mut engine);
        engine.expect_rigging_support().never();
        engine.expect_run_rig_step().never();

        let set = FallbackStrategy
            .attempt(&mut engine, &file())
            .await
            .unwrap();
        assert_eq!(set.strategy, StrategyKind::Fallback);
    }

    #[tokio::test]
    async fn test_fallback_import_failure() {
        let mut engine = MockEngineSession::new();
        engine.expect_reset().returning(|| Ok(()));
        engine.expect_import_asset().returning(|path| {
            Err(EngineError::Import {
                path: path.to_path_buf(),
                message: "not a VRM".to_string(),
            })
        });
        engine.expect_prepare_scene().never();

        let result = FallbackStrategy.attempt(&mut engine, &file()).await;
        assert!(matches!(result, Err(EngineError::Import { .. })));
    }

    #[test]
    fn test_default_strategy_order() {
        let kinds: Vec<_> = default_strategies(false).iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, vec![StrategyKind::Rich, StrategyKind::Fallback]);
    }
}
