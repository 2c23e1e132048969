use crate::models::PipelineConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// File name looked up in the base directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "vrmbatch.yaml";

/// Configuration manager for loading and saving the YAML pipeline configuration.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Manager for `<config_dir>/vrmbatch.yaml`.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Self {
        Self {
            config_path: config_dir.as_ref().join(CONFIG_FILE_NAME),
        }
    }

    /// Manager for an explicit configuration file.
    pub fn from_file<P: AsRef<Utf8Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    /// Load the configuration file.
    ///
    /// # Returns
    /// The loaded PipelineConfig, or defaults if the file doesn't exist
    pub fn load_config(&self) -> Result<PipelineConfig> {
        if !self.config_path.exists() {
            tracing::warn!(
                "Config file not found at {}, using defaults",
                self.config_path
            );
            return Ok(PipelineConfig::default());
        }

        let file_contents = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config: {}", self.config_path))?;

        let config: PipelineConfig = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse config: {}", self.config_path))?;

        tracing::info!("Loaded config from {}", self.config_path);
        Ok(config)
    }

    /// Save the configuration file, creating its directory if needed.
    pub fn save_config(&self, config: &PipelineConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {}", parent))?;
            }
        }

        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize config to YAML")?;

        fs::write(&self.config_path, yaml_string)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExportFormat;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        (ConfigManager::new(&config_dir), temp_dir)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();
        assert_eq!(manager.load_config().unwrap(), PipelineConfig::default());
    }

    #[test]
    fn test_load_save_config() {
        let (manager, _temp_dir) = create_test_config_manager();

        let mut config = PipelineConfig::default();
        config.formats = vec![ExportFormat::Glb];
        config.timeouts.export_secs = 42;
        config.retry_fallback_on_export_failure = false;
        manager.save_config(&config).unwrap();

        assert_eq!(manager.load_config().unwrap(), config);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(manager.config_path(), "formats: [stl]\n").unwrap();

        let err = manager.load_config().unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config"));
    }

    #[test]
    fn test_from_file_creates_parent_on_save() {
        let temp_dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(temp_dir.path().join("nested").join("custom.yaml"))
            .unwrap();
        let manager = ConfigManager::from_file(&path);

        manager.save_config(&PipelineConfig::default()).unwrap();
        assert!(path.is_file());
    }
}
