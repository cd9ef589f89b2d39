//! JSON Configuration Management
//!
//! Handles reading and writing the application configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::settings::AppConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{config_path, ensure_dir, resolve_data_dir};

/// Configuration service for managing app settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: AppConfig,
}

impl ConfigService {
    /// Create a config service for the resolved data directory
    pub fn new() -> AppResult<Self> {
        Self::open(&resolve_data_dir()?)
    }

    /// Load `<data_dir>/config.json`, creating it with defaults when missing.
    ///
    /// Environment overrides are applied after loading and are never written
    /// back to disk.
    pub fn open(data_dir: &Path) -> AppResult<Self> {
        ensure_dir(data_dir)?;

        let config_path = config_path(data_dir);
        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            let mut default_config = AppConfig::default();
            default_config.data_dir = data_dir.to_path_buf();
            Self::save_to_file(&config_path, &default_config)?;
            default_config
        };

        config.data_dir = data_dir.to_path_buf();
        config.apply_env();
        config.validate().map_err(AppError::validation)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<AppConfig> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate().map_err(AppError::validation)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &Path, config: &AppConfig) -> AppResult<()> {
        config.validate().map_err(AppError::validation)?;
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// Get a clone of the current configuration
    pub fn get_config_clone(&self) -> AppConfig {
        self.config.clone()
    }

    /// Path of the backing file
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Check if the config service is healthy
    pub fn is_healthy(&self) -> bool {
        self.config_path.exists() && self.config.validate().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_config_file() -> (NamedTempFile, PathBuf) {
        let mut file = NamedTempFile::new().unwrap();
        let config = AppConfig::default();
        let content = serde_json::to_string_pretty(&config).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let path = file.path().to_path_buf();
        (file, path)
    }

    #[test]
    fn test_load_config_from_file() {
        let (_file, path) = create_test_config_file();
        let config = ConfigService::load_from_file(&path).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:5050");
    }

    #[test]
    fn test_save_config_to_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        let mut config = AppConfig::default();
        config.session_ttl_secs = 120;

        ConfigService::save_to_file(&path, &config).unwrap();

        assert!(path.exists());
        let loaded = ConfigService::load_from_file(&path).unwrap();
        assert_eq!(loaded.session_ttl_secs, 120);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"bind_address":"nowhere"}"#).unwrap();

        let err = ConfigService::load_from_file(&path).unwrap_err();
        assert_eq!(err.code(), "VALIDATION");
    }

    #[test]
    fn test_open_creates_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let data_dir = temp_dir.path().join("data");

        let service = ConfigService::open(&data_dir).unwrap();
        assert!(service.config_path().exists());
        assert!(service.is_healthy());
        assert_eq!(service.get_config().data_dir, data_dir);
    }
}
