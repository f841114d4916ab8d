//! Configuration Loader
//!
//! Environment-aware configuration loading built on the `config` crate.
//! Handles file discovery, environment detection and override merging.

use super::error::{ConfigResult, ConfigurationError};
use super::PunishmentsConfig;
use config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const ENV_PREFIX: &str = "PUNISHMENTS";

/// Loaded configuration together with the environment it was resolved for
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: PunishmentsConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let mut config = Self::load_and_merge_config(&config_directory, environment)?;

        // DATABASE_URL is the conventional override for the connection string
        if let Ok(url) = env::var("DATABASE_URL") {
            config.database.url = url;
        }

        config.validate()?;

        info!(
            environment = environment,
            backend = %config.store.backend,
            database_url = %config.database.redacted_url(),
            players_collection = %config.store.players_collection,
            reasons_collection = %config.store.reasons_collection,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration, e.g. one assembled by a host
    pub fn from_config(config: PunishmentsConfig, environment: &str) -> ConfigResult<Arc<Self>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: PathBuf::from("config"),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &PunishmentsConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect the environment from `PUNISHMENTS_ENV`, then `APP_ENV`
    pub fn detect_environment() -> String {
        crate::logging::get_environment()
    }

    fn load_and_merge_config(
        config_directory: &Path,
        environment: &str,
    ) -> ConfigResult<PunishmentsConfig> {
        let defaults = Config::try_from(&PunishmentsConfig::default())
            .map_err(|e| ConfigurationError::load_error("defaults", e))?;

        let base_file = config_directory.join("punishments.toml");
        let env_file = config_directory.join(format!("punishments.{environment}.toml"));

        for file in [&base_file, &env_file] {
            if file.exists() {
                debug!("Merging configuration file: {}", file.display());
            }
        }

        let merged = Config::builder()
            .add_source(defaults)
            .add_source(File::new(&base_file.to_string_lossy(), FileFormat::Toml).required(false))
            .add_source(File::new(&env_file.to_string_lossy(), FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::load_error(config_directory.display().to_string(), e))?;

        merged
            .try_deserialize::<PunishmentsConfig>()
            .map_err(ConfigurationError::deserialize_error)
    }
}
