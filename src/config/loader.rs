//! Configuration Loader
//!
//! Environment-aware loading: file discovery, environment detection and layered merging
//! through the `config` crate.

use super::error::{ConfigResult, ConfigurationError};
use super::PipelineConfig;
use config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const CONFIG_FILE_STEM: &str = "order-pipeline";
const ENV_PREFIX: &str = "ORDER_PIPELINE";

pub struct ConfigManager {
    config: PipelineConfig,
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
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment,
            directory = %config_directory.display(),
            "Loading configuration"
        );

        let config = Self::load_and_merge_config(&config_directory, environment)?;
        config.validate()?;

        let manager = ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        };

        debug!(config = %manager.debug_config(), "Resolved configuration");
        info!(
            environment,
            topic = %manager.config.event_bus.topic,
            partitions = manager.config.event_bus.partitions,
            "✅ Configuration loaded successfully"
        );

        Ok(Arc::new(manager))
    }

    /// Build a manager around an already constructed configuration
    pub fn from_config(config: PipelineConfig, environment: &str) -> ConfigResult<Arc<Self>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: Self::default_config_directory(),
        }))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Configuration as JSON with credentials masked, safe for logs
    pub fn debug_config(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(&self.config).unwrap_or_default();
        Self::sanitize_json_recursive(&mut value);
        value
    }

    fn load_and_merge_config(directory: &Path, environment: &str) -> ConfigResult<PipelineConfig> {
        let defaults = Config::try_from(&PipelineConfig::default())?;

        let mut builder = Config::builder()
            .add_source(defaults)
            .add_source(
                File::from(directory.join(format!("{CONFIG_FILE_STEM}.toml")))
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                File::from(directory.join(format!("{CONFIG_FILE_STEM}.{environment}.toml")))
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        // Conventional override honoured by every deployment tool
        if let Ok(database_url) = env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", database_url)?;
        }

        builder
            .build()?
            .try_deserialize::<PipelineConfig>()
            .map_err(ConfigurationError::from)
    }

    /// ORDER_PIPELINE_ENV || APP_ENV || 'development'
    pub fn detect_environment() -> String {
        env::var("ORDER_PIPELINE_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        let local = PathBuf::from("config");
        if local.is_dir() {
            return local;
        }
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
    }

    fn sanitize_json_recursive(value: &mut serde_json::Value) {
        const SENSITIVE: [&str; 4] = ["password", "secret", "token", "url"];

        match value {
            serde_json::Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    if SENSITIVE.iter().any(|pattern| key_lower.contains(pattern)) {
                        if let serde_json::Value::String(s) = val {
                            *val = serde_json::Value::String(Self::mask(s));
                        }
                    } else {
                        Self::sanitize_json_recursive(val);
                    }
                }
            }
            serde_json::Value::Array(items) => {
                for item in items.iter_mut() {
                    Self::sanitize_json_recursive(item);
                }
            }
            _ => {}
        }
    }

    /// Hide the credentials part of connection strings and any other secret value
    fn mask(raw: &str) -> String {
        match (raw.find("://"), raw.rfind('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                format!("{}://***{}", &raw[..scheme_end], &raw[at..])
            }
            (Some(_), _) => raw.to_string(),
            _ if raw.is_empty() => "[EMPTY]".to_string(),
            _ => "[MASKED]".to_string(),
        }
    }
}
