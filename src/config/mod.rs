// Required external crates for configuration management and serialization
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Configuration for the hosted translation model
#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// Identifier of the pretrained checkpoint, for logging only
    pub name: String,
    /// Directory holding config.json, model.safetensors and tokenizer.json
    pub directory: PathBuf,
}

/// Configuration for text generation
#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// Hard cap on the decoder sequence length, in tokens
    pub max_target_length: usize,
}

/// Configuration for the HTTP server
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

/// Configuration for application logging
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Optional log file directory
    pub file: Option<PathBuf>,
}

/// Main settings struct that contains all configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Model-related settings
    pub model: ModelConfig,
    /// Generation-related settings
    pub generation: GenerationConfig,
    /// Server-related settings
    pub server: ServerConfig,
    /// Logging-related settings
    pub logging: LoggingConfig,
}

impl Settings {
    /// Creates a new Settings instance by loading config from multiple
    /// sources in the following order of precedence (highest to lowest):
    /// 1. Environment variables prefixed with NLLB_SERVE
    /// 2. Local config file (config/local.toml) if present
    /// 3. Default config file (config/default.toml) if present
    /// 4. Built-in defaults
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("model.name", "facebook/nllb-200-distilled-600M")?
            .set_default("model.directory", "models/nllb-200-distilled-600M")?
            .set_default("generation.max_target_length", 512i64)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3001i64)?
            .set_default("logging.level", "info")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("NLLB_SERVE").separator("__"))
            .build()?
            .try_deserialize::<Settings>()?;

        // Validate settings after loading
        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message(
                "Port must be between 1 and 65535".to_string(),
            ));
        }

        if self.generation.max_target_length == 0 {
            return Err(ConfigError::Message(
                "max_target_length must be greater than 0".to_string(),
            ));
        }

        // Validate logging level
        match self.logging.level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            other => {
                return Err(ConfigError::Message(format!(
                    "Invalid logging level: {}. Must be one of: error, warn, info, debug, trace",
                    other
                )))
            }
        }

        // Create log file directory if configured and doesn't exist
        if let Some(log_dir) = &self.logging.file {
            if !log_dir.exists() {
                std::fs::create_dir_all(log_dir).map_err(|e| {
                    ConfigError::Message(format!(
                        "Failed to create log directory at {}: {}",
                        log_dir.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(())
    }
}
