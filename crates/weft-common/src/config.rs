use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::action::DEBOUNCE_MS;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeftConfig {
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub recorder: RecorderConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_port() -> u16 {
    9310
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// When true, stopping a session also clears the log. The default keeps
    /// the log around until the next start so it can still be exported.
    #[serde(default)]
    pub clear_log_on_stop: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            clear_log_on_stop: false,
        }
    }
}

fn default_debounce_ms() -> u64 {
    DEBOUNCE_MS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_active_model")]
    pub active_model: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Per-model credentials and overrides, keyed by profile name
    /// ("gpt4", "gpt3.5", "deepseek").
    #[serde(default)]
    pub models: HashMap<String, ModelSettings>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            active_model: default_active_model(),
            output_dir: default_output_dir(),
            models: HashMap::new(),
        }
    }
}

fn default_active_model() -> String {
    "gpt4".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./recordings")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default)]
    pub api_key: String,
    /// Optional endpoint override for the built-in profile.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Optional model-id override for the built-in profile.
    #[serde(default)]
    pub model: Option<String>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./weft.yaml
    /// 2. ~/.weft/config.yaml
    /// 3. Default configuration
    pub async fn load_default() -> Result<WeftConfig, ConfigError> {
        let local_config = PathBuf::from("./weft.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config).await;
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".weft").join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config).await;
            }
        }

        Ok(WeftConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<WeftConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: WeftConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}
