use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid config file at {config_path}: {reason}")]
    ConfigInvalid { config_path: PathBuf, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Rule file in the rule editor's JSON export format.
    pub rules_path: PathBuf,
    /// Location the rules' URL patterns are matched against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Engine tuning. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub debounce_ms: u64,
    pub retry_delays_ms: Vec<u64>,
    pub marker_class: String,
    pub excluded_tags: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            retry_delays_ms: vec![1000, 3000],
            marker_class: "highlighter-bear-mark".to_string(),
            excluded_tags: ["script", "style", "noscript", "textarea"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl Config {
    pub fn new(rules_path: impl Into<PathBuf>) -> Self {
        Self {
            rules_path: rules_path.into(),
            location: None,
            engine: EngineConfig::default(),
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        if let Err(reason) = config.engine.validate() {
            return Err(ConfigError::ConfigInvalid {
                config_path: config_path.to_path_buf(),
                reason,
            });
        }

        // Expand shell variables and tilde in the rules path
        config.rules_path = Self::expand_path(&config.rules_path).unwrap_or(config.rules_path);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/highlighter-bear");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    pub fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

impl EngineConfig {
    /// An empty marker class would make annotated spans indistinguishable
    /// from page content.
    fn validate(&self) -> Result<(), String> {
        if self.marker_class.trim().is_empty() {
            return Err("engine.marker_class must not be empty".to_string());
        }
        if self.marker_class.contains(char::is_whitespace) {
            return Err(format!(
                "engine.marker_class must be a single class name, got {:?}",
                self.marker_class
            ));
        }
        Ok(())
    }
}
