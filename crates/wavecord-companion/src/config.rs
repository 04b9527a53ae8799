use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::CompanionError;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Companion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanionConfig {
    pub server: ServerConfig,
    pub discord: DiscordConfig,
    pub artwork: ArtworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub app_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtworkConfig {
    pub enabled: bool,
}

impl CompanionConfig {
    /// Load config: user file if it exists, otherwise built-in defaults.
    pub fn load() -> Result<Self, CompanionError> {
        let user_path = Self::config_path();
        if user_path.exists() {
            let user_str = std::fs::read_to_string(&user_path)
                .map_err(|e| CompanionError::Config(e.to_string()))?;
            toml::from_str(&user_str).map_err(|e| CompanionError::Config(e.to_string()))
        } else {
            toml::from_str(DEFAULT_CONFIG).map_err(|e| CompanionError::Config(e.to_string()))
        }
    }

    /// Load config from an explicit file path.
    pub fn load_from(path: &PathBuf) -> Result<Self, CompanionError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CompanionError::Config(e.to_string()))?;
        toml::from_str(&content).map_err(|e| CompanionError::Config(e.to_string()))
    }

    /// Save current config to the user config file.
    pub fn save(&self) -> Result<(), CompanionError> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CompanionError::Config(e.to_string()))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Path to the user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", "wavecord")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Socket address string for the HTTP listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}

impl Default for CompanionConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = CompanionConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert!(config.artwork.enabled);
        assert!(!config.discord.app_id.is_empty());
    }

    #[test]
    fn test_roundtrip() {
        let config = CompanionConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: CompanionConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.server.port, config.server.port);
        assert_eq!(deserialized.listen_addr(), "127.0.0.1:3000");
    }
}
