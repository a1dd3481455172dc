//! Application configuration file handling.
//!
//! The file is optional. A missing file degrades to the built-in defaults so the
//! console always starts; a file that exists but does not parse is an error.

use crate::mqtt::config::MqttConfig;
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Overrides the config file location
pub const CONFIG_ENV: &str = "MQTT_CONSOLE_CONFIG";
const CONFIG_DIR: &str = "mqtt-console";
const CONFIG_FILE: &str = "config.toml";

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub mqtt: MqttConfig,
}

impl AppConfig {
    /// Location of the config file: `$MQTT_CONSOLE_CONFIG`, else the user config dir.
    pub fn path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    pub async fn load() -> Result<Self> {
        Self::load_from(&Self::path()).await
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            warn!(
                "Config file {} does not exist, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

        config
            .mqtt
            .validate()
            .map_err(|e| eyre!("Invalid MQTT settings in {}: {}", path.display(), e))?;

        info!("Loaded config from {}", path.display());
        debug!("Config: {:?}", config);
        Ok(config)
    }

    /// Writes the defaults to `path` unless a file is already there.
    pub async fn ensure_default_config(path: &Path) -> Result<()> {
        if tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }

        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| eyre!("Failed to serialize default config: {}", e))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write config file: {}", e))?;

        info!("Default config written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("mqtt-console-test-{}-{}", std::process::id(), name));
        path.push(CONFIG_FILE);
        path
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_defaults() {
        let path = scratch_path("missing");
        let config = AppConfig::load_from(&path).await.unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[tokio::test]
    async fn partial_file_keeps_other_defaults() {
        let path = scratch_path("partial");
        tokio::fs::create_dir_all(path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(
            &path,
            "[mqtt]\nbroker_url = \"tcp://localhost:1884\"\nqos_level = 0\n",
        )
        .await
        .unwrap();

        let config = AppConfig::load_from(&path).await.unwrap();
        assert_eq!(config.mqtt.broker_url, "tcp://localhost:1884");
        assert_eq!(config.mqtt.qos_level, 0);
        assert_eq!(config.mqtt.client_id, "android_mqtt_demo");
        assert_eq!(config.mqtt.keep_alive_interval, 60);

        tokio::fs::remove_dir_all(path.parent().unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected() {
        let path = scratch_path("invalid");
        tokio::fs::create_dir_all(path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(&path, "[mqtt]\nqos_level = 5\n")
            .await
            .unwrap();

        assert!(AppConfig::load_from(&path).await.is_err());

        tokio::fs::remove_dir_all(path.parent().unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn default_config_round_trips_through_disk() {
        let path = scratch_path("default");
        AppConfig::ensure_default_config(&path).await.unwrap();
        // second call leaves the file alone
        AppConfig::ensure_default_config(&path).await.unwrap();

        let config = AppConfig::load_from(&path).await.unwrap();
        assert_eq!(config, AppConfig::default());

        tokio::fs::remove_dir_all(path.parent().unwrap())
            .await
            .unwrap();
    }
}
