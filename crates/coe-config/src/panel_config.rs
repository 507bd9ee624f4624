//! Typed configuration read from `coe.yaml`

use coe_core::EntityId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{ConfigError, ConfigResult};
use crate::loader::YamlLoader;

/// File name of the configuration inside the config directory
pub const CONFIG_FILE: &str = "coe.yaml";

/// Full configuration; every section falls back to defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub client: ClientConfig,

    /// Entity states the host starts with
    #[serde(default)]
    pub entities: Vec<EntitySeed>,
}

/// Websocket host settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Token clients must present; any token is accepted when unset
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            access_token: None,
        }
    }
}

/// Settings for connecting the panel to a host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default)]
    pub access_token: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            access_token: String::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Initial state of one entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySeed {
    pub entity_id: EntityId,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
}

fn default_bind() -> String {
    "127.0.0.1:8123".to_string()
}

fn default_url() -> String {
    "http://127.0.0.1:8123".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl PanelConfig {
    /// Load `coe.yaml` from a config directory; a missing file gives defaults
    pub fn load(config_dir: impl AsRef<Path>) -> ConfigResult<Self> {
        let config_dir = config_dir.as_ref();
        let loader = YamlLoader::new(config_dir)?;

        let Some(value) = loader.load_file(CONFIG_FILE)? else {
            info!("No {} in {:?}, using defaults", CONFIG_FILE, config_dir);
            return Ok(Self::default());
        };

        let config: Self =
            serde_yaml::from_value(value).map_err(|e| ConfigError::ParseYaml {
                path: config_dir.join(CONFIG_FILE),
                source: e,
            })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.client.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "client.request_timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let dir = TempDir::new().unwrap();
        let config = PanelConfig::load(dir.path()).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8123");
        assert!(config.server.access_token.is_none());
        assert_eq!(config.client.request_timeout_secs, 10);
        assert!(config.entities.is_empty());
    }

    #[test]
    fn test_full_config_with_secret() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("secrets.yaml"), "coe_token: abc\n").unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"
server:
  bind: "0.0.0.0:8200"
  access_token: !secret coe_token
client:
  url: "http://hass.local:8123"
  access_token: !secret coe_token
entities:
  - entity_id: sensor.boiler
    state: "61.0"
    unit_of_measurement: "°C"
  - entity_id: binary_sensor.pump
    state: "on"
"#,
        )
        .unwrap();

        let config = PanelConfig::load(dir.path()).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8200");
        assert_eq!(config.server.access_token.as_deref(), Some("abc"));
        assert_eq!(config.client.access_token, "abc");
        assert_eq!(config.entities.len(), 2);
        assert_eq!(config.entities[0].entity_id.to_string(), "sensor.boiler");
        assert_eq!(config.entities[1].unit_of_measurement, None);
    }

    #[test]
    fn test_invalid_entity_id_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "entities:\n  - entity_id: Not Valid\n    state: x\n",
        )
        .unwrap();

        assert!(matches!(
            PanelConfig::load(dir.path()),
            Err(ConfigError::ParseYaml { .. })
        ));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "client:\n  request_timeout_secs: 0\n",
        )
        .unwrap();

        assert!(matches!(
            PanelConfig::load(dir.path()),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
