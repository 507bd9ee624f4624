//! Secrets loaded from `secrets.yaml` next to the config file

use crate::error::{ConfigError, ConfigResult};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Named secret strings
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    secrets: HashMap<String, String>,
}

impl Secrets {
    /// Load `secrets.yaml` from a config directory; a missing file is empty
    pub fn load(config_dir: &Path) -> ConfigResult<Self> {
        let path = config_dir.join("secrets.yaml");

        if !path.exists() {
            debug!("No secrets.yaml at {:?}", path);
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;
        let raw: HashMap<String, serde_yaml::Value> =
            serde_yaml::from_str(&text).map_err(|source| ConfigError::ParseYaml { path, source })?;

        let secrets: HashMap<String, String> = raw
            .into_iter()
            .map(|(key, value)| (key, secret_text(value)))
            .collect();

        debug!("{} secrets available", secrets.len());
        Ok(Self { secrets })
    }

    pub fn from_map(secrets: HashMap<String, String>) -> Self {
        Self { secrets }
    }

    pub fn get(&self, key: &str) -> ConfigResult<&str> {
        self.secrets
            .get(key)
            .map(|s| s.as_str())
            .ok_or_else(|| ConfigError::SecretNotFound {
                key: key.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

/// Scalars keep their YAML spelling; `null` is empty
fn secret_text(value: serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(text) => text,
        serde_yaml::Value::Number(number) => number.to_string(),
        serde_yaml::Value::Bool(flag) => flag.to_string(),
        serde_yaml::Value::Null => String::new(),
        other => serde_yaml::to_string(&other)
            .map(|yaml| yaml.trim().to_string())
            .unwrap_or_default(),
    }
}
