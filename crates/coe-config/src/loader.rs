//! YAML loader with `!secret` and `!env_var` tag support

use crate::error::{ConfigError, ConfigResult};
use crate::secrets::Secrets;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// YAML loader resolving custom tags against a config directory
pub struct YamlLoader {
    config_dir: PathBuf,
    secrets: Secrets,
}

impl YamlLoader {
    /// Create a loader for a config directory, reading its `secrets.yaml`
    pub fn new(config_dir: impl Into<PathBuf>) -> ConfigResult<Self> {
        let config_dir = config_dir.into();
        let secrets = Secrets::load(&config_dir)?;
        Ok(Self {
            config_dir,
            secrets,
        })
    }

    pub fn with_secrets(config_dir: impl Into<PathBuf>, secrets: Secrets) -> Self {
        Self {
            config_dir: config_dir.into(),
            secrets,
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Load a file relative to the config directory.
    ///
    /// Returns `None` when the file does not exist.
    pub fn load_file(&self, name: impl AsRef<Path>) -> ConfigResult<Option<Value>> {
        let path = self.config_dir.join(name);
        if !path.exists() {
            debug!("Config file {:?} not found", path);
            return Ok(None);
        }

        debug!("Loading YAML file: {:?}", path);
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::ReadFile {
            path: path.clone(),
            source: e,
        })?;
        self.load_string(&content, &path).map(Some)
    }

    /// Parse YAML from a string and resolve tags
    pub fn load_string(&self, content: &str, source_path: &Path) -> ConfigResult<Value> {
        let value: Value = serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
            path: source_path.to_path_buf(),
            source: e,
        })?;
        self.process_value(value)
    }

    fn process_value(&self, value: Value) -> ConfigResult<Value> {
        match value {
            Value::Tagged(tagged) => self.process_tagged(*tagged),
            Value::Mapping(map) => {
                let mut result = serde_yaml::Mapping::new();
                for (k, v) in map {
                    result.insert(self.process_value(k)?, self.process_value(v)?);
                }
                Ok(Value::Mapping(result))
            }
            Value::Sequence(seq) => seq
                .into_iter()
                .map(|v| self.process_value(v))
                .collect::<ConfigResult<Vec<_>>>()
                .map(Value::Sequence),
            _ => Ok(value),
        }
    }

    fn process_tagged(&self, tagged: serde_yaml::value::TaggedValue) -> ConfigResult<Value> {
        let tag = tagged.tag.to_string();
        trace!("Processing tag '{}'", tag);

        match tag.as_str() {
            "!secret" => {
                let key = tag_argument("!secret", tagged.value)?;
                let secret = self.secrets.get(&key)?;
                debug!("Substituted secret: {}", key);
                Ok(Value::String(secret.to_string()))
            }
            "!env_var" => {
                let var = tag_argument("!env_var", tagged.value)?;
                let value = std::env::var(&var)
                    .map_err(|_| ConfigError::EnvVarNotFound { var: var.clone() })?;
                debug!("Substituted env var: {}", var);
                Ok(Value::String(value))
            }
            _ => Err(ConfigError::UnsupportedTag { tag }),
        }
    }
}

fn tag_argument(tag: &str, value: Value) -> ConfigResult<String> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(ConfigError::InvalidValue {
            key: tag.to_string(),
            reason: "argument must be a string".to_string(),
        }),
    }
}
