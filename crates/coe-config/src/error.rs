//! Errors raised while reading `coe.yaml` and `secrets.yaml`

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no secret named '{key}' in secrets.yaml")]
    SecretNotFound { key: String },

    #[error("environment variable '{var}' is not set")]
    EnvVarNotFound { var: String },

    /// Only `!secret` and `!env_var` are understood
    #[error("unsupported YAML tag {tag}")]
    UnsupportedTag { tag: String },

    #[error("{key}: {reason}")]
    InvalidValue { key: String, reason: String },
}
