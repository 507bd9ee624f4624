//! Configuration loading for the CoE panel host and client
//!
//! Reads `coe.yaml` from a config directory. Two tags are supported:
//!
//! - `!secret key` - Substitute from secrets.yaml
//! - `!env_var VAR` - Environment variable substitution
//!
//! # Example
//!
//! ```ignore
//! use coe_config::PanelConfig;
//!
//! let config = PanelConfig::load("/config")?;
//! println!("serving on {}", config.server.bind);
//! ```

mod error;
mod loader;
mod panel_config;
mod secrets;

pub use error::{ConfigError, ConfigResult};
pub use loader::YamlLoader;
pub use panel_config::{ClientConfig, EntitySeed, PanelConfig, ServerConfig, CONFIG_FILE};
pub use secrets::Secrets;
