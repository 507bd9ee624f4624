//! Host gateway abstraction
//!
//! The session never talks to the host directly. Production wiring binds
//! [`HostGateway`] to the host websocket API, tests bind it to
//! [`MemoryGateway`](crate::MemoryGateway).

use std::sync::Arc;

use async_trait::async_trait;
use coe_core::{ConfigEntryMetadata, ExposedEntitiesConfig};
use thiserror::Error;

/// Failure of a gateway write
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("host not connected")]
    NotConnected,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("host rejected request ({code}): {message}")]
    Rejected { code: String, message: String },
}

/// Capabilities the panel needs from the host
///
/// Reads are best-effort: implementations log failures and return empty
/// results. Only [`persist_config`](HostGateway::persist_config) reports
/// errors.
#[async_trait]
pub trait HostGateway: Send + Sync {
    /// All config entries of the integration
    async fn list_config_entries(&self) -> Vec<ConfigEntryMetadata>;

    /// Stored slot mapping of one entry, empty when absent
    async fn fetch_config(&self, entry_id: &str) -> ExposedEntitiesConfig;

    /// Write a (sparse) slot mapping back to the host
    async fn persist_config(
        &self,
        entry_id: &str,
        config: &ExposedEntitiesConfig,
    ) -> Result<(), GatewayError>;

    /// Entity ids whose domain is one of `domains`
    async fn list_entity_identifiers(&self, domains: &[&str]) -> Vec<String>;

    /// Current value of an entity for display, e.g. `21.5 °C`
    async fn get_entity_preview(&self, entity_id: &str) -> Option<String>;
}

#[async_trait]
impl<T: HostGateway + ?Sized> HostGateway for Arc<T> {
    async fn list_config_entries(&self) -> Vec<ConfigEntryMetadata> {
        (**self).list_config_entries().await
    }

    async fn fetch_config(&self, entry_id: &str) -> ExposedEntitiesConfig {
        (**self).fetch_config(entry_id).await
    }

    async fn persist_config(
        &self,
        entry_id: &str,
        config: &ExposedEntitiesConfig,
    ) -> Result<(), GatewayError> {
        (**self).persist_config(entry_id, config).await
    }

    async fn list_entity_identifiers(&self, domains: &[&str]) -> Vec<String> {
        (**self).list_entity_identifiers(domains).await
    }

    async fn get_entity_preview(&self, entity_id: &str) -> Option<String> {
        (**self).get_entity_preview(entity_id).await
    }
}
