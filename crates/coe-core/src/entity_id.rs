//! Entity ID type representing a domain.object_id pair

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domains::channel_for_domain;
use crate::slot::Channel;

/// Error type for invalid entity IDs
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityIdError {
    #[error("entity_id must contain exactly one '.' separator")]
    InvalidFormat,

    #[error("domain cannot be empty")]
    EmptyDomain,

    #[error("object_id cannot be empty")]
    EmptyObjectId,

    #[error("domain '{0}' contains invalid characters")]
    InvalidDomainChars(String),

    #[error("object_id '{0}' contains invalid characters")]
    InvalidObjectIdChars(String),
}

/// A validated entity ID such as `sensor.boiler_temperature`
///
/// Both parts are lowercase alphanumeric with underscores. Neither part may
/// start or end with an underscore, and the domain may not contain `__`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    domain: String,
    object_id: String,
}

impl EntityId {
    /// Build an entity ID from its two parts
    pub fn new(
        domain: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Result<Self, EntityIdError> {
        let domain = domain.into();
        let object_id = object_id.into();

        if domain.is_empty() {
            return Err(EntityIdError::EmptyDomain);
        }
        if object_id.is_empty() {
            return Err(EntityIdError::EmptyObjectId);
        }
        if domain.contains("__") || !is_slug(&domain) {
            return Err(EntityIdError::InvalidDomainChars(domain));
        }
        if !is_slug(&object_id) {
            return Err(EntityIdError::InvalidObjectIdChars(object_id));
        }

        Ok(Self { domain, object_id })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// The slot channel this entity can be exposed on, if any
    pub fn channel(&self) -> Option<Channel> {
        channel_for_domain(&self.domain)
    }
}

/// Lowercase alphanumeric plus underscore, not starting or ending with `_`
fn is_slug(s: &str) -> bool {
    !s.starts_with('_')
        && !s.ends_with('_')
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Check whether a raw string is a valid entity ID without keeping the parse
pub fn is_valid_entity_id(s: &str) -> bool {
    s.parse::<EntityId>().is_ok()
}

/// Domain part of a raw entity ID string, without validating it
pub fn split_domain(s: &str) -> &str {
    s.split_once('.').map(|(domain, _)| domain).unwrap_or(s)
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((domain, object_id)) if !object_id.contains('.') => Self::new(domain, object_id),
            _ => Err(EntityIdError::InvalidFormat),
        }
    }
}

impl TryFrom<String> for EntityId {
    type Error = EntityIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> String {
        id.to_string()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.domain, self.object_id)
    }
}
