//! Resource kinds and their host domains
//!
//! A resource kind decides how a resource is created and removed. Platform
//! kinds are instantiated by host entity platforms and are device-scoped;
//! cards and automations are feature-global and use their own paths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a domain string does not name a known kind
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown resource kind: {0}")]
pub struct UnknownKind(pub String);

/// Classification of a manageable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Sensor,
    Switch,
    #[serde(rename = "number")]
    Numeric,
    #[serde(rename = "binary_sensor")]
    Boolean,
    Card,
    Automation,
}

/// Kinds that host platforms instantiate; only these take part in bulk reconciliation
pub static PLATFORM_KINDS: &[EntityKind] = &[
    EntityKind::Sensor,
    EntityKind::Switch,
    EntityKind::Numeric,
    EntityKind::Boolean,
];

impl EntityKind {
    /// All kinds, platform kinds first
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Sensor,
        EntityKind::Switch,
        EntityKind::Numeric,
        EntityKind::Boolean,
        EntityKind::Card,
        EntityKind::Automation,
    ];

    /// Host domain used as the identifier prefix
    pub fn domain(&self) -> &'static str {
        match self {
            EntityKind::Sensor => "sensor",
            EntityKind::Switch => "switch",
            EntityKind::Numeric => "number",
            EntityKind::Boolean => "binary_sensor",
            EntityKind::Card => "card",
            EntityKind::Automation => "automation",
        }
    }

    /// Look up a kind by its host domain
    pub fn from_domain(domain: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.domain() == domain)
    }

    /// Whether the kind is handled by host entity platforms
    pub fn is_platform(&self) -> bool {
        PLATFORM_KINDS.contains(self)
    }

    /// Whether one resource exists per device (as opposed to one per feature)
    pub fn is_device_scoped(&self) -> bool {
        self.is_platform()
    }
}

impl FromStr for EntityKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_domain(s).ok_or_else(|| UnknownKind(s.to_string()))
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.domain())
    }
}
