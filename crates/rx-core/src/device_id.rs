//! Device identifiers
//!
//! Device addresses arrive as `32:153289` from the radio gateway and as
//! `32_153289` inside entity IDs. [`DeviceId`] always stores the underscore form.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized device identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a device id, normalizing `:` separators to `_`
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().replace(':', "_"))
    }

    /// Normalized form (`32_153289`)
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Gateway address form (`32:153289`)
    pub fn address(&self) -> String {
        self.0.replace('_', ":")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> String {
        id.0
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_colon() {
        let id = DeviceId::new("32:153289");
        assert_eq!(id.as_str(), "32_153289");
        assert_eq!(id.address(), "32:153289");
        assert_eq!(id, DeviceId::new("32_153289"));
    }

    #[test]
    fn test_serde_normalizes() {
        let id: DeviceId = serde_json::from_str("\"37:168270\"").unwrap();
        assert_eq!(id.as_str(), "37_168270");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"37_168270\"");
    }
}
