//! Rendered entity identifiers
//!
//! An [`EntityId`] is the `domain.object_id` text a host knows a resource by,
//! e.g. `switch.dehumidify_32_153289`. It is kept in rendered form, so
//! equality, ordering and display all see exactly what the host sees.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kind::EntityKind;

/// Half of an identifier, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPart {
    Domain,
    ObjectId,
}

impl fmt::Display for IdPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IdPart::Domain => "domain",
            IdPart::ObjectId => "object id",
        })
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityIdError {
    #[error("'{0}' is not of the form domain.object_id")]
    MissingSeparator(String),

    #[error("{part} is empty")]
    Empty { part: IdPart },

    /// Only `a-z`, `0-9` and `_` are allowed
    #[error("{part} '{text}' contains '{found}'")]
    BadChar {
        part: IdPart,
        text: String,
        found: char,
    },

    #[error("{part} '{text}' starts or ends with '_'")]
    EdgeUnderscore { part: IdPart, text: String },

    #[error("domain '{0}' contains '__'")]
    DoubleUnderscore(String),
}

/// External identifier of a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    rendered: String,
    dot: usize,
}

impl EntityId {
    pub fn new(domain: &str, object_id: &str) -> Result<Self, EntityIdError> {
        check_part(IdPart::Domain, domain)?;
        check_part(IdPart::ObjectId, object_id)?;
        Ok(Self {
            rendered: format!("{domain}.{object_id}"),
            dot: domain.len(),
        })
    }

    /// Identifier in `kind`'s domain for a freshly rendered object id
    ///
    /// ASCII letters are lowercased first, as the host does when it slugs a
    /// name. Nothing else is rewritten: `32-153289` stays invalid.
    pub fn for_kind(kind: EntityKind, object_id: &str) -> Result<Self, EntityIdError> {
        Self::new(kind.domain(), &object_id.to_ascii_lowercase())
    }

    pub fn domain(&self) -> &str {
        &self.rendered[..self.dot]
    }

    pub fn object_id(&self) -> &str {
        &self.rendered[self.dot + 1..]
    }

    /// The kind owning this identifier's domain, if it is one of ours
    pub fn kind(&self) -> Option<EntityKind> {
        EntityKind::from_domain(self.domain())
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

fn check_part(part: IdPart, text: &str) -> Result<(), EntityIdError> {
    if text.is_empty() {
        return Err(EntityIdError::Empty { part });
    }
    if let Some(found) = text
        .chars()
        .find(|c| !matches!(c, 'a'..='z' | '0'..='9' | '_'))
    {
        return Err(EntityIdError::BadChar {
            part,
            text: text.to_string(),
            found,
        });
    }
    if text.starts_with('_') || text.ends_with('_') {
        return Err(EntityIdError::EdgeUnderscore {
            part,
            text: text.to_string(),
        });
    }
    if part == IdPart::Domain && text.contains("__") {
        return Err(EntityIdError::DoubleUnderscore(text.to_string()));
    }
    Ok(())
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (domain, object_id) = s
            .split_once('.')
            .ok_or_else(|| EntityIdError::MissingSeparator(s.to_string()))?;
        Self::new(domain, object_id)
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
        id.rendered
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}
