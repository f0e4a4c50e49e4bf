// ── Core identity type ──
//
// EntityId is the foundation of every domain type. The audit service
// exposes opaque string identifiers; de-duplication and pivot keying
// always go through this type, never through display names (names are
// not guaranteed unique across orgs).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical identifier for any audited entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_round_trips_display() {
        let id = EntityId::new("0PS000000000001");
        assert_eq!(id.to_string(), "0PS000000000001");
        assert_eq!(id.as_str(), "0PS000000000001");
    }

    #[test]
    fn entity_id_from_str() {
        let id: EntityId = "u-42".parse().unwrap();
        assert_eq!(id, EntityId::new("u-42"));
    }
}
