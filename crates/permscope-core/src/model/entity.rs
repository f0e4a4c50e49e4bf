// ── Grant-holding entities ──
//
// Profiles, permission sets, and permission set groups all share one
// shape (`GrantEntity`); users carry extra identity fields plus the
// grant sources explaining *why* they hold a permission.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::EntityId;

/// Which bundle type granted a permission.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum SourceKind {
    #[strum(serialize = "Profile", to_string = "Profile")]
    Profile,
    #[strum(serialize = "PermissionSet", to_string = "Permission Set")]
    PermissionSet,
    #[strum(serialize = "PermissionSetGroup", to_string = "Permission Set Group")]
    PermissionSetGroup,
}

/// The specific bundle through which a user obtained a permission.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PermissionSource {
    pub kind: SourceKind,
    pub name: String,
}

impl fmt::Display for PermissionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.name)
    }
}

/// A profile, permission set, or permission set group holding a grant.
///
/// Equality and de-duplication always key on `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantEntity {
    pub id: EntityId,
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub assignment_count: Option<u64>,
    pub is_custom: Option<bool>,
}

/// A user appearing in access results or the active roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditedUser {
    pub id: EntityId,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub profile_name: String,
    pub is_active: bool,
    /// `false` for roster-merged users who hold no grant for the
    /// permission under which they were attached.
    pub granted: bool,
    pub sources: Vec<PermissionSource>,
}

impl AuditedUser {
    /// Placeholder for a user named by id only (e.g. a template selection
    /// the service returned no data for).
    pub fn placeholder(id: EntityId) -> Self {
        Self {
            username: id.to_string(),
            display_name: "(Data Unavailable)".into(),
            email: String::new(),
            profile_name: String::new(),
            is_active: false,
            granted: false,
            sources: Vec::new(),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn source_renders_kind_and_name() {
        let src = PermissionSource {
            kind: SourceKind::PermissionSetGroup,
            name: "Sales_Ops".into(),
        };
        assert_eq!(src.to_string(), "Permission Set Group: Sales_Ops");
    }

    #[test]
    fn source_kind_parses_wire_form() {
        assert_eq!(
            SourceKind::from_str("PermissionSet").ok(),
            Some(SourceKind::PermissionSet)
        );
        assert!(SourceKind::from_str("Role").is_err());
    }
}
