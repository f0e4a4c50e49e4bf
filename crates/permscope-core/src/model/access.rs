// ── Per-permission access outcomes ──

use serde::{Deserialize, Serialize};

use super::{AuditedUser, EntityId, GrantEntity, Permission};
use crate::pivot::EntityKind;

/// Pagination state attached to page-scoped access results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page_number: u32,
    pub page_size: u32,
    pub has_next: bool,
    pub total_count: u64,
}

/// Everything known about one permission's grants after a fetch.
///
/// Produced by the access client; never mutated after creation. A
/// pagination advance produces a new instance replacing the page-scoped
/// user slice, while aggregate totals carry over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessResult {
    pub permission_name: String,
    pub permission_label: String,
    pub profiles: Vec<GrantEntity>,
    pub permission_sets: Vec<GrantEntity>,
    pub permission_set_groups: Vec<GrantEntity>,
    pub users: Vec<AuditedUser>,
    pub total_users: u64,
    pub page: Option<PageInfo>,
    /// Set when every fetch tier failed and this result is synthesized.
    pub error: Option<String>,
    /// Set when a tier below the primary produced this result.
    pub is_fallback: bool,
}

impl AccessResult {
    /// An empty, error-free result for the given permission.
    pub fn empty(permission: &Permission) -> Self {
        Self {
            permission_name: permission.name.clone(),
            permission_label: permission.label.clone(),
            profiles: Vec::new(),
            permission_sets: Vec::new(),
            permission_set_groups: Vec::new(),
            users: Vec::new(),
            total_users: 0,
            page: None,
            error: None,
            is_fallback: false,
        }
    }

    /// The synthesized last-tier result: empty lists, `error` set, so the
    /// caller can continue processing other permissions.
    pub fn unavailable(permission: &Permission, error: String) -> Self {
        Self {
            error: Some(error),
            is_fallback: true,
            ..Self::empty(permission)
        }
    }

    /// The entity list for the requested kind.
    pub fn entities(&self, kind: EntityKind) -> &[GrantEntity] {
        match kind {
            EntityKind::Profiles => &self.profiles,
            EntityKind::PermissionSets => &self.permission_sets,
            EntityKind::PermissionSetGroups => &self.permission_set_groups,
        }
    }
}

/// One cursor page of the active-user roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterPage {
    pub users: Vec<AuditedUser>,
    pub has_more: bool,
    pub last_user_id: Option<EntityId>,
    pub total_count: u64,
}
