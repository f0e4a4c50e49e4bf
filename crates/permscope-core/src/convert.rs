// ── Wire-type to domain-type conversions ──
//
// Keeps serde-shaped API records out of the model. Unknown source kinds
// are dropped with a warning rather than failing the whole payload.

use std::str::FromStr;

use tracing::warn;

use permscope_api::types as wire;

use crate::model::{
    AccessResult, AuditedUser, EntityId, ExportTemplate, GrantEntity, PageInfo, Permission,
    PermissionSource, RosterPage, SourceKind,
};

impl From<wire::PermissionRecord> for Permission {
    fn from(rec: wire::PermissionRecord) -> Self {
        Self {
            name: rec.name,
            label: rec.label,
            is_privileged: rec.privileged,
        }
    }
}

impl From<wire::EntityRecord> for GrantEntity {
    fn from(rec: wire::EntityRecord) -> Self {
        Self {
            id: EntityId::new(rec.id),
            name: rec.name,
            label: rec.label,
            description: rec.description,
            assignment_count: rec.assignment_count,
            is_custom: rec.is_custom,
        }
    }
}

impl From<wire::UserRecord> for AuditedUser {
    fn from(rec: wire::UserRecord) -> Self {
        let sources = rec
            .sources
            .into_iter()
            .filter_map(|s| match SourceKind::from_str(&s.source_type) {
                Ok(kind) => Some(PermissionSource { kind, name: s.name }),
                Err(_) => {
                    warn!(source_type = %s.source_type, "dropping unknown grant source kind");
                    None
                }
            })
            .collect();

        Self {
            id: EntityId::new(rec.id),
            display_name: rec.display_name.unwrap_or_default(),
            email: rec.email.unwrap_or_default(),
            profile_name: rec.profile_name.unwrap_or_default(),
            is_active: rec.active,
            granted: true,
            sources,
            username: rec.username,
        }
    }
}

impl From<wire::PageMeta> for PageInfo {
    fn from(meta: wire::PageMeta) -> Self {
        Self {
            page_number: meta.page_number,
            page_size: meta.page_size,
            has_next: meta.has_next,
            total_count: meta.total_count,
        }
    }
}

impl From<wire::AccessSummaryResponse> for AccessResult {
    fn from(resp: wire::AccessSummaryResponse) -> Self {
        Self {
            permission_label: resp.permission_name.clone(),
            permission_name: resp.permission_name,
            profiles: resp.profiles.into_iter().map(Into::into).collect(),
            permission_sets: resp.permission_sets.into_iter().map(Into::into).collect(),
            permission_set_groups: resp
                .permission_set_groups
                .into_iter()
                .map(Into::into)
                .collect(),
            users: resp.users.into_iter().map(Into::into).collect(),
            total_users: resp.total_users,
            page: None,
            error: None,
            is_fallback: false,
        }
    }
}

impl From<wire::AccessPageResponse> for AccessResult {
    fn from(resp: wire::AccessPageResponse) -> Self {
        Self {
            permission_label: resp.permission_name.clone(),
            permission_name: resp.permission_name,
            profiles: resp.profiles.into_iter().map(Into::into).collect(),
            permission_sets: resp.permission_sets.into_iter().map(Into::into).collect(),
            permission_set_groups: resp
                .permission_set_groups
                .into_iter()
                .map(Into::into)
                .collect(),
            users: resp.users.into_iter().map(Into::into).collect(),
            total_users: resp.total_users,
            page: Some(resp.pagination.into()),
            error: None,
            is_fallback: false,
        }
    }
}

impl From<wire::UserAccessResponse> for AccessResult {
    fn from(resp: wire::UserAccessResponse) -> Self {
        Self {
            permission_label: resp.permission_name.clone(),
            permission_name: resp.permission_name,
            profiles: Vec::new(),
            permission_sets: Vec::new(),
            permission_set_groups: Vec::new(),
            users: resp.users.into_iter().map(Into::into).collect(),
            total_users: resp.total_users,
            page: None,
            error: None,
            is_fallback: false,
        }
    }
}

impl From<wire::ActiveUsersPage> for RosterPage {
    fn from(page: wire::ActiveUsersPage) -> Self {
        let users = page
            .users
            .into_iter()
            .map(|rec| AuditedUser {
                // Roster listings carry no grant for any particular
                // permission; merging marks them explicitly ungranted.
                granted: false,
                ..rec.into()
            })
            .collect();

        Self {
            users,
            has_more: page.has_more,
            last_user_id: page.last_user_id.map(EntityId::new),
            total_count: page.total_count,
        }
    }
}

impl From<wire::TemplateRecord> for ExportTemplate {
    fn from(rec: wire::TemplateRecord) -> Self {
        Self {
            id: rec.id,
            name: rec.name,
            permission_names: rec.permission_names,
            user_ids: rec.user_ids.into_iter().map(EntityId::new).collect(),
            include_all_active_users: rec.include_all_active_users,
            updated_at: rec.updated_at,
        }
    }
}

impl From<&ExportTemplate> for wire::TemplateUpsert {
    fn from(tpl: &ExportTemplate) -> Self {
        Self {
            name: tpl.name.clone(),
            permission_names: tpl.permission_names.clone(),
            user_ids: tpl.user_ids.iter().map(ToString::to_string).collect(),
            include_all_active_users: tpl.include_all_active_users,
        }
    }
}
