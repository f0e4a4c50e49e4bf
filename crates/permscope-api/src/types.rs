//! Wire types for the audit service REST API.
//!
//! All types match the JSON responses from `/audit/v1/` endpoints.
//! Field names use camelCase via `#[serde(rename_all = "camelCase")]`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Pagination ───────────────────────────────────────────────────────

/// Generic offset/limit pagination wrapper returned by catalog endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub offset: i64,
    pub limit: i32,
    pub count: i32,
    pub total_count: i64,
    pub data: Vec<T>,
}

/// Page metadata attached to paged access responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page_number: u32,
    pub page_size: u32,
    pub has_next: bool,
    pub total_count: u64,
}

// ── Permission catalog ───────────────────────────────────────────────

/// One system permission — from `GET /v1/permissions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRecord {
    /// Unique API identifier (e.g. `ModifyAllData`).
    pub name: String,
    /// Display label (e.g. `Modify All Data`).
    pub label: String,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub description: Option<String>,
}

// ── Grant entities ───────────────────────────────────────────────────

/// A profile, permission set, or permission set group holding a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    pub id: String,
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignment_count: Option<u64>,
    #[serde(default)]
    pub is_custom: Option<bool>,
}

/// Why a user holds a permission: the bundle type and its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    /// One of: `Profile`, `PermissionSet`, `PermissionSetGroup`.
    #[serde(rename = "type")]
    pub source_type: String,
    pub name: String,
}

/// A user holding (or, in roster listings, possibly not holding) a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_name: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub sources: Vec<SourceRecord>,
}

fn default_true() -> bool {
    true
}

// ── Access responses ─────────────────────────────────────────────────

/// Bulk access summary — from `GET /v1/permissions/{name}/access/summary`.
///
/// The fast tier: entity lists are complete, the user list is truncated at
/// the requested `maxUsers` cap while `totalUsers` reports the real count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessSummaryResponse {
    pub permission_name: String,
    #[serde(default)]
    pub profiles: Vec<EntityRecord>,
    #[serde(default)]
    pub permission_sets: Vec<EntityRecord>,
    #[serde(default)]
    pub permission_set_groups: Vec<EntityRecord>,
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub total_users: u64,
}

/// Paged access result — from `GET /v1/permissions/{name}/access`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPageResponse {
    pub permission_name: String,
    #[serde(default)]
    pub profiles: Vec<EntityRecord>,
    #[serde(default)]
    pub permission_sets: Vec<EntityRecord>,
    #[serde(default)]
    pub permission_set_groups: Vec<EntityRecord>,
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub total_users: u64,
    pub pagination: PageMeta,
}

/// User-detail access result — from `GET /v1/permissions/{name}/access/users`.
///
/// Only the requested user fields are populated; entity lists are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccessResponse {
    pub permission_name: String,
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub total_users: u64,
}

/// Cursor-paginated active-user roster — from `GET /v1/users/active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUsersPage {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    pub page_size: u32,
    pub has_more: bool,
    /// Cursor for the next page: the last user id seen on this page.
    #[serde(default)]
    pub last_user_id: Option<String>,
    #[serde(default)]
    pub total_count: u64,
}

// ── Export templates ─────────────────────────────────────────────────

/// A saved export template — from the `/v1/templates` store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub permission_names: Vec<String>,
    #[serde(default)]
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub include_all_active_users: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body for `PUT /v1/templates/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateUpsert {
    pub name: String,
    pub permission_names: Vec<String>,
    #[serde(default)]
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub include_all_active_users: bool,
}
