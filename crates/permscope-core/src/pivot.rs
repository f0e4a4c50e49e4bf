// ── Pivot construction ──
//
// Pure folds from accumulated access results into de-duplicated pivot
// rows: one row per entity, one column per requested permission label.
// Everything here is deterministic over its input -- no clocks, no
// fetch-order dependence beyond what the results already encode.

use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;

use crate::model::{AccessResult, AuditedUser, EntityId, GrantEntity, Permission};

/// Which entity list of an [`AccessResult`] a pivot covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum EntityKind {
    #[strum(to_string = "Profiles")]
    Profiles,
    #[strum(to_string = "Permission Sets")]
    PermissionSets,
    #[strum(to_string = "Permission Set Groups")]
    PermissionSetGroups,
}

/// One pivot row for a profile / permission set / group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityPivotRow {
    pub entity: GrantEntity,
    /// Permission label -> granted. Covers every requested label.
    pub permissions: IndexMap<String, bool>,
}

/// One pivot row for a user.
///
/// A user with N distinct grant sources expands to N rows differing only
/// in `source`; a user with none gets a single row with a blank source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPivotRow {
    pub user: AuditedUser,
    pub source: Option<String>,
    /// Permission label -> granted. Covers every requested label.
    pub permissions: IndexMap<String, bool>,
}

// ── De-duplication ───────────────────────────────────────────────────

/// Keep the first occurrence of each id, preserving order.
///
/// The one de-duplication rule for the whole crate: always by `id`,
/// never by name.
pub fn dedup_by_id<T>(items: Vec<T>, id_of: impl Fn(&T) -> &EntityId) -> Vec<T> {
    let mut seen: HashSet<EntityId> = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(id_of(item).clone()))
        .collect()
}

// ── Entity pivot ─────────────────────────────────────────────────────

/// Fold access results into one row per entity of the given kind.
///
/// Entities are inserted with all-false permission maps on first sight
/// and never removed; each result marks its own permission column true.
/// Output is sorted by label (case-insensitive), then raw label, then id.
pub fn build_entity_pivot(
    results: &[AccessResult],
    kind: EntityKind,
    requested: &[Permission],
) -> Vec<EntityPivotRow> {
    let mut rows: IndexMap<EntityId, EntityPivotRow> = IndexMap::new();

    for result in results {
        for entity in result.entities(kind) {
            let row = rows
                .entry(entity.id.clone())
                .or_insert_with(|| EntityPivotRow {
                    entity: entity.clone(),
                    permissions: blank_permissions(requested),
                });
            *row.permissions
                .entry(result.permission_label.clone())
                .or_insert(false) = true;
        }
    }

    let mut rows: Vec<EntityPivotRow> = rows.into_values().collect();
    rows.sort_by_cached_key(|row| {
        (
            row.entity.label.to_lowercase(),
            row.entity.label.clone(),
            row.entity.id.clone(),
        )
    });
    rows
}

// ── User pivot ───────────────────────────────────────────────────────

/// Fold access results into user rows with grant-source expansion.
///
/// `selected` pins users that must appear even when no result mentions
/// them (template exports): they get all-false permission maps, so "no
/// access" is reportable instead of silently omitted. Roster-merged
/// users (`granted = false`) appear without any column set.
pub fn build_user_pivot(
    results: &[AccessResult],
    requested: &[Permission],
    selected: Option<&[AuditedUser]>,
) -> Vec<UserPivotRow> {
    struct Accum {
        user: AuditedUser,
        sources: BTreeSet<String>,
        permissions: IndexMap<String, bool>,
    }

    fn entry<'m>(
        rows: &'m mut IndexMap<EntityId, Accum>,
        user: &AuditedUser,
        requested: &[Permission],
    ) -> &'m mut Accum {
        let acc = rows.entry(user.id.clone()).or_insert_with(|| Accum {
            user: user.clone(),
            sources: BTreeSet::new(),
            permissions: blank_permissions(requested),
        });
        upgrade_identity(&mut acc.user, user);
        acc
    }

    let mut rows: IndexMap<EntityId, Accum> = IndexMap::new();

    if let Some(selected) = selected {
        for user in dedup_by_id(selected.to_vec(), |u| &u.id) {
            entry(&mut rows, &user, requested);
        }
    }

    for result in results {
        for user in &result.users {
            let acc = entry(&mut rows, user, requested);
            if !user.granted {
                continue;
            }
            *acc.permissions
                .entry(result.permission_label.clone())
                .or_insert(false) = true;
            for source in &user.sources {
                acc.sources.insert(source.to_string());
            }
        }
    }

    let mut out = Vec::new();
    for acc in rows.into_values() {
        let mut user = acc.user;
        // Per-permission sources have been folded into the row set.
        user.sources.clear();

        if acc.sources.is_empty() {
            out.push(UserPivotRow {
                user,
                source: None,
                permissions: acc.permissions,
            });
        } else {
            for source in &acc.sources {
                out.push(UserPivotRow {
                    user: user.clone(),
                    source: Some(source.clone()),
                    permissions: acc.permissions.clone(),
                });
            }
        }
    }

    out.sort_by_cached_key(|row| {
        (
            row.user.username.to_lowercase(),
            row.user.username.clone(),
            row.user.id.clone(),
            row.source.clone().unwrap_or_default(),
        )
    });
    out
}

/// All requested labels mapped to false, in request order.
fn blank_permissions(requested: &[Permission]) -> IndexMap<String, bool> {
    requested
        .iter()
        .map(|p| (p.label.clone(), false))
        .collect()
}

/// Fill identity gaps in an accumulated user from a later sighting.
///
/// Placeholder rows (template selections the service returned no data
/// for) get upgraded when a real record shows up.
fn upgrade_identity(existing: &mut AuditedUser, incoming: &AuditedUser) {
    let placeholder = existing.display_name == "(Data Unavailable)";
    if existing.username == existing.id.as_str() && incoming.username != incoming.id.as_str() {
        existing.username.clone_from(&incoming.username);
    }
    if (existing.display_name.is_empty() || placeholder) && !incoming.display_name.is_empty() {
        existing.display_name.clone_from(&incoming.display_name);
    }
    if existing.email.is_empty() && !incoming.email.is_empty() {
        existing.email.clone_from(&incoming.email);
    }
    if existing.profile_name.is_empty() && !incoming.profile_name.is_empty() {
        existing.profile_name.clone_from(&incoming.profile_name);
    }
    existing.is_active = existing.is_active || incoming.is_active;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{PermissionSource, SourceKind};

    fn permission(name: &str, label: &str) -> Permission {
        Permission {
            name: name.to_owned(),
            label: label.to_owned(),
            is_privileged: false,
        }
    }

    fn entity(id: &str, label: &str) -> GrantEntity {
        GrantEntity {
            id: EntityId::new(id),
            name: label.replace(' ', "_"),
            label: label.to_owned(),
            description: None,
            assignment_count: None,
            is_custom: None,
        }
    }

    fn user(id: &str, username: &str, sources: Vec<PermissionSource>) -> AuditedUser {
        AuditedUser {
            id: EntityId::new(id),
            username: username.to_owned(),
            display_name: String::new(),
            email: String::new(),
            profile_name: String::new(),
            is_active: true,
            granted: true,
            sources,
        }
    }

    fn result_with_profiles(label: &str, profiles: Vec<GrantEntity>) -> AccessResult {
        let mut result = AccessResult::empty(&permission(label, label));
        result.profiles = profiles;
        result
    }

    fn source(kind: SourceKind, name: &str) -> PermissionSource {
        PermissionSource {
            kind,
            name: name.to_owned(),
        }
    }

    // ── Entity pivot ────────────────────────────────────────────────

    #[test]
    fn dedups_entities_across_permissions() {
        // P1 granted to A; P2 granted to A and B.
        let requested = vec![permission("P1", "P1"), permission("P2", "P2")];
        let results = vec![
            result_with_profiles("P1", vec![entity("a", "Profile A")]),
            result_with_profiles("P2", vec![entity("a", "Profile A"), entity("b", "Profile B")]),
        ];

        let pivot = build_entity_pivot(&results, EntityKind::Profiles, &requested);

        assert_eq!(pivot.len(), 2);
        let a = &pivot[0];
        let b = &pivot[1];
        assert_eq!(a.entity.id, EntityId::new("a"));
        assert_eq!(a.permissions["P1"], true);
        assert_eq!(a.permissions["P2"], true);
        assert_eq!(b.permissions["P1"], false);
        assert_eq!(b.permissions["P2"], true);
    }

    #[test]
    fn every_row_covers_every_requested_permission() {
        let requested = vec![
            permission("P1", "P1"),
            permission("P2", "P2"),
            permission("P3", "P3"),
        ];
        let results = vec![result_with_profiles("P2", vec![entity("a", "Only P2")])];

        let pivot = build_entity_pivot(&results, EntityKind::Profiles, &requested);

        assert_eq!(pivot.len(), 1);
        let labels: Vec<&String> = pivot[0].permissions.keys().collect();
        assert_eq!(labels, vec!["P1", "P2", "P3"]);
        assert_eq!(
            pivot[0].permissions.values().copied().collect::<Vec<_>>(),
            vec![false, true, false]
        );
    }

    #[test]
    fn no_entity_is_lost() {
        let requested = vec![permission("P1", "P1")];
        let many: Vec<GrantEntity> =
            (0..50).map(|i| entity(&format!("e{i}"), &format!("Entity {i}"))).collect();
        let results = vec![result_with_profiles("P1", many)];

        let pivot = build_entity_pivot(&results, EntityKind::Profiles, &requested);

        assert_eq!(pivot.len(), 50);
    }

    #[test]
    fn pivot_is_idempotent() {
        let requested = vec![permission("P1", "P1"), permission("P2", "P2")];
        let results = vec![
            result_with_profiles("P2", vec![entity("b", "beta"), entity("a", "Alpha")]),
            result_with_profiles("P1", vec![entity("c", "álamo")]),
        ];

        let first = build_entity_pivot(&results, EntityKind::Profiles, &requested);
        let second = build_entity_pivot(&results, EntityKind::Profiles, &requested);

        assert_eq!(first, second);
    }

    #[test]
    fn sorts_case_insensitively() {
        let requested = vec![permission("P1", "P1")];
        let results = vec![result_with_profiles(
            "P1",
            vec![entity("1", "zeta"), entity("2", "Alpha"), entity("3", "beta")],
        )];

        let pivot = build_entity_pivot(&results, EntityKind::Profiles, &requested);

        let labels: Vec<&str> = pivot.iter().map(|r| r.entity.label.as_str()).collect();
        assert_eq!(labels, vec!["Alpha", "beta", "zeta"]);
    }

    #[test]
    fn dedup_by_id_keeps_first_occurrence() {
        let items = vec![entity("a", "First"), entity("b", "Other"), entity("a", "Second")];
        let deduped = dedup_by_id(items, |e| &e.id);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].label, "First");
    }

    // ── User pivot ──────────────────────────────────────────────────

    #[test]
    fn expands_one_row_per_distinct_source() {
        let requested = vec![permission("P1", "P1"), permission("P2", "P2")];

        let mut r1 = AccessResult::empty(&requested[0]);
        r1.users = vec![user(
            "u1",
            "ada@example.com",
            vec![
                source(SourceKind::Profile, "Admin"),
                source(SourceKind::PermissionSet, "Exporters"),
            ],
        )];
        let mut r2 = AccessResult::empty(&requested[1]);
        r2.users = vec![user(
            "u1",
            "ada@example.com",
            // Duplicate of a source already seen under P1.
            vec![source(SourceKind::Profile, "Admin")],
        )];

        let pivot = build_user_pivot(&[r1, r2], &requested, None);

        assert_eq!(pivot.len(), 2);
        let sources: Vec<&str> = pivot.iter().map(|r| r.source.as_deref().unwrap()).collect();
        assert_eq!(sources, vec!["Permission Set: Exporters", "Profile: Admin"]);
        // All other fields repeat identically across the expansion.
        for row in &pivot {
            assert_eq!(row.user.username, "ada@example.com");
            assert_eq!(row.permissions["P1"], true);
            assert_eq!(row.permissions["P2"], true);
        }
    }

    #[test]
    fn sourceless_user_gets_one_blank_row() {
        let requested = vec![permission("P1", "P1")];
        let mut r1 = AccessResult::empty(&requested[0]);
        r1.users = vec![user("u1", "ada@example.com", Vec::new())];

        let pivot = build_user_pivot(&[r1], &requested, None);

        assert_eq!(pivot.len(), 1);
        assert_eq!(pivot[0].source, None);
        assert_eq!(pivot[0].permissions["P1"], true);
    }

    #[test]
    fn selected_users_absent_from_results_still_appear() {
        let requested = vec![permission("P1", "P1")];
        let r1 = AccessResult::empty(&requested[0]);
        let pinned = vec![AuditedUser::placeholder(EntityId::new("u7"))];

        let pivot = build_user_pivot(&[r1], &requested, Some(&pinned));

        assert_eq!(pivot.len(), 1);
        assert_eq!(pivot[0].user.id, EntityId::new("u7"));
        assert_eq!(pivot[0].source, None);
        assert_eq!(pivot[0].permissions["P1"], false);
    }

    #[test]
    fn roster_users_never_gain_grants() {
        let requested = vec![permission("P1", "P1")];
        let mut r1 = AccessResult::empty(&requested[0]);
        let mut ungranted = user("u2", "bob@example.com", Vec::new());
        ungranted.granted = false;
        r1.users = vec![user("u1", "ada@example.com", Vec::new()), ungranted];

        let pivot = build_user_pivot(&[r1], &requested, None);

        assert_eq!(pivot.len(), 2);
        let ada = pivot.iter().find(|r| r.user.username == "ada@example.com").unwrap();
        let bob = pivot.iter().find(|r| r.user.username == "bob@example.com").unwrap();
        assert_eq!(ada.permissions["P1"], true);
        assert_eq!(bob.permissions["P1"], false);
    }

    #[test]
    fn placeholder_identity_upgrades_from_real_record() {
        let requested = vec![permission("P1", "P1")];
        let mut r1 = AccessResult::empty(&requested[0]);
        let mut real = user("u7", "grace@example.com", Vec::new());
        real.display_name = "Grace Hopper".into();
        r1.users = vec![real];
        let pinned = vec![AuditedUser::placeholder(EntityId::new("u7"))];

        let pivot = build_user_pivot(&[r1], &requested, Some(&pinned));

        assert_eq!(pivot.len(), 1);
        assert_eq!(pivot[0].user.username, "grace@example.com");
        assert_eq!(pivot[0].user.display_name, "Grace Hopper");
    }

    #[test]
    fn user_pivot_is_idempotent() {
        let requested = vec![permission("P1", "P1")];
        let mut r1 = AccessResult::empty(&requested[0]);
        r1.users = vec![
            user("u1", "zoe@example.com", vec![source(SourceKind::Profile, "Admin")]),
            user("u2", "Al@example.com", Vec::new()),
        ];

        let first = build_user_pivot(std::slice::from_ref(&r1), &requested, None);
        let second = build_user_pivot(std::slice::from_ref(&r1), &requested, None);

        assert_eq!(first, second);
        // And deterministic, case-insensitive ordering.
        assert_eq!(first[0].user.username, "Al@example.com");
    }
}
