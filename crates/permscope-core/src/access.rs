// ── Access data source and fallback client ──
//
// `AccessSource` is the seam over the audit service's five inbound
// operations; `HttpAccessSource` implements it over `permscope-api`.
// `AccessClient` layers the tiered fallback ladder on top: callers of
// `fetch_access`/`fetch_all_users` never see an error -- every failure
// degrades to a cheaper tier and bottoms out in a synthesized result
// carrying the error text.

use std::future::Future;

use tracing::{debug, warn};

use permscope_api::{AuditClient, TlsMode, TransportConfig};

use crate::config::{PAGE_SIZE_CEILING, ServiceConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::{AccessResult, AuditedUser, EntityId, ExportTemplate, Permission, RosterPage};
use crate::pivot::dedup_by_id;

/// Fields requested from the user-detail access tier.
pub const USER_EXPORT_FIELDS: &[&str] =
    &["username", "displayName", "email", "profileName", "active", "sources"];

/// Page size used when walking the active-user roster.
const ROSTER_PAGE_SIZE: u32 = 500;

/// Floor for the reduced page size used by the secondary fetch tier.
const MIN_FALLBACK_PAGE_SIZE: u32 = 25;

/// How many catalog entries to request per page when listing permissions.
const CATALOG_PAGE_LIMIT: i32 = 200;

// ── Source trait ─────────────────────────────────────────────────────

/// The audit service's inbound operations, as a swappable seam.
///
/// Production code uses [`HttpAccessSource`]; tests inject mocks to
/// exercise the fallback ladder and batch behavior.
pub trait AccessSource {
    /// The full permission catalog (paginated to exhaustion internally).
    fn list_permissions(
        &self,
    ) -> impl Future<Output = Result<Vec<Permission>, CoreError>> + Send;

    /// Fast bulk-summary access query with a hard cap on returned users.
    fn fetch_summary(
        &self,
        permission_name: &str,
        max_users: u32,
    ) -> impl Future<Output = Result<AccessResult, CoreError>> + Send;

    /// Page-limited standard access query.
    fn fetch_page(
        &self,
        permission_name: &str,
        page_size: u32,
        page_number: u32,
    ) -> impl Future<Output = Result<AccessResult, CoreError>> + Send;

    /// User-detail access query with explicit field selection.
    fn fetch_user_fields(
        &self,
        permission_name: &str,
        fields: &[&str],
        max_users: u32,
    ) -> impl Future<Output = Result<AccessResult, CoreError>> + Send;

    /// One cursor page of the active-user roster.
    fn active_users_page(
        &self,
        page_size: u32,
        after_id: Option<&EntityId>,
    ) -> impl Future<Output = Result<RosterPage, CoreError>> + Send;

    fn load_template(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<ExportTemplate, CoreError>> + Send;

    fn save_template(
        &self,
        template: &ExportTemplate,
    ) -> impl Future<Output = Result<ExportTemplate, CoreError>> + Send;

    fn list_templates(&self)
    -> impl Future<Output = Result<Vec<ExportTemplate>, CoreError>> + Send;
}

// ── HTTP implementation ──────────────────────────────────────────────

/// [`AccessSource`] backed by the audit service REST API.
pub struct HttpAccessSource {
    client: AuditClient,
}

impl HttpAccessSource {
    /// Build a client from runtime configuration.
    pub fn connect(config: &ServiceConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            tls: match &config.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: config.timeout,
        };

        let client = AuditClient::from_token(config.url.as_str(), &config.token, &transport)?;
        Ok(Self { client })
    }
}

impl AccessSource for HttpAccessSource {
    async fn list_permissions(&self) -> Result<Vec<Permission>, CoreError> {
        let records = self
            .client
            .paginate_all(CATALOG_PAGE_LIMIT, |offset, limit| {
                self.client.list_permissions(offset, limit)
            })
            .await?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    async fn fetch_summary(
        &self,
        permission_name: &str,
        max_users: u32,
    ) -> Result<AccessResult, CoreError> {
        let resp = self
            .client
            .fetch_access_summary(permission_name, max_users)
            .await?;
        Ok(resp.into())
    }

    async fn fetch_page(
        &self,
        permission_name: &str,
        page_size: u32,
        page_number: u32,
    ) -> Result<AccessResult, CoreError> {
        let resp = self
            .client
            .fetch_access_paged(permission_name, page_size, page_number)
            .await?;
        Ok(resp.into())
    }

    async fn fetch_user_fields(
        &self,
        permission_name: &str,
        fields: &[&str],
        max_users: u32,
    ) -> Result<AccessResult, CoreError> {
        let resp = self
            .client
            .fetch_access_user_fields(permission_name, fields, max_users)
            .await?;
        Ok(resp.into())
    }

    async fn active_users_page(
        &self,
        page_size: u32,
        after_id: Option<&EntityId>,
    ) -> Result<RosterPage, CoreError> {
        let resp = self
            .client
            .list_active_users(page_size, after_id.map(EntityId::as_str))
            .await?;
        Ok(resp.into())
    }

    async fn load_template(&self, id: &str) -> Result<ExportTemplate, CoreError> {
        match self.client.get_template(id).await {
            Ok(rec) => Ok(rec.into()),
            Err(e) if e.is_not_found() => Err(CoreError::TemplateNotFound { id: id.to_owned() }),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_template(&self, template: &ExportTemplate) -> Result<ExportTemplate, CoreError> {
        let rec = self
            .client
            .put_template(&template.id, &template.into())
            .await?;
        Ok(rec.into())
    }

    async fn list_templates(&self) -> Result<Vec<ExportTemplate>, CoreError> {
        let records = self
            .client
            .paginate_all(CATALOG_PAGE_LIMIT, |offset, limit| {
                self.client.list_templates(offset, limit)
            })
            .await?;
        Ok(records.into_iter().map(Into::into).collect())
    }
}

// ── Fetch policy ─────────────────────────────────────────────────────

/// Tuning knobs for the fallback ladder, derived from [`ServiceConfig`].
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Standard access page size (clamped to the service ceiling).
    pub page_size: u32,
    /// User cap handed to the bulk-summary and user-detail tiers.
    pub user_cap: u32,
    /// Merge the full active-user roster into user-level results.
    pub include_all_active_users: bool,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            page_size: crate::config::DEFAULT_PAGE_SIZE,
            user_cap: crate::config::DEFAULT_USER_CAP,
            include_all_active_users: false,
        }
    }
}

impl From<&ServiceConfig> for FetchPolicy {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            page_size: config.effective_page_size(),
            user_cap: config.user_cap,
            include_all_active_users: config.include_all_active_users,
        }
    }
}

/// Page coordinates for a single access fetch.
#[derive(Debug, Clone, Copy)]
pub struct PageOptions {
    pub page_size: u32,
    pub page_number: u32,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            page_size: crate::config::DEFAULT_PAGE_SIZE,
            page_number: 1,
        }
    }
}

// ── Fallback client ──────────────────────────────────────────────────

/// Access client with the tiered fallback ladder.
///
/// The central failure-handling contract of the export engine: the fetch
/// methods return plain [`AccessResult`]s, not `Result`s. A failed tier
/// falls through to a cheaper one instead of being retried verbatim, and
/// the last tier synthesizes an empty result with `error` set.
pub struct AccessClient<S> {
    source: S,
    policy: FetchPolicy,
}

impl<S: AccessSource> AccessClient<S> {
    pub fn new(source: S, policy: FetchPolicy) -> Self {
        Self { source, policy }
    }

    /// The underlying source, for operations outside the ladder
    /// (catalog, roster browsing, templates).
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut FetchPolicy {
        &mut self.policy
    }

    /// Fetch one permission's access data, degrading through tiers:
    ///
    /// 1. bulk summary capped at `user_cap` users;
    /// 2. standard query at half the page size;
    /// 3. synthesized empty result with `error` set.
    pub async fn fetch_access(&self, permission: &Permission, page: PageOptions) -> AccessResult {
        let page_size = page.page_size.clamp(1, PAGE_SIZE_CEILING);

        let primary = match self
            .source
            .fetch_summary(&permission.name, self.policy.user_cap)
            .await
        {
            Ok(result) => return branded(result, permission, false),
            Err(e) => e,
        };

        warn!(
            permission = %permission.name,
            error = %primary,
            "summary tier failed; trying page-limited query"
        );

        let reduced = (page_size / 2).max(MIN_FALLBACK_PAGE_SIZE);
        let secondary = match self
            .source
            .fetch_page(&permission.name, reduced, page.page_number)
            .await
        {
            Ok(result) => return branded(result, permission, true),
            Err(e) => e,
        };

        warn!(
            permission = %permission.name,
            error = %secondary,
            "all fetch tiers failed; synthesizing empty result"
        );

        AccessResult::unavailable(permission, format!("{primary}; fallback: {secondary}"))
    }

    /// Fetch the complete user list for one permission.
    ///
    /// Pages the standard query until `has_next` is false, concatenating
    /// pages and de-duplicating by id. A first-page failure falls back to
    /// the capped user-detail tier, then to a synthesized result. With
    /// `include_all_active_users` set, the full active roster is merged
    /// in afterwards -- non-holders arrive with `granted = false`.
    pub async fn fetch_all_users(&self, permission: &Permission, page_size: u32) -> AccessResult {
        let page_size = page_size.clamp(1, PAGE_SIZE_CEILING);
        let mut result = match self.page_users_to_exhaustion(permission, page_size).await {
            Ok(result) => result,
            Err(primary) => {
                warn!(
                    permission = %permission.name,
                    error = %primary,
                    "paged user fetch failed; trying user-detail tier"
                );
                match self
                    .source
                    .fetch_user_fields(&permission.name, USER_EXPORT_FIELDS, self.policy.user_cap)
                    .await
                {
                    Ok(result) => branded(result, permission, true),
                    Err(secondary) => AccessResult::unavailable(
                        permission,
                        format!("{primary}; fallback: {secondary}"),
                    ),
                }
            }
        };

        if self.policy.include_all_active_users {
            self.merge_active_roster(&mut result).await;
        }

        result
    }

    /// Walk the standard query page by page, accumulating users.
    ///
    /// A mid-walk failure keeps what was already collected and marks the
    /// result as a fallback rather than discarding complete pages.
    async fn page_users_to_exhaustion(
        &self,
        permission: &Permission,
        page_size: u32,
    ) -> Result<AccessResult, CoreError> {
        let first = self
            .source
            .fetch_page(&permission.name, page_size, 1)
            .await?;
        let mut result = branded(first, permission, false);

        let mut page_number = 2;
        while result.page.is_some_and(|p| p.has_next) {
            match self
                .source
                .fetch_page(&permission.name, page_size, page_number)
                .await
            {
                Ok(next) => {
                    result.users.extend(next.users);
                    result.page = next.page;
                    page_number += 1;
                }
                Err(e) => {
                    warn!(
                        permission = %permission.name,
                        page = page_number,
                        error = %e,
                        "page walk interrupted; keeping collected pages"
                    );
                    result.is_fallback = true;
                    result.page = None;
                    break;
                }
            }
        }

        result.users = dedup_by_id(result.users, |u| &u.id);
        Ok(result)
    }

    /// Merge the full active-user roster into `result.users`.
    ///
    /// Roster users not already present join with `granted = false` so
    /// "no access" is reportable. A roster failure skips the merge and
    /// leaves the fetched result untouched.
    async fn merge_active_roster(&self, result: &mut AccessResult) {
        let mut roster: Vec<AuditedUser> = Vec::new();
        let mut cursor: Option<EntityId> = None;

        loop {
            let page = match self
                .source
                .active_users_page(ROSTER_PAGE_SIZE, cursor.as_ref())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!(error = %e, "active roster fetch failed; skipping merge");
                    return;
                }
            };

            roster.extend(page.users);

            if !page.has_more {
                break;
            }
            match page.last_user_id {
                Some(id) => cursor = Some(id),
                // No cursor despite has_more: stop rather than loop forever.
                None => break,
            }
        }

        debug!(
            permission = %result.permission_name,
            roster = roster.len(),
            "merging active roster"
        );

        let mut merged = std::mem::take(&mut result.users);
        merged.extend(roster);
        result.users = dedup_by_id(merged, |u| &u.id);
    }
}

/// Stamp catalog metadata and the fallback flag onto a fetched result.
///
/// Wire responses only carry the permission name; the display label comes
/// from the catalog entry.
fn branded(mut result: AccessResult, permission: &Permission, is_fallback: bool) -> AccessResult {
    result.permission_name.clone_from(&permission.name);
    result.permission_label.clone_from(&permission.label);
    result.is_fallback = result.is_fallback || is_fallback;
    result
}
