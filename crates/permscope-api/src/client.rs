// Hand-crafted async HTTP client for the audit service REST API.
//
// Base path: /audit/v1/
// Auth: X-API-TOKEN header

use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::Error;
use crate::transport::TransportConfig;
use crate::types;

// ── Error response shape from the audit service ──────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the audit service.
///
/// Uses token authentication and communicates via JSON REST endpoints
/// under `/audit/v1/`.
pub struct AuditClient {
    http: reqwest::Client,
    base_url: Url,
}

impl AuditClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API token and transport config.
    ///
    /// Injects `X-API-TOKEN` as a default header on every request.
    pub fn from_token(
        base_url: &str,
        token: &secrecy::SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client_with_token(token)?;
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Build the base URL, appending `/audit/` unless already present.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();

        if path.ends_with("/audit") {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}/audit/"));
        }

        Ok(url)
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"v1/permissions"`) onto the base URL.
    fn url(&self, path: &str) -> Result<Url, Error> {
        // base_url always ends with `/audit/`, so joining `v1/…` works.
        self.base_url.join(path).map_err(Error::InvalidUrl)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        self.handle_response(resp).await
    }

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        self.handle_response(resp).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("PUT {url}");

        let resp = self.http.put(url).json(body).send().await?;
        self.handle_response(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview = &body[..body.len().min(200)];
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::InvalidToken;
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Error::RateLimited { retry_after_secs };
        }

        let raw = resp.text().await.unwrap_or_default();

        if let Ok(err) = serde_json::from_str::<ErrorResponse>(&raw) {
            Error::Service {
                status: status.as_u16(),
                message: err.message.unwrap_or_else(|| status.to_string()),
                code: err.code,
            }
        } else {
            Error::Service {
                status: status.as_u16(),
                message: if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                },
                code: None,
            }
        }
    }

    // ── Pagination helper ────────────────────────────────────────────

    /// Collect all pages of an offset/limit endpoint into a single `Vec<T>`.
    pub async fn paginate_all<T, F, Fut>(&self, limit: i32, fetch: F) -> Result<Vec<T>, Error>
    where
        F: Fn(i64, i32) -> Fut,
        Fut: Future<Output = Result<types::Page<T>, Error>>,
    {
        let mut all = Vec::new();
        let mut offset: i64 = 0;

        loop {
            let page = fetch(offset, limit).await?;
            let received = page.data.len();
            all.extend(page.data);

            let limit_usize = usize::try_from(limit).unwrap_or(0);
            if received < limit_usize
                || i64::try_from(all.len()).unwrap_or(i64::MAX) >= page.total_count
            {
                break;
            }

            offset += i64::try_from(received).unwrap_or(i64::MAX);
        }

        Ok(all)
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Permission catalog ───────────────────────────────────────────

    pub async fn list_permissions(
        &self,
        offset: i64,
        limit: i32,
    ) -> Result<types::Page<types::PermissionRecord>, Error> {
        self.get_with_params(
            "v1/permissions",
            &[("offset", offset.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    // ── Access fetches ───────────────────────────────────────────────

    /// Bulk access summary with a hard cap on returned users (fast tier).
    pub async fn fetch_access_summary(
        &self,
        permission_name: &str,
        max_users: u32,
    ) -> Result<types::AccessSummaryResponse, Error> {
        self.get_with_params(
            &format!("v1/permissions/{permission_name}/access/summary"),
            &[("maxUsers", max_users.to_string())],
        )
        .await
    }

    /// Page-limited standard access query.
    pub async fn fetch_access_paged(
        &self,
        permission_name: &str,
        page_size: u32,
        page_number: u32,
    ) -> Result<types::AccessPageResponse, Error> {
        self.get_with_params(
            &format!("v1/permissions/{permission_name}/access"),
            &[
                ("pageSize", page_size.to_string()),
                ("pageNumber", page_number.to_string()),
            ],
        )
        .await
    }

    /// User-detail access query with an explicit field selection.
    pub async fn fetch_access_user_fields(
        &self,
        permission_name: &str,
        fields: &[&str],
        max_users: u32,
    ) -> Result<types::UserAccessResponse, Error> {
        self.get_with_params(
            &format!("v1/permissions/{permission_name}/access/users"),
            &[
                ("fields", fields.join(",")),
                ("maxUsers", max_users.to_string()),
            ],
        )
        .await
    }

    // ── Active-user roster ───────────────────────────────────────────

    /// One page of the active-user roster, keyed by a "last seen id" cursor.
    pub async fn list_active_users(
        &self,
        page_size: u32,
        after_id: Option<&str>,
    ) -> Result<types::ActiveUsersPage, Error> {
        let mut params = vec![("pageSize", page_size.to_string())];
        if let Some(id) = after_id {
            params.push(("afterId", id.to_owned()));
        }
        self.get_with_params("v1/users/active", &params).await
    }

    // ── Template store ───────────────────────────────────────────────

    pub async fn list_templates(
        &self,
        offset: i64,
        limit: i32,
    ) -> Result<types::Page<types::TemplateRecord>, Error> {
        self.get_with_params(
            "v1/templates",
            &[("offset", offset.to_string()), ("limit", limit.to_string())],
        )
        .await
    }

    pub async fn get_template(&self, id: &str) -> Result<types::TemplateRecord, Error> {
        self.get(&format!("v1/templates/{id}")).await
    }

    pub async fn put_template(
        &self,
        id: &str,
        body: &types::TemplateUpsert,
    ) -> Result<types::TemplateRecord, Error> {
        self.put(&format!("v1/templates/{id}"), body).await
    }
}
