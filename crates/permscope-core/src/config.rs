// ── Runtime connection configuration ──
//
// These types describe *how* to reach the audit service and how an export
// run should be tuned. They carry credential data but never touch disk.
// The CLI constructs a `ServiceConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Hard ceiling on access-page size, matching the service's governor limits.
pub const PAGE_SIZE_CEILING: u32 = 1000;

/// Default page size for standard access queries.
pub const DEFAULT_PAGE_SIZE: u32 = 200;

/// Default number of permissions fetched per batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default hard cap on users returned by the bulk-summary tier.
pub const DEFAULT_USER_CAP: u32 = 2000;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict). Default.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-hosted services with self-signed certs).
    DangerAcceptInvalid,
}

/// Configuration for connecting to a single audit service.
///
/// Built by the CLI, passed to `HttpAccessSource` -- core never reads
/// config files.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Audit service URL (e.g., `https://audit.example.com`).
    pub url: Url,
    /// Static API token.
    pub token: SecretString,
    /// TLS verification mode.
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Page size for standard access queries (clamped to [`PAGE_SIZE_CEILING`]).
    pub page_size: u32,
    /// Permissions fetched per batch during bulk exports.
    pub batch_size: usize,
    /// User cap handed to the bulk-summary tier.
    pub user_cap: u32,
    /// Merge the full active-user roster into user-level exports.
    pub include_all_active_users: bool,
}

impl ServiceConfig {
    /// Build a config with default tuning for the given endpoint.
    pub fn new(url: Url, token: SecretString) -> Self {
        Self {
            url,
            token,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            page_size: DEFAULT_PAGE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            user_cap: DEFAULT_USER_CAP,
            include_all_active_users: false,
        }
    }

    /// Effective page size after clamping to the service ceiling.
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, PAGE_SIZE_CEILING)
    }
}
