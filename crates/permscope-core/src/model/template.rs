use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EntityId;

/// A saved export definition: which permissions and (optionally) which
/// specific users to cover. Persisted in the service's template store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTemplate {
    pub id: String,
    pub name: String,
    pub permission_names: Vec<String>,
    /// Users pinned by the template. These appear in the user pivot even
    /// when no access result mentions them.
    pub user_ids: Vec<EntityId>,
    pub include_all_active_users: bool,
    pub updated_at: Option<DateTime<Utc>>,
}
