use serde::{Deserialize, Serialize};

/// A named capability flag in the audited system (e.g. "Modify All Data").
///
/// Immutable once loaded from the catalog; lives for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Unique API identifier.
    pub name: String,
    /// Display name, used as the pivot column header.
    pub label: String,
    /// Marks permissions covered by the privileged-only export variant.
    pub is_privileged: bool,
}

impl Permission {
    /// A permission known only by name (e.g. named in a template but
    /// missing from the catalog). The label falls back to the name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            is_privileged: false,
        }
    }
}
