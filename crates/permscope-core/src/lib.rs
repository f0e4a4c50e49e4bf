// permscope-core: Export engine between permscope-api and consumers (CLI).

pub mod access;
pub mod aggregate;
pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod model;
pub mod pivot;
pub mod workbook;

// ── Primary re-exports ──────────────────────────────────────────────
pub use access::{AccessClient, AccessSource, FetchPolicy, HttpAccessSource, PageOptions};
pub use aggregate::{BatchAggregator, FetchMode, ProgressReporter};
pub use config::{ServiceConfig, TlsVerification};
pub use error::CoreError;
pub use export::{ExportKind, ExportOrchestrator, ExportReport, export_file_name};
pub use pivot::{EntityKind, EntityPivotRow, UserPivotRow, build_entity_pivot, build_user_pivot};
pub use workbook::{Cell, SheetSpec, SpreadsheetWriter, WriterLimits};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    // Identity
    EntityId,
    // Catalog
    Permission,
    // Grant holders
    AuditedUser, GrantEntity, PermissionSource, SourceKind,
    // Access results
    AccessResult, PageInfo, RosterPage,
    // Templates
    ExportTemplate,
    // Job state
    ExportProgress, ExportStatus,
};
