// ── Export orchestration ──
//
// Top-level sequencing for one export job:
// Idle -> Preparing -> Running -> GeneratingOutput -> Complete, with
// Cancelled reachable while fetching and Failed from anywhere. The kind
// is resolved into a plan exactly once; everything downstream is driven
// off that plan rather than re-branching per call.

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::access::{AccessClient, AccessSource};
use crate::aggregate::{BatchAggregator, FETCH_PROGRESS_BUDGET, FetchMode, ProgressReporter};
use crate::error::CoreError;
use crate::model::{
    AccessResult, AuditedUser, ExportProgress, ExportStatus, Permission,
};
use crate::pivot::{self, EntityKind};
use crate::workbook::{Cell, SheetSpec, SpreadsheetWriter};

/// Which export variant to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportKind {
    /// Every permission in the catalog.
    Bulk,
    /// Only permissions flagged as privileged.
    Privileged,
    /// Permissions and pinned users from a saved template.
    Template(String),
}

impl ExportKind {
    fn file_prefix(&self) -> &'static str {
        match self {
            Self::Bulk => "System_Permissions_Export",
            Self::Privileged => "Privileged_Permissions_Export",
            Self::Template(_) => "Template_Export",
        }
    }
}

/// The resolved shape of one export run.
struct ExportPlan {
    permissions: Vec<Permission>,
    mode: FetchMode,
    selected_users: Vec<AuditedUser>,
    merge_roster: bool,
    file_prefix: &'static str,
}

/// Outcome of one export job. `status` is the terminal state; file name
/// and bytes are present only on `Complete`.
#[derive(Debug)]
pub struct ExportReport {
    pub status: ExportStatus,
    pub file_name: Option<String>,
    pub bytes: Option<Vec<u8>>,
    /// Results collected before the job ended, in scheduling order.
    pub results: Vec<AccessResult>,
    /// Permissions exported through a fallback tier (or not at all).
    pub fallback_permissions: Vec<String>,
    /// Human-readable failure summary when `status` is `Failed`.
    pub message: Option<String>,
}

/// Drives one export job end to end.
pub struct ExportOrchestrator<S> {
    client: AccessClient<S>,
    kind: ExportKind,
    batch_size: usize,
    progress: ProgressReporter,
    cancel: CancellationToken,
}

impl<S: AccessSource> ExportOrchestrator<S> {
    pub fn new(client: AccessClient<S>, kind: ExportKind, batch_size: usize) -> Self {
        Self {
            client,
            kind,
            batch_size,
            progress: ProgressReporter::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Subscribe to progress snapshots for this job.
    pub fn subscribe_progress(&self) -> watch::Receiver<ExportProgress> {
        self.progress.subscribe()
    }

    /// Token for cooperative cancellation. Cancelling stops new fetches
    /// promptly; in-flight fetches complete and their results are kept
    /// with the job, but no output is generated.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the job to a terminal state. Never panics and never returns
    /// an error directly -- failures land in the report's `status` and
    /// `message` so partial results stay observable.
    pub async fn run(mut self) -> ExportReport {
        self.progress.publish(
            ExportStatus::Preparing,
            0,
            0,
            0,
            Some("Resolving permission set".into()),
        );

        let plan = match self.prepare().await {
            Ok(plan) => plan,
            Err(e) => return self.fail(e.to_string(), Vec::new()),
        };

        if self.cancel.is_cancelled() {
            return self.cancelled(Vec::new(), 0);
        }

        let total = plan.permissions.len();
        if plan.merge_roster {
            self.client.policy_mut().include_all_active_users = true;
        }

        self.progress
            .publish(ExportStatus::Running, 0, 0, total, None);

        let aggregator =
            BatchAggregator::new(&self.client, self.batch_size, self.cancel.clone());
        let results = aggregator
            .run(&plan.permissions, plan.mode, &self.progress)
            .await;

        if self.cancel.is_cancelled() {
            return self.cancelled(results, total);
        }

        self.progress.publish(
            ExportStatus::GeneratingOutput,
            FETCH_PROGRESS_BUDGET,
            total,
            total,
            Some("Building pivot tables".into()),
        );

        let sheets = build_sheets(&plan, &results);

        self.progress.publish(
            ExportStatus::GeneratingOutput,
            95,
            total,
            total,
            Some("Writing workbook".into()),
        );

        let writer = SpreadsheetWriter::new();
        let bytes = match writer.write_workbook(&sheets) {
            Ok(bytes) => bytes,
            Err(e) => return self.fail(e.to_string(), results),
        };

        let file_name = export_file_name(plan.file_prefix, Utc::now());
        let fallback_permissions = fallback_names(&results);

        info!(
            file = %file_name,
            permissions = total,
            fallbacks = fallback_permissions.len(),
            "export complete"
        );
        self.progress.publish(
            ExportStatus::Complete,
            100,
            total,
            total,
            Some("Export complete".into()),
        );

        ExportReport {
            status: ExportStatus::Complete,
            file_name: Some(file_name),
            bytes: Some(bytes),
            results,
            fallback_permissions,
            message: None,
        }
    }

    /// Resolve the export kind into a concrete plan. Runs once.
    async fn prepare(&self) -> Result<ExportPlan, CoreError> {
        let catalog = self
            .client
            .source()
            .list_permissions()
            .await
            .map_err(|e| CoreError::CatalogUnavailable {
                message: e.to_string(),
            })?;

        let default_mode = if self.client.policy().include_all_active_users {
            FetchMode::AllUsers
        } else {
            FetchMode::Summary
        };

        let plan = match &self.kind {
            ExportKind::Bulk => ExportPlan {
                permissions: catalog,
                mode: default_mode,
                selected_users: Vec::new(),
                merge_roster: false,
                file_prefix: self.kind.file_prefix(),
            },
            ExportKind::Privileged => {
                let privileged: Vec<Permission> =
                    catalog.into_iter().filter(|p| p.is_privileged).collect();
                ExportPlan {
                    permissions: privileged,
                    mode: default_mode,
                    selected_users: Vec::new(),
                    merge_roster: false,
                    file_prefix: self.kind.file_prefix(),
                }
            }
            ExportKind::Template(id) => {
                let template = self.client.source().load_template(id).await?;
                let permissions = template
                    .permission_names
                    .iter()
                    .map(|name| {
                        catalog
                            .iter()
                            .find(|p| &p.name == name)
                            .cloned()
                            // A template may name permissions the catalog no
                            // longer lists; fetch them anyway so the summary
                            // sheet records what happened.
                            .unwrap_or_else(|| Permission::named(name.clone()))
                    })
                    .collect();
                let selected_users = template
                    .user_ids
                    .iter()
                    .cloned()
                    .map(AuditedUser::placeholder)
                    .collect();
                ExportPlan {
                    permissions,
                    mode: FetchMode::AllUsers,
                    selected_users,
                    merge_roster: template.include_all_active_users,
                    file_prefix: self.kind.file_prefix(),
                }
            }
        };

        if plan.permissions.is_empty() {
            return Err(CoreError::EmptyExport {
                message: match &self.kind {
                    ExportKind::Privileged => "catalog lists no privileged permissions".into(),
                    ExportKind::Template(id) => format!("template '{id}' names no permissions"),
                    ExportKind::Bulk => "permission catalog is empty".into(),
                },
            });
        }

        Ok(plan)
    }

    fn fail(self, message: String, results: Vec<AccessResult>) -> ExportReport {
        warn!(%message, "export failed");
        let snapshot = self.progress.current();
        self.progress.publish(
            ExportStatus::Failed,
            snapshot.percent,
            snapshot.processed,
            snapshot.total,
            Some(message.clone()),
        );
        let fallback_permissions = fallback_names(&results);
        ExportReport {
            status: ExportStatus::Failed,
            file_name: None,
            bytes: None,
            results,
            fallback_permissions,
            message: Some(message),
        }
    }

    fn cancelled(self, results: Vec<AccessResult>, total: usize) -> ExportReport {
        info!(collected = results.len(), "export cancelled");
        let snapshot = self.progress.current();
        self.progress.publish(
            ExportStatus::Cancelled,
            snapshot.percent,
            results.len(),
            total,
            Some("Export cancelled".into()),
        );
        let fallback_permissions = fallback_names(&results);
        ExportReport {
            status: ExportStatus::Cancelled,
            file_name: None,
            bytes: None,
            results,
            fallback_permissions,
            message: None,
        }
    }
}

fn fallback_names(results: &[AccessResult]) -> Vec<String> {
    results
        .iter()
        .filter(|r| r.is_fallback)
        .map(|r| r.permission_name.clone())
        .collect()
}

// ── Sheet construction ───────────────────────────────────────────────

/// Assemble the workbook's sheets from the job's results.
fn build_sheets(plan: &ExportPlan, results: &[AccessResult]) -> Vec<SheetSpec> {
    let requested = &plan.permissions;
    let mut sheets = Vec::with_capacity(5);

    for kind in [
        EntityKind::Profiles,
        EntityKind::PermissionSets,
        EntityKind::PermissionSetGroups,
    ] {
        sheets.push(entity_sheet(kind, results, requested));
    }

    let selected = if plan.selected_users.is_empty() {
        None
    } else {
        Some(plan.selected_users.as_slice())
    };
    sheets.push(user_sheet(results, requested, selected));
    sheets.push(summary_sheet(results));

    sheets
}

fn entity_sheet(
    kind: EntityKind,
    results: &[AccessResult],
    requested: &[Permission],
) -> SheetSpec {
    let rows = pivot::build_entity_pivot(results, kind, requested);

    let mut header = vec![
        "Label".to_owned(),
        "API Name".to_owned(),
        "Description".to_owned(),
        "Assignments".to_owned(),
        "Custom".to_owned(),
    ];
    header.extend(requested.iter().map(|p| p.label.clone()));

    let rows = rows
        .into_iter()
        .map(|row| {
            let mut cells = vec![
                Cell::Text(row.entity.label),
                Cell::Text(row.entity.name),
                Cell::Text(row.entity.description.unwrap_or_default()),
                row.entity
                    .assignment_count
                    .map_or(Cell::Text(String::new()), Cell::Int),
                Cell::Text(match row.entity.is_custom {
                    Some(true) => "Yes".to_owned(),
                    Some(false) => "No".to_owned(),
                    None => String::new(),
                }),
            ];
            cells.extend(row.permissions.into_values().map(Cell::Bool));
            cells
        })
        .collect();

    SheetSpec {
        name: kind.to_string(),
        header,
        rows,
    }
}

fn user_sheet(
    results: &[AccessResult],
    requested: &[Permission],
    selected: Option<&[AuditedUser]>,
) -> SheetSpec {
    let rows = pivot::build_user_pivot(results, requested, selected);

    let mut header = vec![
        "Username".to_owned(),
        "Display Name".to_owned(),
        "Email".to_owned(),
        "Profile".to_owned(),
        "Active".to_owned(),
        "Granted Via".to_owned(),
    ];
    header.extend(requested.iter().map(|p| p.label.clone()));

    let rows = rows
        .into_iter()
        .map(|row| {
            let mut cells = vec![
                Cell::Text(row.user.username),
                Cell::Text(row.user.display_name),
                Cell::Text(row.user.email),
                Cell::Text(row.user.profile_name),
                Cell::Text(if row.user.is_active { "Yes" } else { "No" }.to_owned()),
                Cell::Text(row.source.unwrap_or_default()),
            ];
            cells.extend(row.permissions.into_values().map(Cell::Bool));
            cells
        })
        .collect();

    SheetSpec {
        name: "Users".to_owned(),
        header,
        rows,
    }
}

/// One row per permission: counts plus fallback/error bookkeeping, so
/// partial failures are documented in the artifact itself.
fn summary_sheet(results: &[AccessResult]) -> SheetSpec {
    let header = vec![
        "Permission".to_owned(),
        "Label".to_owned(),
        "Profiles".to_owned(),
        "Permission Sets".to_owned(),
        "Groups".to_owned(),
        "Total Users".to_owned(),
        "Fallback".to_owned(),
        "Error".to_owned(),
    ];

    let rows = results
        .iter()
        .map(|r| {
            vec![
                Cell::Text(r.permission_name.clone()),
                Cell::Text(r.permission_label.clone()),
                Cell::Int(r.profiles.len() as u64),
                Cell::Int(r.permission_sets.len() as u64),
                Cell::Int(r.permission_set_groups.len() as u64),
                Cell::Int(r.total_users),
                Cell::Text(if r.is_fallback { "Yes" } else { "" }.to_owned()),
                Cell::Text(r.error.clone().unwrap_or_default()),
            ]
        })
        .collect();

    SheetSpec {
        name: "Export Summary".to_owned(),
        header,
        rows,
    }
}

// ── File naming ──────────────────────────────────────────────────────

/// Deterministic export file name: prefix + ISO-ish timestamp with
/// `:`, `-`, and `T` replaced by `_`.
pub fn export_file_name(prefix: &str, now: DateTime<Utc>) -> String {
    let stamp: String = now
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
        .chars()
        .map(|c| if matches!(c, ':' | '-' | 'T') { '_' } else { c })
        .collect();
    format!("{prefix}_{stamp}.xlsx")
}
