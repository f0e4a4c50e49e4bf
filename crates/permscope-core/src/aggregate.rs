// ── Batched access aggregation ──
//
// Drives the per-permission fetch loop for an export job: permissions are
// processed in batches, sequentially within a batch, and results are
// appended in input order. Failures never abort the loop -- the access
// client's fallback ladder guarantees every permission yields a result.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::access::{AccessClient, AccessSource, PageOptions};
use crate::model::{AccessResult, ExportProgress, ExportStatus, Permission};

/// Share of the progress range reserved for data fetch; the remainder
/// belongs to workbook generation.
pub const FETCH_PROGRESS_BUDGET: u8 = 90;

// ── Progress reporting ───────────────────────────────────────────────

/// Publisher for observable job progress.
///
/// Enforces the two job-state invariants in one place: percent is
/// strictly non-decreasing (every update takes the max of current and
/// new), and terminal states are sticky.
pub struct ProgressReporter {
    tx: watch::Sender<ExportProgress>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ExportProgress::idle());
        Self { tx }
    }

    /// Subscribe to progress snapshots.
    pub fn subscribe(&self) -> watch::Receiver<ExportProgress> {
        self.tx.subscribe()
    }

    /// The latest published snapshot.
    pub fn current(&self) -> ExportProgress {
        self.tx.borrow().clone()
    }

    /// Publish an update.
    ///
    /// Ignored entirely once a terminal state has been published. An
    /// illegal status transition is dropped with a warning; counters and
    /// percent are clamped to be non-decreasing.
    pub fn publish(
        &self,
        status: ExportStatus,
        percent: u8,
        processed: usize,
        total: usize,
        message: Option<String>,
    ) {
        let current = self.tx.borrow().clone();

        if current.status.is_terminal() {
            return;
        }
        if status != current.status && !current.status.can_transition(status) {
            warn!(from = %current.status, to = %status, "dropping illegal status transition");
            return;
        }

        let next = ExportProgress {
            status,
            percent: current.percent.max(percent.min(100)),
            processed: current.processed.max(processed),
            total: total.max(current.total),
            message: message.or(current.message),
        };

        self.tx.send_replace(next);
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Aggregator ───────────────────────────────────────────────────────

/// Which fetch path the aggregator drives for each permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Bulk-summary ladder: entity lists plus a capped user sample.
    Summary,
    /// Complete user enumeration (paged to exhaustion, roster merge).
    AllUsers,
}

/// Batched, cancellable fetch of access data for N permissions.
pub struct BatchAggregator<'a, S> {
    client: &'a AccessClient<S>,
    batch_size: usize,
    cancel: CancellationToken,
}

impl<'a, S: AccessSource> BatchAggregator<'a, S> {
    pub fn new(client: &'a AccessClient<S>, batch_size: usize, cancel: CancellationToken) -> Self {
        Self {
            client,
            batch_size: batch_size.max(1),
            cancel,
        }
    }

    /// Fetch access data for every permission, in input order.
    ///
    /// Resolves once all permissions have a result (success or
    /// fallback-error). On cancellation, stops scheduling new fetches and
    /// returns what was collected; the caller decides what the partial
    /// list means. Progress lands in the 0..=[`FETCH_PROGRESS_BUDGET`]
    /// range.
    pub async fn run(
        &self,
        permissions: &[Permission],
        mode: FetchMode,
        progress: &ProgressReporter,
    ) -> Vec<AccessResult> {
        let total = permissions.len();
        let page_size = self.client.policy().page_size;
        let mut results = Vec::with_capacity(total);

        'batches: for batch in permissions.chunks(self.batch_size) {
            if self.cancel.is_cancelled() {
                debug!(collected = results.len(), "cancellation observed before batch");
                break;
            }

            for permission in batch {
                if self.cancel.is_cancelled() {
                    debug!(collected = results.len(), "cancellation observed mid-batch");
                    break 'batches;
                }

                let result = match mode {
                    FetchMode::Summary => {
                        self.client
                            .fetch_access(
                                permission,
                                PageOptions {
                                    page_size,
                                    page_number: 1,
                                },
                            )
                            .await
                    }
                    FetchMode::AllUsers => {
                        self.client.fetch_all_users(permission, page_size).await
                    }
                };

                if let Some(error) = &result.error {
                    warn!(permission = %permission.name, %error, "permission exported without data");
                }

                results.push(result);

                let percent = fetch_percent(results.len(), total);
                progress.publish(ExportStatus::Running, percent, results.len(), total, None);
            }
        }

        results
    }
}

/// Map `processed / total` into the fetch share of the progress range.
fn fetch_percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return FETCH_PROGRESS_BUDGET;
    }
    let scaled = processed.saturating_mul(usize::from(FETCH_PROGRESS_BUDGET)) / total;
    u8::try_from(scaled).unwrap_or(FETCH_PROGRESS_BUDGET)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::access::FetchPolicy;
    use crate::error::CoreError;
    use crate::model::{AuditedUser, EntityId, ExportTemplate, RosterPage};

    /// Source whose summary and page tiers both fail for the listed
    /// permissions, and which can cancel a token after N summary calls.
    struct FlakySource {
        always_fails: HashSet<String>,
        calls: AtomicUsize,
        cancel_after: Option<(usize, CancellationToken)>,
    }

    impl FlakySource {
        fn new(always_fails: &[&str]) -> Self {
            Self {
                always_fails: always_fails.iter().map(|s| (*s).to_owned()).collect(),
                calls: AtomicUsize::new(0),
                cancel_after: None,
            }
        }
    }

    impl AccessSource for FlakySource {
        async fn list_permissions(&self) -> Result<Vec<Permission>, CoreError> {
            Ok(Vec::new())
        }

        async fn fetch_summary(
            &self,
            permission_name: &str,
            _max_users: u32,
        ) -> Result<AccessResult, CoreError> {
            let seen = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((limit, token)) = &self.cancel_after {
                if seen >= *limit {
                    token.cancel();
                }
            }
            if self.always_fails.contains(permission_name) {
                return Err(CoreError::Internal("summary down".into()));
            }
            Ok(AccessResult::empty(&Permission::named(permission_name)))
        }

        async fn fetch_page(
            &self,
            permission_name: &str,
            _page_size: u32,
            _page_number: u32,
        ) -> Result<AccessResult, CoreError> {
            if self.always_fails.contains(permission_name) {
                return Err(CoreError::Internal("page down".into()));
            }
            Ok(AccessResult::empty(&Permission::named(permission_name)))
        }

        async fn fetch_user_fields(
            &self,
            permission_name: &str,
            _fields: &[&str],
            _max_users: u32,
        ) -> Result<AccessResult, CoreError> {
            Ok(AccessResult::empty(&Permission::named(permission_name)))
        }

        async fn active_users_page(
            &self,
            _page_size: u32,
            _after_id: Option<&EntityId>,
        ) -> Result<RosterPage, CoreError> {
            Ok(RosterPage {
                users: Vec::<AuditedUser>::new(),
                has_more: false,
                last_user_id: None,
                total_count: 0,
            })
        }

        async fn load_template(&self, id: &str) -> Result<ExportTemplate, CoreError> {
            Err(CoreError::TemplateNotFound { id: id.to_owned() })
        }

        async fn save_template(
            &self,
            template: &ExportTemplate,
        ) -> Result<ExportTemplate, CoreError> {
            Ok(template.clone())
        }

        async fn list_templates(&self) -> Result<Vec<ExportTemplate>, CoreError> {
            Ok(Vec::new())
        }
    }

    fn permissions(names: &[&str]) -> Vec<Permission> {
        names.iter().map(|n| Permission::named(*n)).collect()
    }

    fn ready_reporter() -> ProgressReporter {
        let progress = ProgressReporter::new();
        progress.publish(ExportStatus::Preparing, 0, 0, 0, None);
        progress.publish(ExportStatus::Running, 0, 0, 0, None);
        progress
    }

    #[tokio::test]
    async fn every_permission_gets_a_result_despite_failures() {
        let client = AccessClient::new(FlakySource::new(&["B", "D"]), FetchPolicy::default());
        let cancel = CancellationToken::new();
        let aggregator = BatchAggregator::new(&client, 2, cancel);
        let perms = permissions(&["A", "B", "C", "D", "E"]);

        let results = aggregator
            .run(&perms, FetchMode::Summary, &ready_reporter())
            .await;

        assert_eq!(results.len(), 5);
        // Input order preserved.
        let names: Vec<&str> = results.iter().map(|r| r.permission_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D", "E"]);
        // Failures carry error + fallback markers; successes are clean.
        assert!(results[1].error.is_some() && results[1].is_fallback);
        assert!(results[3].error.is_some() && results[3].is_fallback);
        assert!(results[0].error.is_none());
    }

    #[tokio::test]
    async fn cancellation_stops_scheduling_new_fetches() {
        let cancel = CancellationToken::new();
        let mut source = FlakySource::new(&[]);
        // Cancel once the second fetch (end of batch 1) has been issued.
        source.cancel_after = Some((2, cancel.clone()));
        let client = AccessClient::new(source, FetchPolicy::default());
        let aggregator = BatchAggregator::new(&client, 2, cancel);
        let perms = permissions(&["A", "B", "C", "D", "E", "F"]);

        let results = aggregator
            .run(&perms, FetchMode::Summary, &ready_reporter())
            .await;

        // Batch 1 completed; nothing afterwards was fetched.
        assert_eq!(results.len(), 2);
        assert_eq!(client.source().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn progress_reaches_fetch_budget() {
        let client = AccessClient::new(FlakySource::new(&[]), FetchPolicy::default());
        let progress = ready_reporter();
        let aggregator = BatchAggregator::new(&client, 3, CancellationToken::new());
        let perms = permissions(&["A", "B", "C"]);

        aggregator.run(&perms, FetchMode::Summary, &progress).await;

        let last = progress.current();
        assert_eq!(last.percent, FETCH_PROGRESS_BUDGET);
        assert_eq!(last.processed, 3);
        assert_eq!(last.total, 3);
    }

    #[test]
    fn reporter_never_regresses() {
        let progress = ProgressReporter::new();
        progress.publish(ExportStatus::Preparing, 5, 0, 10, None);
        progress.publish(ExportStatus::Running, 40, 4, 10, None);
        // A stale update with a lower percent must not move progress back.
        progress.publish(ExportStatus::Running, 20, 2, 10, None);

        let current = progress.current();
        assert_eq!(current.percent, 40);
        assert_eq!(current.processed, 4);
    }

    #[test]
    fn reporter_terminal_states_are_sticky() {
        let progress = ProgressReporter::new();
        progress.publish(ExportStatus::Preparing, 0, 0, 0, None);
        progress.publish(ExportStatus::Cancelled, 10, 1, 5, None);
        progress.publish(ExportStatus::Running, 50, 3, 5, None);

        assert_eq!(progress.current().status, ExportStatus::Cancelled);
        assert_eq!(progress.current().percent, 10);
    }

    #[test]
    fn reporter_rejects_illegal_transitions() {
        let progress = ProgressReporter::new();
        // Idle cannot jump straight to GeneratingOutput.
        progress.publish(ExportStatus::GeneratingOutput, 95, 0, 0, None);
        assert_eq!(progress.current().status, ExportStatus::Idle);
    }
}
