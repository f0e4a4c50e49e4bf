// ── Export job state ──
//
// Explicit value objects for job status and progress, published through a
// watch channel and updated only via validated transitions.

use serde::{Deserialize, Serialize};

/// Lifecycle of one export job.
///
/// `Complete`, `Failed`, and `Cancelled` are sticky: once reached, no
/// further transitions are accepted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
pub enum ExportStatus {
    Idle,
    Preparing,
    Running,
    GeneratingOutput,
    Complete,
    Failed,
    Cancelled,
}

impl ExportStatus {
    /// Whether this state accepts no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Cancelled)
    }

    /// Whether a transition from `self` to `next` is legal.
    ///
    /// Forward path: Idle -> Preparing -> Running -> GeneratingOutput ->
    /// Complete. `Cancelled` is reachable from Preparing/Running; `Failed`
    /// from any non-terminal state.
    pub fn can_transition(self, next: Self) -> bool {
        if self.is_terminal() || next == self {
            return false;
        }
        match next {
            Self::Idle => false,
            Self::Preparing => self == Self::Idle,
            Self::Running => self == Self::Preparing,
            Self::GeneratingOutput => self == Self::Running,
            Self::Complete => self == Self::GeneratingOutput,
            Self::Cancelled => matches!(self, Self::Preparing | Self::Running),
            Self::Failed => true,
        }
    }
}

/// Observable progress snapshot for one export job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportProgress {
    pub status: ExportStatus,
    /// 0-100. 0-90 covers data fetch, 90-100 workbook generation.
    pub percent: u8,
    /// Permissions with a result so far.
    pub processed: usize,
    /// Permissions scheduled for this job.
    pub total: usize,
    pub message: Option<String>,
}

impl ExportProgress {
    pub fn idle() -> Self {
        Self {
            status: ExportStatus::Idle,
            percent: 0,
            processed: 0,
            total: 0,
            message: None,
        }
    }
}
