//! Scan lifecycle state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::result::ScanResult;

/// Lifecycle status of a scan.
///
/// Transitions are monotonic: `Pending -> Running -> (Completed | Failed |
/// Cancelled)`. Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ScanStatus {
    /// Whether this status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanStatus::Completed | ScanStatus::Failed | ScanStatus::Cancelled
        )
    }

    /// Whether the lifecycle FSM allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: ScanStatus) -> bool {
        match (self, next) {
            (ScanStatus::Pending, ScanStatus::Running) => true,
            (ScanStatus::Pending, ScanStatus::Failed) => true,
            (ScanStatus::Pending, ScanStatus::Cancelled) => true,
            (ScanStatus::Running, ScanStatus::Completed) => true,
            (ScanStatus::Running, ScanStatus::Failed) => true,
            (ScanStatus::Running, ScanStatus::Cancelled) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScanStatus::Pending => "pending",
            ScanStatus::Running => "running",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
            ScanStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Registry-owned state of one scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanState {
    /// Scan identifier
    pub scan_id: Uuid,
    /// Target URL from the request
    pub url: String,
    /// Requesting organization
    pub company_name: String,
    /// Current lifecycle status
    pub status: ScanStatus,
    /// Progress percent, 0-100, monotonic non-decreasing within a run
    pub progress: u8,
    /// Latest status message
    pub message: String,
    /// Coarse failure reason, set when status is Failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the scan was admitted
    pub created_at: DateTime<Utc>,
    /// Last state change
    pub updated_at: DateTime<Utc>,
    /// Final result, set when status is Completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Box<ScanResult>>,
}

impl ScanState {
    /// A freshly admitted scan
    pub fn pending(scan_id: Uuid, url: impl Into<String>, company_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            scan_id,
            url: url.into(),
            company_name: company_name.into(),
            status: ScanStatus::Pending,
            progress: 0,
            message: "queued".to_string(),
            error: None,
            created_at: now,
            updated_at: now,
            result: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!ScanStatus::Pending.is_terminal());
        assert!(!ScanStatus::Running.is_terminal());
        assert!(ScanStatus::Completed.is_terminal());
        assert!(ScanStatus::Failed.is_terminal());
        assert!(ScanStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_legal_transitions() {
        assert!(ScanStatus::Pending.can_transition_to(ScanStatus::Running));
        assert!(ScanStatus::Running.can_transition_to(ScanStatus::Completed));
        assert!(ScanStatus::Running.can_transition_to(ScanStatus::Cancelled));
        assert!(ScanStatus::Pending.can_transition_to(ScanStatus::Cancelled));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!ScanStatus::Completed.can_transition_to(ScanStatus::Running));
        assert!(!ScanStatus::Cancelled.can_transition_to(ScanStatus::Completed));
        assert!(!ScanStatus::Running.can_transition_to(ScanStatus::Pending));
        assert!(!ScanStatus::Pending.can_transition_to(ScanStatus::Completed));
    }
}
