//! The process-wide scan table and admission gate

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

use audit_core::error::{AuditError, Result};
use audit_core::request::ScanRequest;
use audit_core::result::ScanResult;
use audit_core::state::{ScanState, ScanStatus};

/// Owns the `scan_id -> ScanState` table. All mutation goes through the
/// lifecycle-checked methods below; reads hand out clones so no caller
/// ever holds the lock across I/O.
pub struct ScanRegistry {
    scans: Mutex<HashMap<Uuid, ScanState>>,
    max_concurrent: usize,
}

impl ScanRegistry {
    /// Registry admitting at most `max_concurrent` active scans
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            scans: Mutex::new(HashMap::new()),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Admit a scan: atomically checks the active count and inserts a
    /// Pending state. On rejection nothing is allocated.
    pub fn admit(&self, request: &ScanRequest) -> Result<Uuid> {
        let mut scans = self.scans.lock();
        let active = scans.values().filter(|s| !s.status.is_terminal()).count();
        if active >= self.max_concurrent {
            return Err(AuditError::TooManyActiveScans {
                active,
                max: self.max_concurrent,
            });
        }

        let scan_id = Uuid::new_v4();
        scans.insert(
            scan_id,
            ScanState::pending(scan_id, &request.url, &request.company_name),
        );
        tracing::info!(scan_id = %scan_id, url = %request.url, "scan admitted");
        Ok(scan_id)
    }

    /// Apply a lifecycle transition, rejecting illegal ones
    pub fn transition(&self, scan_id: Uuid, next: ScanStatus) -> Result<()> {
        let mut scans = self.scans.lock();
        let state = scans.get_mut(&scan_id).ok_or(AuditError::NotFound(scan_id))?;
        if !state.status.can_transition_to(next) {
            return Err(AuditError::Internal(format!(
                "illegal transition {} -> {} for scan {scan_id}",
                state.status, next
            )));
        }
        state.status = next;
        state.updated_at = Utc::now();
        tracing::debug!(scan_id = %scan_id, status = %next, "scan state transition");
        Ok(())
    }

    /// Update progress and message. Progress is monotonic: a lower value
    /// than the current one is rejected and the state left unchanged.
    pub fn set_progress(&self, scan_id: Uuid, progress: u8, message: &str) -> Result<()> {
        let mut scans = self.scans.lock();
        let state = scans.get_mut(&scan_id).ok_or(AuditError::NotFound(scan_id))?;
        let progress = progress.min(100);
        if progress < state.progress {
            return Err(AuditError::Internal(format!(
                "progress regression {} -> {} for scan {scan_id}",
                state.progress, progress
            )));
        }
        state.progress = progress;
        state.message = message.to_string();
        state.updated_at = Utc::now();
        Ok(())
    }

    /// Transition to Completed and attach the result; progress becomes 100
    pub fn complete(&self, scan_id: Uuid, result: ScanResult) -> Result<()> {
        let mut scans = self.scans.lock();
        let state = scans.get_mut(&scan_id).ok_or(AuditError::NotFound(scan_id))?;
        if !state.status.can_transition_to(ScanStatus::Completed) {
            return Err(AuditError::Internal(format!(
                "illegal transition {} -> completed for scan {scan_id}",
                state.status
            )));
        }
        state.status = ScanStatus::Completed;
        state.progress = 100;
        state.message = "completed".to_string();
        state.result = Some(Box::new(result));
        state.updated_at = Utc::now();
        Ok(())
    }

    /// Transition to Failed with a coarse client-facing reason
    pub fn fail(&self, scan_id: Uuid, reason: &str) -> Result<()> {
        let mut scans = self.scans.lock();
        let state = scans.get_mut(&scan_id).ok_or(AuditError::NotFound(scan_id))?;
        if !state.status.can_transition_to(ScanStatus::Failed) {
            return Err(AuditError::Internal(format!(
                "illegal transition {} -> failed for scan {scan_id}",
                state.status
            )));
        }
        state.status = ScanStatus::Failed;
        state.message = reason.to_string();
        state.error = Some(reason.to_string());
        state.updated_at = Utc::now();
        Ok(())
    }

    /// Transition to Cancelled
    pub fn cancel(&self, scan_id: Uuid) -> Result<()> {
        let mut scans = self.scans.lock();
        let state = scans.get_mut(&scan_id).ok_or(AuditError::NotFound(scan_id))?;
        if !state.status.can_transition_to(ScanStatus::Cancelled) {
            return Err(AuditError::AlreadyTerminal(scan_id));
        }
        state.status = ScanStatus::Cancelled;
        state.message = "cancelled".to_string();
        state.updated_at = Utc::now();
        Ok(())
    }

    /// Snapshot of one scan's state
    pub fn get(&self, scan_id: Uuid) -> Option<ScanState> {
        self.scans.lock().get(&scan_id).cloned()
    }

    /// Snapshot view, optionally filtered by status, newest first
    pub fn list(&self, status: Option<ScanStatus>) -> Vec<ScanState> {
        let mut states: Vec<ScanState> = self
            .scans
            .lock()
            .values()
            .filter(|s| status.map_or(true, |wanted| s.status == wanted))
            .cloned()
            .collect();
        states.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        states
    }

    /// Number of non-terminal scans
    pub fn active_count(&self) -> usize {
        self.scans
            .lock()
            .values()
            .filter(|s| !s.status.is_terminal())
            .count()
    }

    /// Remove terminal entries older than `retention`; returns how many
    /// were removed
    pub fn sweep(&self, retention: chrono::Duration) -> usize {
        let cutoff = Utc::now() - retention;
        let mut scans = self.scans.lock();
        let before = scans.len();
        scans.retain(|_, s| !(s.status.is_terminal() && s.updated_at < cutoff));
        before - scans.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_core::request::{ScanMode, ScannerToggles};

    fn request() -> ScanRequest {
        ScanRequest {
            url: "https://example.com".into(),
            company_name: "ACME".into(),
            email: "a@b.example".into(),
            scanners: ScannerToggles::all(),
            timeout_ms: 30_000,
            mode: ScanMode::Simulate,
            max_pages: 1,
            max_depth: 1,
        }
    }

    #[test]
    fn test_admission_limit() {
        let registry = ScanRegistry::new(2);
        registry.admit(&request()).unwrap();
        registry.admit(&request()).unwrap();
        let err = registry.admit(&request()).unwrap_err();
        assert!(matches!(err, AuditError::TooManyActiveScans { active: 2, max: 2 }));
        assert_eq!(registry.active_count(), 2);
    }

    #[test]
    fn test_terminal_scans_free_capacity() {
        let registry = ScanRegistry::new(1);
        let id = registry.admit(&request()).unwrap();
        assert!(registry.admit(&request()).is_err());

        registry.transition(id, ScanStatus::Running).unwrap();
        registry.fail(id, "scanner_unavailable").unwrap();
        assert!(registry.admit(&request()).is_ok());
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let registry = ScanRegistry::new(10);
        let id = registry.admit(&request()).unwrap();
        registry.transition(id, ScanStatus::Running).unwrap();
        registry.transition(id, ScanStatus::Cancelled).unwrap();
        assert!(registry.transition(id, ScanStatus::Running).is_err());
        assert!(matches!(registry.cancel(id), Err(AuditError::AlreadyTerminal(_))));
    }

    #[test]
    fn test_progress_is_monotonic() {
        let registry = ScanRegistry::new(10);
        let id = registry.admit(&request()).unwrap();
        registry.set_progress(id, 10, "discovery").unwrap();
        registry.set_progress(id, 10, "still discovery").unwrap();
        registry.set_progress(id, 40, "scanning").unwrap();
        assert!(registry.set_progress(id, 30, "backwards").is_err());
        assert_eq!(registry.get(id).unwrap().progress, 40);
    }

    #[test]
    fn test_unknown_scan() {
        let registry = ScanRegistry::new(10);
        assert!(registry.get(Uuid::new_v4()).is_none());
        assert!(matches!(
            registry.transition(Uuid::new_v4(), ScanStatus::Running),
            Err(AuditError::NotFound(_))
        ));
    }

    #[test]
    fn test_sweep_removes_old_terminal_entries() {
        let registry = ScanRegistry::new(10);
        let done = registry.admit(&request()).unwrap();
        registry.transition(done, ScanStatus::Running).unwrap();
        registry.fail(done, "x").unwrap();
        let live = registry.admit(&request()).unwrap();

        // Zero retention: terminal entries go, active ones stay.
        assert_eq!(registry.sweep(chrono::Duration::zero()), 1);
        assert!(registry.get(done).is_none());
        assert!(registry.get(live).is_some());
    }
}
