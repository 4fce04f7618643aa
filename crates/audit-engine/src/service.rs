//! The engine's inbound surface
//!
//! [`AuditService`] is what the boundary layer (HTTP handlers, CLI,
//! tests) talks to: start a scan, read its state, cancel it, subscribe
//! to its events. Everything else in this crate hangs off it.

use dashmap::DashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use audit_core::error::{AuditError, Result};
use audit_core::request::ScanRequest;
use audit_core::state::{ScanState, ScanStatus};

use audit_scanners::adapter::{AdapterProvider, DefaultAdapterProvider};

use crate::artifacts::ArtifactWriter;
use crate::config::EngineConfig;
use crate::discover::PageDiscoverer;
use crate::events::{EventBus, Subscription};
use crate::orchestrator::Orchestrator;
use crate::registry::ScanRegistry;

/// Handle returned on admission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanHandle {
    /// The admitted scan's id
    pub scan_id: Uuid,
}

/// The scan engine facade: admission, lifecycle queries, cancellation
/// and event subscriptions
pub struct AuditService {
    config: EngineConfig,
    registry: Arc<ScanRegistry>,
    bus: Arc<EventBus>,
    adapters: Arc<dyn AdapterProvider>,
    discoverer: Arc<PageDiscoverer>,
    cancel_tokens: Arc<DashMap<Uuid, CancellationToken>>,
}

impl AuditService {
    /// Service with the production adapters
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_adapters(config, Arc::new(DefaultAdapterProvider::new()))
    }

    /// Service with an injected adapter set (tests, staged rollouts)
    pub fn with_adapters(config: EngineConfig, adapters: Arc<dyn AdapterProvider>) -> Result<Self> {
        let registry = Arc::new(ScanRegistry::new(config.max_concurrent_scans));
        let bus = Arc::new(EventBus::new(
            config.event_history_limit,
            config.subscriber_queue_bound,
            config.history_retention,
        ));
        let discoverer = Arc::new(PageDiscoverer::new(
            config.discovery_concurrency,
            config.discovery_fetch_timeout,
            config.discovery_phase_timeout,
        )?);
        Ok(Self {
            config,
            registry,
            bus,
            adapters,
            discoverer,
            cancel_tokens: Arc::new(DashMap::new()),
        })
    }

    /// Validate and admit a scan, then run it on its own task.
    ///
    /// Fails fast with no side effects: a rejected request allocates no
    /// scan id and emits no events.
    pub fn start_scan(&self, request: ScanRequest) -> Result<ScanHandle> {
        request.validate(self.config.allow_local_targets)?;
        let scan_id = self.registry.admit(&request)?;

        let cancel = CancellationToken::new();
        self.cancel_tokens.insert(scan_id, cancel.clone());

        if let Some(root) = self.config.output_root.as_deref() {
            // The event log is just another subscriber.
            let writer = ArtifactWriter::new(root, scan_id);
            let subscription = self.bus.subscribe(scan_id, 0);
            tokio::spawn(async move {
                writer.run_event_log(subscription).await;
            });
        }

        let orchestrator = Orchestrator::new(
            self.config.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.bus),
            Arc::clone(&self.adapters),
            Arc::clone(&self.discoverer),
        );
        let tokens = Arc::clone(&self.cancel_tokens);
        tokio::spawn(async move {
            orchestrator.run_scan(scan_id, request, cancel).await;
            tokens.remove(&scan_id);
        });

        Ok(ScanHandle { scan_id })
    }

    /// Snapshot of one scan's state
    pub fn get_scan(&self, scan_id: Uuid) -> Result<ScanState> {
        self.registry.get(scan_id).ok_or(AuditError::NotFound(scan_id))
    }

    /// Snapshot view of scans, optionally filtered by status
    pub fn list_scans(&self, status: Option<ScanStatus>) -> Vec<ScanState> {
        self.registry.list(status)
    }

    /// Request cancellation of a running scan.
    ///
    /// Returns as soon as the flag is set; the scan drains through its
    /// grace period and reaches Cancelled on its own task.
    pub fn cancel_scan(&self, scan_id: Uuid) -> Result<()> {
        let state = self.get_scan(scan_id)?;
        if state.status.is_terminal() {
            return Err(AuditError::AlreadyTerminal(scan_id));
        }
        if let Some(token) = self.cancel_tokens.get(&scan_id) {
            token.cancel();
        }
        tracing::info!(scan_id = %scan_id, "cancellation requested");
        Ok(())
    }

    /// Subscribe to a scan's event stream starting after `since_seq`
    pub fn subscribe(&self, scan_id: Uuid, since_seq: u64) -> Result<Subscription> {
        // Unknown ids get NotFound instead of an empty stream.
        self.get_scan(scan_id)?;
        Ok(self.bus.subscribe(scan_id, since_seq))
    }

    /// Evict expired registry entries and event topics; returns
    /// (scans removed, topics removed)
    pub fn sweep(&self) -> (usize, usize) {
        let retention = chrono::Duration::from_std(self.config.state_retention)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        (self.registry.sweep(retention), self.bus.sweep())
    }

    /// Number of non-terminal scans
    pub fn active_scans(&self) -> usize {
        self.registry.active_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_core::request::{ScanMode, ScannerToggles};

    fn service() -> AuditService {
        let config = EngineConfig {
            allow_local_targets: true,
            ..EngineConfig::default()
        };
        AuditService::new(config).unwrap()
    }

    fn request() -> ScanRequest {
        ScanRequest {
            url: "https://simulate.local/home".into(),
            company_name: "ACME".into(),
            email: "a@b.example".into(),
            scanners: ScannerToggles::all(),
            timeout_ms: 30_000,
            mode: ScanMode::Simulate,
            max_pages: 1,
            max_depth: 1,
        }
    }

    #[tokio::test]
    async fn test_invalid_request_has_no_side_effects() {
        let service = service();
        let mut bad = request();
        bad.url = "ftp://example.com".into();
        assert!(service.start_scan(bad).is_err());
        assert_eq!(service.active_scans(), 0);
        assert!(service.list_scans(None).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_scan_is_not_found() {
        let service = service();
        let id = Uuid::new_v4();
        assert!(matches!(service.get_scan(id), Err(AuditError::NotFound(_))));
        assert!(matches!(service.subscribe(id, 0), Err(AuditError::NotFound(_))));
        assert!(matches!(service.cancel_scan(id), Err(AuditError::NotFound(_))));
    }
}
