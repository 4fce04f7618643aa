//! The adapter seam between the orchestrator and the external scanners

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use audit_core::page::PageRef;
use audit_core::request::{ScanMode, ScanRequest};
use audit_core::scanner::ScannerKind;

use crate::output::RawScanOutput;
use crate::{AxeAdapter, LighthouseAdapter, Pa11yAdapter, WaveAdapter};

/// Per-scan settings handed to every adapter call
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Hard deadline for one scanner run, milliseconds
    pub timeout_ms: u64,
    /// Maximum retries for retryable failures
    pub max_retries: u32,
    /// Execution mode
    pub mode: ScanMode,
    /// WAVE API key, when configured
    pub wave_api_key: Option<String>,
}

impl AdapterConfig {
    /// Build the adapter settings for one scan request
    pub fn for_request(request: &ScanRequest, max_retries: u32, wave_api_key: Option<String>) -> Self {
        Self {
            timeout_ms: request.timeout_ms,
            max_retries,
            mode: request.mode,
            wave_api_key,
        }
    }

    /// The deadline as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            max_retries: 2,
            mode: ScanMode::Real,
            wave_api_key: None,
        }
    }
}

/// One external scanner behind a uniform interface.
///
/// Implementations block on their subprocess or HTTP call but must honor
/// the cancellation token promptly and enforce their own deadline of
/// `cfg.timeout_ms`. They never panic the caller: every outcome is a
/// [`RawScanOutput`].
#[async_trait]
pub trait ScannerAdapter: Send + Sync {
    /// Which scanner this adapter drives
    fn kind(&self) -> ScannerKind;

    /// Run the scanner against one page
    async fn scan(
        &self,
        page: &PageRef,
        cfg: &AdapterConfig,
        cancel: &CancellationToken,
    ) -> RawScanOutput;
}

/// Source of adapters for the orchestrator.
///
/// Production uses [`DefaultAdapterProvider`]; tests inject stubs with
/// controlled latency and failure behavior.
pub trait AdapterProvider: Send + Sync {
    /// The adapter for a scanner kind
    fn adapter(&self, kind: ScannerKind) -> Arc<dyn ScannerAdapter>;
}

/// The production adapter set: WAVE over HTTP, the rest as subprocesses
pub struct DefaultAdapterProvider {
    wave: Arc<dyn ScannerAdapter>,
    pa11y: Arc<dyn ScannerAdapter>,
    axe: Arc<dyn ScannerAdapter>,
    lighthouse: Arc<dyn ScannerAdapter>,
}

impl DefaultAdapterProvider {
    /// Build the four real adapters
    pub fn new() -> Self {
        Self {
            wave: Arc::new(WaveAdapter::new()),
            pa11y: Arc::new(Pa11yAdapter::new()),
            axe: Arc::new(AxeAdapter::new()),
            lighthouse: Arc::new(LighthouseAdapter::new()),
        }
    }
}

impl Default for DefaultAdapterProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterProvider for DefaultAdapterProvider {
    fn adapter(&self, kind: ScannerKind) -> Arc<dyn ScannerAdapter> {
        match kind {
            ScannerKind::Wave => Arc::clone(&self.wave),
            ScannerKind::Pa11y => Arc::clone(&self.pa11y),
            ScannerKind::Axe => Arc::clone(&self.axe),
            ScannerKind::Lighthouse => Arc::clone(&self.lighthouse),
        }
    }
}
