//! The scan pipeline: discovery, scanner fan-out, aggregation,
//! finalization
//!
//! One orchestrator instance drives one scan end to end on its own task.
//! Failure isolation is per (page, scanner) cell: an adapter that fails,
//! times out or panics is recorded and the scan carries on. Only an
//! unreachable seed, zero successful runs, or cancellation terminate a
//! scan early.

use chrono::Utc;
use futures::StreamExt;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use audit_core::error::AuditError;
use audit_core::page::PageRef;
use audit_core::request::ScanRequest;
use audit_core::result::{PageResult, ScannerStatus};
use audit_core::scanner::ScannerKind;
use audit_core::state::ScanStatus;
use audit_core::violation::Violation;

use audit_pipeline::{aggregate, dedupe_page, normalize};
use audit_scanners::adapter::{AdapterConfig, AdapterProvider};
use audit_scanners::output::{FailureKind, RawScanOutput, ScanFailure};

use crate::artifacts::ArtifactWriter;
use crate::config::EngineConfig;
use crate::discover::{DiscoveryBounds, PageDiscoverer};
use crate::events::{EventBus, ScanEventKind};
use crate::registry::ScanRegistry;

// Progress bands: discovery 0-10, scanning 10-90, aggregation 90-99,
// terminal 100.
const PROGRESS_DISCOVERY_DONE: u8 = 10;
const PROGRESS_SCAN_SPAN: usize = 80;
const PROGRESS_AGGREGATING: u8 = 92;
const PROGRESS_FINALIZING: u8 = 99;

struct CellResult {
    kind: ScannerKind,
    elapsed_ms: u64,
    outcome: CellOutcome,
}

enum CellOutcome {
    Ok(Vec<Violation>),
    Failed(ScanFailure),
}

/// Drives one scan through the full pipeline
pub struct Orchestrator {
    config: EngineConfig,
    registry: Arc<ScanRegistry>,
    bus: Arc<EventBus>,
    adapters: Arc<dyn AdapterProvider>,
    discoverer: Arc<PageDiscoverer>,
}

impl Orchestrator {
    /// Wire an orchestrator over the shared engine components
    pub fn new(
        config: EngineConfig,
        registry: Arc<ScanRegistry>,
        bus: Arc<EventBus>,
        adapters: Arc<dyn AdapterProvider>,
        discoverer: Arc<PageDiscoverer>,
    ) -> Self {
        Self {
            config,
            registry,
            bus,
            adapters,
            discoverer,
        }
    }

    /// Run an admitted scan to a terminal state, publishing events
    /// throughout. Never panics the caller; every exit path leaves the
    /// registry in a terminal state and closes the event topic.
    pub async fn run_scan(&self, scan_id: Uuid, request: ScanRequest, cancel: CancellationToken) {
        let started_at = Utc::now();

        if let Err(e) = self.registry.transition(scan_id, ScanStatus::Running) {
            tracing::error!(scan_id = %scan_id, error = %e, "could not start admitted scan");
            return;
        }
        self.bus.publish(
            scan_id,
            ScanEventKind::ScanStarted {
                url: request.url.clone(),
            },
        );
        let _ = self.registry.set_progress(scan_id, 2, "discovering pages");

        let artifacts = self
            .config
            .output_root
            .as_deref()
            .map(|root| ArtifactWriter::new(root, scan_id));

        let seed = match Url::parse(&request.url) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(scan_id = %scan_id, error = %e, "admitted scan carried an unparseable URL");
                self.finish_failed(scan_id, "internal_error");
                return;
            }
        };

        let bounds = DiscoveryBounds {
            max_pages: request.max_pages,
            max_depth: request.max_depth,
        };
        let pages = match self
            .discoverer
            .discover(&seed, bounds, request.mode, &cancel)
            .await
        {
            Ok(pages) => pages,
            Err(e) => {
                tracing::warn!(scan_id = %scan_id, error = %e, "discovery failed");
                self.finish_failed(scan_id, e.client_reason());
                return;
            }
        };
        let _ = self.registry.set_progress(
            scan_id,
            PROGRESS_DISCOVERY_DONE,
            &format!("{} pages selected", pages.len()),
        );

        let enabled = request.scanners.enabled_kinds();
        let adapter_cfg = AdapterConfig::for_request(
            &request,
            self.config.max_retries,
            self.config.wave_api_key.clone(),
        );

        let total_pages = pages.len();
        let total_cells = total_pages * enabled.len();
        let completed_cells = Arc::new(AtomicUsize::new(0));

        let page_futures = pages.into_iter().enumerate().map(|(index, page)| {
            self.run_page(
                scan_id,
                page,
                index,
                total_pages,
                &enabled,
                &adapter_cfg,
                Arc::clone(&completed_cells),
                total_cells,
                artifacts.clone(),
                cancel.clone(),
            )
        });
        let page_results: Vec<PageResult> = futures::stream::iter(page_futures)
            .buffered(self.config.page_concurrency.max(1))
            .collect::<Vec<Option<PageResult>>>()
            .await
            .into_iter()
            .flatten()
            .collect();

        self.bus.publish(scan_id, ScanEventKind::AggregationStarted);
        let _ = self
            .registry
            .set_progress(scan_id, PROGRESS_AGGREGATING, "aggregating results");

        let finished_at = Utc::now();
        let result = aggregate(scan_id, &request, page_results, started_at, finished_at);
        if let Some(writer) = &artifacts {
            writer.write_summary(&result).await;
        }

        if cancel.is_cancelled() {
            let _ = self.registry.cancel(scan_id);
            self.bus.publish(
                scan_id,
                ScanEventKind::ScanCancelled {
                    partial: result.pages.clone(),
                },
            );
            tracing::info!(scan_id = %scan_id, pages = result.pages.len(), "scan cancelled");
            self.bus.close(scan_id);
            return;
        }

        let ok_runs: u32 = result.scanner_runs.values().map(|t| t.ok).sum();
        if ok_runs == 0 {
            let reason = AuditError::AllScannersFailed.client_reason();
            tracing::warn!(scan_id = %scan_id, "no scanner run succeeded");
            self.finish_failed(scan_id, reason);
            return;
        }

        let _ = self
            .registry
            .set_progress(scan_id, PROGRESS_FINALIZING, "finalizing");
        let metrics = result.metrics.clone();
        match self.registry.complete(scan_id, result) {
            Ok(()) => {
                self.bus
                    .publish(scan_id, ScanEventKind::ScanCompleted { metrics });
                tracing::info!(scan_id = %scan_id, "scan completed");
            }
            Err(e) => {
                tracing::error!(scan_id = %scan_id, error = %e, "failed to finalize scan");
                self.finish_failed(scan_id, "internal_error");
                return;
            }
        }
        self.bus.close(scan_id);
    }

    fn finish_failed(&self, scan_id: Uuid, reason: &str) {
        let _ = self.registry.fail(scan_id, reason);
        self.bus.publish(
            scan_id,
            ScanEventKind::ScanFailed {
                reason: reason.to_string(),
            },
        );
        self.bus.close(scan_id);
    }

    /// Scan one page with every enabled scanner in parallel.
    ///
    /// Returns `None` when cancellation arrived before the page was
    /// started, so cancelled scans never grow their partial results.
    #[allow(clippy::too_many_arguments)]
    async fn run_page(
        &self,
        scan_id: Uuid,
        page: PageRef,
        index: usize,
        total_pages: usize,
        enabled: &[ScannerKind],
        adapter_cfg: &AdapterConfig,
        completed_cells: Arc<AtomicUsize>,
        total_cells: usize,
        artifacts: Option<ArtifactWriter>,
        cancel: CancellationToken,
    ) -> Option<PageResult> {
        if cancel.is_cancelled() {
            return None;
        }

        self.bus.publish(
            scan_id,
            ScanEventKind::PageStarted {
                url: page.url.clone(),
                index: index + 1,
                total: total_pages,
            },
        );

        let semaphore = Arc::new(Semaphore::new(
            self.config.scanner_concurrency_for(enabled.len()),
        ));
        let mut join: JoinSet<CellResult> = JoinSet::new();
        let mut statuses: BTreeMap<ScannerKind, ScannerStatus> = BTreeMap::new();
        let mut elapsed_ms: BTreeMap<ScannerKind, u64> = BTreeMap::new();
        let mut spawned: Vec<ScannerKind> = Vec::new();

        for kind in enabled.iter().copied() {
            // The cancellation flag is read before every dispatch.
            if cancel.is_cancelled() {
                statuses.insert(kind, ScannerStatus::Skipped);
                continue;
            }

            self.bus.publish(
                scan_id,
                ScanEventKind::ScannerStarted {
                    page: page.url.clone(),
                    scanner: kind,
                },
            );
            spawned.push(kind);

            let adapter = self.adapters.adapter(kind);
            let bus = Arc::clone(&self.bus);
            let semaphore = Arc::clone(&semaphore);
            let page = page.clone();
            let cfg = adapter_cfg.clone();
            let child_cancel = cancel.child_token();
            let artifacts = artifacts.clone();
            join.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let start = Instant::now();
                let raw = adapter.scan(&page, &cfg, &child_cancel).await;
                let elapsed = start.elapsed().as_millis() as u64;

                match raw {
                    RawScanOutput::Success { payload } => {
                        bus.publish(
                            scan_id,
                            ScanEventKind::ScannerProgress {
                                page: page.url.clone(),
                                scanner: kind,
                                percent: 50,
                            },
                        );
                        if let Some(writer) = &artifacts {
                            writer.write_raw(index, kind, &payload).await;
                        }
                        // Normalization happens on the worker that
                        // produced the output; it never blocks the next
                        // scanner.
                        let violations =
                            normalize(kind, &RawScanOutput::Success { payload }, &page);
                        CellResult {
                            kind,
                            elapsed_ms: elapsed,
                            outcome: CellOutcome::Ok(violations),
                        }
                    }
                    RawScanOutput::Failure { failure } => CellResult {
                        kind,
                        elapsed_ms: elapsed,
                        outcome: CellOutcome::Failed(failure),
                    },
                }
            });
        }

        let mut per_kind: BTreeMap<ScannerKind, Vec<Violation>> = BTreeMap::new();
        let mut grace_deadline: Option<Instant> = None;

        loop {
            if cancel.is_cancelled() && grace_deadline.is_none() {
                grace_deadline = Some(Instant::now() + self.config.cancel_grace);
            }

            let joined = match grace_deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match tokio::time::timeout(remaining, join.join_next()).await {
                        Ok(joined) => joined,
                        Err(_) => {
                            // Grace spent: abandon whatever is still
                            // running. Adapter children die with their
                            // tasks (kill_on_drop).
                            tracing::warn!(scan_id = %scan_id, "abandoning in-flight scanners after cancel grace");
                            join.abort_all();
                            while join.join_next().await.is_some() {}
                            break;
                        }
                    }
                }
                None => tokio::select! {
                    joined = join.join_next() => joined,
                    _ = cancel.cancelled() => continue,
                },
            };

            let Some(joined) = joined else {
                break;
            };

            match joined {
                Ok(cell) => {
                    elapsed_ms.insert(cell.kind, cell.elapsed_ms);
                    match cell.outcome {
                        CellOutcome::Ok(violations) => {
                            statuses.insert(cell.kind, ScannerStatus::Ok);
                            self.bus.publish(
                                scan_id,
                                ScanEventKind::ScannerCompleted {
                                    page: page.url.clone(),
                                    scanner: cell.kind,
                                    violations: violations.len(),
                                    elapsed_ms: cell.elapsed_ms,
                                },
                            );
                            per_kind.insert(cell.kind, violations);
                        }
                        CellOutcome::Failed(failure) => {
                            let status = if failure.kind == FailureKind::Timeout {
                                ScannerStatus::Timeout
                            } else {
                                ScannerStatus::Failed
                            };
                            statuses.insert(cell.kind, status);
                            tracing::warn!(
                                scan_id = %scan_id,
                                scanner = cell.kind.as_str(),
                                page = %page.url,
                                error = %failure,
                                "scanner run failed"
                            );
                            self.bus.publish(
                                scan_id,
                                ScanEventKind::ScannerFailed {
                                    page: page.url.clone(),
                                    scanner: cell.kind,
                                    reason: failure.client_reason().to_string(),
                                    critical: failure.kind == FailureKind::Configuration,
                                },
                            );
                        }
                    }

                    let done = completed_cells.fetch_add(1, Ordering::SeqCst) + 1;
                    let percent = PROGRESS_DISCOVERY_DONE
                        + ((PROGRESS_SCAN_SPAN * done) / total_cells.max(1)) as u8;
                    let _ = self.registry.set_progress(scan_id, percent.min(90), "scanning");
                }
                Err(join_error) => {
                    // A panicked or aborted worker; the owning kind gets
                    // its terminal event in the sweep below.
                    tracing::error!(scan_id = %scan_id, error = %join_error, "scanner worker died");
                }
            }
        }

        // Every started cell must end with exactly one terminal event.
        for kind in spawned {
            if !statuses.contains_key(&kind) {
                statuses.insert(kind, ScannerStatus::Failed);
                let reason = if cancel.is_cancelled() {
                    "cancelled"
                } else {
                    "internal_error"
                };
                self.bus.publish(
                    scan_id,
                    ScanEventKind::ScannerFailed {
                        page: page.url.clone(),
                        scanner: kind,
                        reason: reason.to_string(),
                        critical: false,
                    },
                );
            }
        }

        // Deterministic violation order regardless of completion order.
        let mut combined = Vec::new();
        for kind in enabled {
            if let Some(violations) = per_kind.remove(kind) {
                combined.extend(violations);
            }
        }

        Some(PageResult {
            page,
            statuses,
            violations: dedupe_page(combined),
            elapsed_ms,
        })
    }
}
