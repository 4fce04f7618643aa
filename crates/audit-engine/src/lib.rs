//! Audit Engine - scan orchestration for EAA accessibility audits
//!
//! The engine turns one [`ScanRequest`](audit_core::request::ScanRequest)
//! into a scored [`ScanResult`](audit_core::result::ScanResult):
//! admission through the [`registry`], page [`discover`]y, parallel
//! scanner fan-out in the [`orchestrator`], and real-time progress over
//! the per-scan [`events`] bus. The boundary layer talks to
//! [`AuditService`] and consumes [`Subscription`] streams; WebSocket,
//! SSE and test harnesses are all just subscribers.
//!
//! # Example
//!
//! ```rust,no_run
//! use audit_core::request::{ScanMode, ScanRequest, ScannerToggles};
//! use audit_engine::{AuditService, EngineConfig};
//!
//! # async fn demo() -> audit_core::error::Result<()> {
//! let service = AuditService::new(EngineConfig::default())?;
//! let handle = service.start_scan(ScanRequest {
//!     url: "https://example.com".into(),
//!     company_name: "ACME".into(),
//!     email: "audit@acme.example".into(),
//!     scanners: ScannerToggles::all(),
//!     timeout_ms: 60_000,
//!     mode: ScanMode::Real,
//!     max_pages: 5,
//!     max_depth: 2,
//! })?;
//!
//! let mut events = service.subscribe(handle.scan_id, 0)?;
//! while let Some(event) = events.recv().await {
//!     println!("{} {}", event.seq, event.kind.event_type());
//!     if event.kind.is_terminal() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod artifacts;
pub mod config;
pub mod discover;
pub mod events;
pub mod orchestrator;
pub mod registry;
pub mod service;

pub use artifacts::ArtifactWriter;
pub use config::EngineConfig;
pub use discover::{DiscoveryBounds, PageDiscoverer};
pub use events::{EventBus, ScanEvent, ScanEventKind, Subscription};
pub use orchestrator::Orchestrator;
pub use registry::ScanRegistry;
pub use service::{AuditService, ScanHandle};

/// Initialize tracing with the standard env-filter setup
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "audit_engine=info,audit_scanners=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
