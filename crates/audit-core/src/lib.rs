//! Audit Core - Canonical data model for the EAA accessibility audit engine
//!
//! This crate defines the types shared by every stage of the audit
//! pipeline: scan requests and their validation, discovered pages, the
//! canonical [`Violation`] model, per-page and whole-scan results,
//! compliance metrics, lifecycle state, and the error taxonomy.
//!
//! # Examples
//!
//! ## Validating a scan request
//!
//! ```rust
//! use audit_core::request::{ScanMode, ScanRequest, ScannerToggles};
//!
//! let request = ScanRequest {
//!     url: "https://example.com".to_string(),
//!     company_name: "ACME".to_string(),
//!     email: "audit@acme.example".to_string(),
//!     scanners: ScannerToggles::all(),
//!     timeout_ms: 30_000,
//!     mode: ScanMode::Simulate,
//!     max_pages: 5,
//!     max_depth: 2,
//! };
//! assert!(request.validate(false).is_ok());
//! ```
//!
//! ## Working with WCAG criteria
//!
//! ```rust
//! use audit_core::wcag::{criterion_by_id, principle_for_criterion, WcagPrinciple};
//!
//! let contrast = criterion_by_id("1.4.3").unwrap();
//! assert_eq!(contrast.name, "Contrast (Minimum)");
//! assert_eq!(principle_for_criterion("1.4.3"), WcagPrinciple::Perceivable);
//! ```

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod page;
pub mod request;
pub mod result;
pub mod scanner;
pub mod severity;
pub mod state;
pub mod violation;
pub mod wcag;

pub use error::{AuditError, Result, ValidationError, ValidationErrorDetail};
pub use page::{normalize_url, PagePriority, PageRef, PageType};
pub use request::{ScanMode, ScanRequest, ScannerToggles};
pub use result::{
    AggregatedViolation, ComplianceLevel, ComplianceMetrics, PageOccurrence, PageResult,
    Recommendation, RecommendationPriority, ScanResult, ScannerRunTally, ScannerStatus,
};
pub use scanner::{LatencyClass, ScannerDescriptor, ScannerKind};
pub use severity::Severity;
pub use state::{ScanState, ScanStatus};
pub use violation::Violation;
pub use wcag::{WcagCriterion, WcagLevel, WcagPrinciple};

/// Prelude module for convenient imports
pub mod prelude {
    //! Commonly used items for quick access

    pub use crate::error::{AuditError, Result};
    pub use crate::page::PageRef;
    pub use crate::request::{ScanMode, ScanRequest, ScannerToggles};
    pub use crate::result::{ComplianceLevel, ComplianceMetrics, PageResult, ScanResult};
    pub use crate::scanner::ScannerKind;
    pub use crate::severity::Severity;
    pub use crate::state::{ScanState, ScanStatus};
    pub use crate::violation::Violation;
    pub use crate::wcag::{WcagLevel, WcagPrinciple};
}
