//! Per-page and whole-scan result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::page::PageRef;
use crate::request::ScanRequest;
use crate::scanner::ScannerKind;
use crate::severity::Severity;
use crate::violation::Violation;
use crate::wcag::WcagPrinciple;

/// Outcome of one scanner run on one page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerStatus {
    /// Produced usable output
    Ok,
    /// Returned a failure
    Failed,
    /// Exceeded its deadline
    Timeout,
    /// Never dispatched (disabled, or the scan was cancelled first)
    Skipped,
}

impl ScannerStatus {
    /// Whether this run was attempted (anything but Skipped)
    pub fn attempted(&self) -> bool {
        !matches!(self, ScannerStatus::Skipped)
    }
}

/// Results of all scanner runs against one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// The scanned page
    pub page: PageRef,
    /// Outcome per scanner
    pub statuses: BTreeMap<ScannerKind, ScannerStatus>,
    /// Deduplicated violations for this page
    pub violations: Vec<Violation>,
    /// Elapsed wall-clock per scanner, milliseconds
    pub elapsed_ms: BTreeMap<ScannerKind, u64>,
}

impl PageResult {
    /// A page result with no runs recorded yet
    pub fn empty(page: PageRef) -> Self {
        Self {
            page,
            statuses: BTreeMap::new(),
            violations: Vec::new(),
            elapsed_ms: BTreeMap::new(),
        }
    }

    /// Number of scanner runs that produced usable output
    pub fn ok_count(&self) -> usize {
        self.statuses
            .values()
            .filter(|s| matches!(s, ScannerStatus::Ok))
            .count()
    }

    /// Number of scanner runs that were attempted
    pub fn attempted_count(&self) -> usize {
        self.statuses.values().filter(|s| s.attempted()).count()
    }
}

/// Occurrence of an aggregated violation on one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageOccurrence {
    /// Normalized page URL
    pub url: String,
    /// Occurrence count on that page
    pub count: u32,
}

/// Cross-page view of one violation group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedViolation {
    /// Stable code of the finding
    pub code: String,
    /// WCAG criterion, empty when the scanner could not map one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wcag_criterion: Option<String>,
    /// Severity of the first observed occurrence
    pub severity: Severity,
    /// Description from the first observed occurrence
    pub message: String,
    /// Remediation hint, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    /// All scanners that reported this group
    pub scanners: BTreeSet<ScannerKind>,
    /// Total occurrence count across pages
    pub total_count: u32,
    /// Per-page breakdown, in page order
    pub pages: Vec<PageOccurrence>,
}

/// EAA conformance vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceLevel {
    Conforme,
    ParzialmenteConforme,
    NonConforme,
}

impl ComplianceLevel {
    /// English label used in EAA statements
    pub fn eaa_label(&self) -> &'static str {
        match self {
            ComplianceLevel::Conforme => "compliant",
            ComplianceLevel::ParzialmenteConforme => "partially_compliant",
            ComplianceLevel::NonConforme => "non_compliant",
        }
    }
}

impl std::fmt::Display for ComplianceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplianceLevel::Conforme => write!(f, "conforme"),
            ComplianceLevel::ParzialmenteConforme => write!(f, "parzialmente_conforme"),
            ComplianceLevel::NonConforme => write!(f, "non_conforme"),
        }
    }
}

/// Computed compliance metrics for a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceMetrics {
    /// Overall score, 0-100
    pub overall_score: u32,
    /// EAA compliance level
    pub compliance_level: ComplianceLevel,
    /// Number of deduplicated violation groups
    pub total_violations: usize,
    /// Occurrence totals per severity
    pub by_severity: BTreeMap<Severity, u32>,
    /// Occurrence totals per WCAG principle
    pub by_principle: BTreeMap<WcagPrinciple, u32>,
    /// Fraction of attempted scanner runs that succeeded, 0.0-1.0
    pub confidence: f64,
}

/// Tally of scanner runs across the whole scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerRunTally {
    /// Runs that produced usable output
    pub ok: u32,
    /// Runs that were attempted (ok + failed + timeout)
    pub attempted: u32,
}

/// Prioritized remediation recommendation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Priority bucket; lower sorts first
    pub priority: RecommendationPriority,
    /// Short title
    pub title: String,
    /// What the problem is and why it matters
    pub description: String,
    /// Concrete remediation steps
    pub actions: Vec<String>,
}

/// Priority of a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationPriority {
    High,
    Medium,
    Low,
}

/// The canonical output of a completed scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Scan identifier
    pub scan_id: Uuid,
    /// Snapshot of the originating request
    pub request: ScanRequest,
    /// Per-page results in scan order
    pub pages: Vec<PageResult>,
    /// Cross-page deduplicated violations, sorted by severity then count
    pub violations: Vec<AggregatedViolation>,
    /// Compliance metrics
    pub metrics: ComplianceMetrics,
    /// Prioritized remediation plan
    pub recommendations: Vec<Recommendation>,
    /// Scanner run tally per kind
    pub scanner_runs: BTreeMap<ScannerKind, ScannerRunTally>,
    /// When the scan started
    pub started_at: DateTime<Utc>,
    /// When the scan finished
    pub finished_at: DateTime<Utc>,
}
