//! The canonical accessibility finding

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::scanner::ScannerKind;
use crate::severity::Severity;
use crate::wcag::WcagLevel;

/// One normalized accessibility finding on a page.
///
/// Scanners report the same underlying defect in different vocabularies;
/// this is the single shape everything downstream of normalization
/// operates on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Stable code from the producing scanner (e.g. "alt_missing")
    pub code: String,
    /// Human-readable description
    pub message: String,
    /// Severity classification
    pub severity: Severity,
    /// WCAG success criterion (e.g. "1.4.3"), when the scanner maps to one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wcag_criterion: Option<String>,
    /// Conformance level of the criterion, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wcag_level: Option<WcagLevel>,
    /// CSS-like selector locating the offending element
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Source snippet of the offending element
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Remediation hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    /// Scanners that reported this finding
    pub scanners: BTreeSet<ScannerKind>,
    /// Occurrence count, at least 1
    pub count: u32,
    /// Normalized URL of the page the finding was observed on
    pub page_url: String,
}

impl Violation {
    /// Build a violation reported by a single scanner with count 1
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        scanner: ScannerKind,
        page_url: impl Into<String>,
    ) -> Self {
        let mut scanners = BTreeSet::new();
        scanners.insert(scanner);
        Self {
            code: code.into(),
            message: message.into(),
            severity,
            wcag_criterion: None,
            wcag_level: None,
            selector: None,
            snippet: None,
            remediation: None,
            scanners,
            count: 1,
            page_url: page_url.into(),
        }
    }

    /// Set the WCAG criterion and derive its conformance level
    pub fn with_criterion(mut self, criterion: impl Into<String>) -> Self {
        let criterion = criterion.into();
        if !criterion.is_empty() {
            self.wcag_level = crate::wcag::level_for_criterion(&criterion);
            self.wcag_criterion = Some(criterion);
        }
        self
    }

    /// Set the occurrence count
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count.max(1);
        self
    }

    /// Set the selector
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        let selector = selector.into();
        if !selector.is_empty() {
            self.selector = Some(selector);
        }
        self
    }

    /// Set the source snippet
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        let snippet = snippet.into();
        if !snippet.is_empty() {
            self.snippet = Some(snippet);
        }
        self
    }

    /// Set the remediation hint
    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        let remediation = remediation.into();
        if !remediation.is_empty() {
            self.remediation = Some(remediation);
        }
        self
    }

    /// Deduplication key within a page: `(code, criterion, selector)`,
    /// with empty strings for missing optionals
    pub fn page_dedup_key(&self) -> (String, String, String) {
        (
            self.code.clone(),
            self.wcag_criterion.clone().unwrap_or_default(),
            self.selector.clone().unwrap_or_default(),
        )
    }

    /// Grouping key for the cross-page merge: `(code, criterion)`
    pub fn merge_key(&self) -> (String, String) {
        (
            self.code.clone(),
            self.wcag_criterion.clone().unwrap_or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_level_from_criterion() {
        let v = Violation::new(
            "contrast",
            "Insufficient color contrast",
            Severity::High,
            ScannerKind::Wave,
            "https://example.com/",
        )
        .with_criterion("1.4.3")
        .with_count(3);

        assert_eq!(v.wcag_criterion.as_deref(), Some("1.4.3"));
        assert_eq!(v.wcag_level, Some(WcagLevel::AA));
        assert_eq!(v.count, 3);
    }

    #[test]
    fn test_empty_criterion_stays_none() {
        let v = Violation::new("x", "y", Severity::Low, ScannerKind::Axe, "https://e/")
            .with_criterion("");
        assert!(v.wcag_criterion.is_none());
        assert_eq!(v.page_dedup_key(), ("x".into(), String::new(), String::new()));
    }

    #[test]
    fn test_count_floor() {
        let v = Violation::new("x", "y", Severity::Low, ScannerKind::Axe, "https://e/")
            .with_count(0);
        assert_eq!(v.count, 1);
    }

    #[test]
    fn test_dedup_key_includes_selector() {
        let a = Violation::new("c", "m", Severity::High, ScannerKind::Pa11y, "https://e/")
            .with_criterion("1.3.1")
            .with_selector("#login");
        let b = Violation::new("c", "m", Severity::High, ScannerKind::Pa11y, "https://e/")
            .with_criterion("1.3.1")
            .with_selector("#signup");
        assert_ne!(a.page_dedup_key(), b.page_dedup_key());
        assert_eq!(a.merge_key(), b.merge_key());
    }
}
