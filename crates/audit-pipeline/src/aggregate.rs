//! Deduplication, cross-page aggregation and compliance scoring
//!
//! This module owns the one authoritative scoring formula. Given
//! identical per-page inputs it produces byte-identical output: grouping
//! preserves first-occurrence insertion order, every map in the result is
//! ordered, and nothing here reads the clock.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use audit_core::request::ScanRequest;
use audit_core::result::{
    AggregatedViolation, ComplianceLevel, ComplianceMetrics, PageOccurrence, PageResult,
    ScanResult, ScannerRunTally,
};
use audit_core::scanner::ScannerKind;
use audit_core::severity::Severity;
use audit_core::violation::Violation;
use audit_core::wcag::principle_for_criterion;

use crate::remediation;

/// Penalty weight per severity
pub fn severity_weight(severity: Severity) -> u32 {
    match severity {
        Severity::Critical => 20,
        Severity::High => 15,
        Severity::Medium => 8,
        Severity::Low => 3,
    }
}

/// Occurrence cap per severity: one prolific code must not dominate the
/// score on its own
pub fn severity_cap(severity: Severity) -> u32 {
    match severity {
        Severity::Critical | Severity::High | Severity::Medium => 5,
        Severity::Low => 3,
    }
}

/// Deduplicate one page's violations by `(code, criterion, selector)`.
///
/// Counts are summed and scanner sets unioned; the first occurrence
/// keeps its position, severity and message. Applying this to an
/// already-deduplicated list is a no-op.
pub fn dedupe_page(violations: Vec<Violation>) -> Vec<Violation> {
    let mut index: HashMap<(String, String, String), usize> = HashMap::new();
    let mut result: Vec<Violation> = Vec::with_capacity(violations.len());

    for violation in violations {
        let key = violation.page_dedup_key();
        match index.get(&key) {
            Some(&i) => {
                let existing = &mut result[i];
                existing.count += violation.count;
                existing.scanners.extend(violation.scanners.iter().copied());
            }
            None => {
                index.insert(key, result.len());
                result.push(violation);
            }
        }
    }

    result
}

/// Merge per-page violations into the cross-page list, grouped by
/// `(code, criterion)` with a per-page breakdown
fn merge_pages(pages: &[PageResult]) -> Vec<AggregatedViolation> {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut groups: Vec<AggregatedViolation> = Vec::new();

    for page in pages {
        for violation in &page.violations {
            let key = violation.merge_key();
            match index.get(&key) {
                Some(&i) => {
                    let group = &mut groups[i];
                    group.total_count += violation.count;
                    group.scanners.extend(violation.scanners.iter().copied());
                    match group.pages.iter_mut().find(|p| p.url == violation.page_url) {
                        Some(occurrence) => occurrence.count += violation.count,
                        None => group.pages.push(PageOccurrence {
                            url: violation.page_url.clone(),
                            count: violation.count,
                        }),
                    }
                }
                None => {
                    index.insert(key, groups.len());
                    groups.push(AggregatedViolation {
                        code: violation.code.clone(),
                        wcag_criterion: violation.wcag_criterion.clone(),
                        severity: violation.severity,
                        message: violation.message.clone(),
                        remediation: violation.remediation.clone(),
                        scanners: violation.scanners.clone(),
                        total_count: violation.count,
                        pages: vec![PageOccurrence {
                            url: violation.page_url.clone(),
                            count: violation.count,
                        }],
                    });
                }
            }
        }
    }

    // Most severe first, then most frequent; stable so equal entries keep
    // insertion order.
    groups.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(b.total_count.cmp(&a.total_count))
    });
    groups
}

/// Score from the aggregated violation list: `clamp(100 - penalty)`
/// where each group contributes `weight(severity) * min(count, cap)`
pub fn compute_score(groups: &[AggregatedViolation]) -> u32 {
    let penalty: u32 = groups
        .iter()
        .map(|g| severity_weight(g.severity) * g.total_count.min(severity_cap(g.severity)))
        .sum();
    100u32.saturating_sub(penalty)
}

/// Compliance level from score and critical presence
pub fn compliance_level(score: u32, has_critical: bool) -> ComplianceLevel {
    if has_critical {
        ComplianceLevel::NonConforme
    } else if score >= 85 {
        ComplianceLevel::Conforme
    } else if score >= 60 {
        ComplianceLevel::ParzialmenteConforme
    } else {
        ComplianceLevel::NonConforme
    }
}

/// Build the canonical scan result from the collected page results
pub fn aggregate(
    scan_id: Uuid,
    request: &ScanRequest,
    pages: Vec<PageResult>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
) -> ScanResult {
    let groups = merge_pages(&pages);

    let mut by_severity: BTreeMap<Severity, u32> = BTreeMap::new();
    let mut by_principle = BTreeMap::new();
    for group in &groups {
        *by_severity.entry(group.severity).or_insert(0) += group.total_count;
        let principle = principle_for_criterion(group.wcag_criterion.as_deref().unwrap_or(""));
        *by_principle.entry(principle).or_insert(0) += group.total_count;
    }

    let mut scanner_runs: BTreeMap<ScannerKind, ScannerRunTally> = BTreeMap::new();
    for page in &pages {
        for (kind, status) in &page.statuses {
            let tally = scanner_runs.entry(*kind).or_default();
            if status.attempted() {
                tally.attempted += 1;
                if matches!(status, audit_core::result::ScannerStatus::Ok) {
                    tally.ok += 1;
                }
            }
        }
    }
    let attempted: u32 = scanner_runs.values().map(|t| t.attempted).sum();
    let ok: u32 = scanner_runs.values().map(|t| t.ok).sum();
    let confidence = if attempted == 0 {
        0.0
    } else {
        f64::from(ok) / f64::from(attempted)
    };

    let score = compute_score(&groups);
    let has_critical = groups.iter().any(|g| g.severity == Severity::Critical);

    let metrics = ComplianceMetrics {
        overall_score: score,
        compliance_level: compliance_level(score, has_critical),
        total_violations: groups.len(),
        by_severity,
        by_principle,
        confidence,
    };

    let recommendations = remediation::generate(&groups);

    ScanResult {
        scan_id,
        request: request.clone(),
        pages,
        violations: groups,
        metrics,
        recommendations,
        scanner_runs,
        started_at,
        finished_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_core::page::PageRef;
    use audit_core::request::{ScanMode, ScannerToggles};
    use audit_core::result::ScannerStatus;
    use audit_core::wcag::WcagPrinciple;

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

    fn violation(code: &str, criterion: &str, severity: Severity, count: u32) -> Violation {
        Violation::new(code, "message", severity, ScannerKind::Axe, "https://example.com/")
            .with_criterion(criterion)
            .with_count(count)
    }

    fn page_with(violations: Vec<Violation>) -> PageResult {
        let mut page = PageResult::empty(PageRef::seed("https://example.com/"));
        page.statuses.insert(ScannerKind::Axe, ScannerStatus::Ok);
        page.elapsed_ms.insert(ScannerKind::Axe, 100);
        page.violations = dedupe_page(violations);
        page
    }

    #[test]
    fn test_dedup_sums_counts_and_unions_scanners() {
        let mut from_wave =
            Violation::new("contrast", "m", Severity::High, ScannerKind::Wave, "https://e/")
                .with_criterion("1.4.3");
        from_wave.count = 2;
        let from_axe =
            Violation::new("contrast", "m2", Severity::Low, ScannerKind::Axe, "https://e/")
                .with_criterion("1.4.3");

        let deduped = dedupe_page(vec![from_wave, from_axe]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].count, 3);
        assert_eq!(deduped[0].scanners.len(), 2);
        // First occurrence wins severity and message.
        assert_eq!(deduped[0].severity, Severity::High);
        assert_eq!(deduped[0].message, "m");
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let violations = vec![
            violation("a", "1.1.1", Severity::Critical, 2),
            violation("a", "1.1.1", Severity::Critical, 1),
            violation("b", "1.4.3", Severity::High, 1),
        ];
        let once = dedupe_page(violations);
        let twice = dedupe_page(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_selector_kept_apart_per_page_but_merged_across() {
        let a = violation("c", "1.3.1", Severity::High, 1).with_selector("#x");
        let b = violation("c", "1.3.1", Severity::Low, 1).with_selector("#y");
        let page = page_with(vec![a, b]);
        assert_eq!(page.violations.len(), 2);

        let result = aggregate(Uuid::nil(), &request(), vec![page], epoch(), epoch());
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].total_count, 2);
        assert_eq!(result.violations[0].pages.len(), 1);
        assert_eq!(result.violations[0].pages[0].count, 2);
    }

    fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_sort_by_severity_then_count() {
        let page = page_with(vec![
            violation("low", "4.1.2", Severity::Low, 9),
            violation("high-few", "1.4.3", Severity::High, 1),
            violation("high-many", "1.3.1", Severity::High, 4),
            violation("crit", "1.1.1", Severity::Critical, 1),
        ]);
        let result = aggregate(Uuid::nil(), &request(), vec![page], epoch(), epoch());
        let codes: Vec<_> = result.violations.iter().map(|v| v.code.as_str()).collect();
        assert_eq!(codes, vec!["crit", "high-many", "high-few", "low"]);
    }

    #[test]
    fn test_pour_categorization_defaults_to_robust() {
        let page = page_with(vec![
            violation("p", "1.1.1", Severity::High, 1),
            violation("o", "2.4.4", Severity::High, 1),
            Violation::new("untagged", "m", Severity::Low, ScannerKind::Axe, "https://example.com/"),
        ]);
        let result = aggregate(Uuid::nil(), &request(), vec![page], epoch(), epoch());
        assert_eq!(result.metrics.by_principle[&WcagPrinciple::Perceivable], 1);
        assert_eq!(result.metrics.by_principle[&WcagPrinciple::Operable], 1);
        assert_eq!(result.metrics.by_principle[&WcagPrinciple::Robust], 1);
    }

    #[test]
    fn test_score_caps_prolific_codes() {
        // 1 critical with count 100 capped at 5, plus 3 singleton highs:
        // 20*5 + 15*3 = 145, clamped to 0.
        let page = page_with(vec![
            violation("crit", "1.1.1", Severity::Critical, 100),
            violation("h1", "1.4.3", Severity::High, 1),
            violation("h2", "1.3.1", Severity::High, 1),
            violation("h3", "2.4.4", Severity::High, 1),
        ]);
        let result = aggregate(Uuid::nil(), &request(), vec![page], epoch(), epoch());
        assert_eq!(result.metrics.overall_score, 0);
        assert_eq!(result.metrics.compliance_level, ComplianceLevel::NonConforme);
    }

    #[test]
    fn test_score_bounds() {
        let empty = aggregate(Uuid::nil(), &request(), vec![page_with(vec![])], epoch(), epoch());
        assert_eq!(empty.metrics.overall_score, 100);

        let light = aggregate(
            Uuid::nil(),
            &request(),
            vec![page_with(vec![violation("m", "1.4.4", Severity::Medium, 1)])],
            epoch(),
            epoch(),
        );
        assert_eq!(light.metrics.overall_score, 92);
        assert_eq!(light.metrics.compliance_level, ComplianceLevel::Conforme);
    }

    #[test]
    fn test_critical_forces_non_conforme() {
        let page = page_with(vec![violation("crit", "1.1.1", Severity::Critical, 1)]);
        let result = aggregate(Uuid::nil(), &request(), vec![page], epoch(), epoch());
        // Score 80 would be parzialmente_conforme, but a critical finding
        // always pins non_conforme.
        assert_eq!(result.metrics.overall_score, 80);
        assert_eq!(result.metrics.compliance_level, ComplianceLevel::NonConforme);
    }

    #[test]
    fn test_compliance_thresholds() {
        assert_eq!(compliance_level(100, false), ComplianceLevel::Conforme);
        assert_eq!(compliance_level(85, false), ComplianceLevel::Conforme);
        assert_eq!(compliance_level(84, false), ComplianceLevel::ParzialmenteConforme);
        assert_eq!(compliance_level(60, false), ComplianceLevel::ParzialmenteConforme);
        assert_eq!(compliance_level(59, false), ComplianceLevel::NonConforme);
        assert_eq!(compliance_level(100, true), ComplianceLevel::NonConforme);
    }

    #[test]
    fn test_confidence_from_attempted_cells() {
        let mut page = page_with(vec![]);
        page.statuses.insert(ScannerKind::Pa11y, ScannerStatus::Timeout);
        page.statuses.insert(ScannerKind::Wave, ScannerStatus::Ok);
        page.statuses.insert(ScannerKind::Lighthouse, ScannerStatus::Skipped);
        // axe ok (from page_with), wave ok, pa11y timeout, lighthouse skipped
        let result = aggregate(Uuid::nil(), &request(), vec![page], epoch(), epoch());
        assert!((result.metrics.confidence - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_attempts_zero_confidence() {
        let page = PageResult::empty(PageRef::seed("https://example.com/"));
        let result = aggregate(Uuid::nil(), &request(), vec![page], epoch(), epoch());
        assert_eq!(result.metrics.confidence, 0.0);
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let build = || {
            let page = page_with(vec![
                violation("crit", "1.1.1", Severity::Critical, 100),
                violation("h1", "1.4.3", Severity::High, 1),
                violation("h2", "1.3.1", Severity::High, 1),
                violation("h3", "2.4.4", Severity::High, 1),
            ]);
            aggregate(Uuid::nil(), &request(), vec![page], epoch(), epoch())
        };
        let a = serde_json::to_vec(&build()).unwrap();
        let b = serde_json::to_vec(&build()).unwrap();
        assert_eq!(a, b);
    }
}
