//! Normalization of raw scanner output into canonical violations
//!
//! This is the only layer allowed to tolerate structurally lax input.
//! Real scanner output is frequently partial: a missing key or a wrong
//! type yields an empty violation list and a log line, never an error.
//! Everything downstream operates on fully-typed [`Violation`] values.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use audit_core::page::PageRef;
use audit_core::scanner::ScannerKind;
use audit_core::severity::Severity;
use audit_core::violation::Violation;

use audit_scanners::output::RawScanOutput;

lazy_static! {
    static ref AXE_WCAG_TAG: Regex = Regex::new(r"wcag(\d{3,4})").unwrap();
    static ref PA11Y_CRITERION: Regex = Regex::new(r"^(\d+)_(\d+)_(\d+)$").unwrap();
}

/// Convert one scanner's raw output for one page into violations.
///
/// A failed run or a malformed payload contributes zero violations.
pub fn normalize(kind: ScannerKind, raw: &RawScanOutput, page: &PageRef) -> Vec<Violation> {
    let payload = match raw {
        RawScanOutput::Success { payload } => payload,
        RawScanOutput::Failure { .. } => return Vec::new(),
    };

    let violations = match kind {
        ScannerKind::Wave => normalize_wave(payload, page),
        ScannerKind::Pa11y => normalize_pa11y(payload, page),
        ScannerKind::Axe => normalize_axe(payload, page),
        ScannerKind::Lighthouse => normalize_lighthouse(payload, page),
    };

    match violations {
        Some(list) => list,
        None => {
            tracing::warn!(
                scanner = kind.as_str(),
                page = %page.url,
                "scanner payload had an unexpected shape, skipping"
            );
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// WAVE

/// WAVE item code -> WCAG criterion
fn wave_criterion(code: &str) -> &'static str {
    match code {
        "alt_missing" | "alt_link_missing" | "alt_spacer_missing" | "alt_input_missing"
        | "alt_area_missing" | "alt_map_missing" => "1.1.1",
        "contrast" | "contrast_large" => "1.4.3",
        "label_missing" | "label_empty" | "heading_empty" | "button_empty" | "th_empty"
        | "table_layout" | "table_caption_possible" => "1.3.1",
        "link_empty" => "2.4.4",
        "language_missing" => "3.1.1",
        "title_missing" => "2.4.2",
        _ => "",
    }
}

/// WAVE error severity by item code
fn wave_severity(code: &str) -> Severity {
    match code {
        "alt_missing" | "label_missing" | "language_missing" => Severity::Critical,
        "contrast" | "heading_empty" | "button_empty" | "link_empty" => Severity::High,
        _ => Severity::Medium,
    }
}

/// Remediation hint by WAVE item code
fn wave_remediation(code: &str) -> &'static str {
    match code {
        "alt_missing" => "Add a descriptive alt attribute to the image",
        "contrast" => "Increase the color contrast (at least 4.5:1 for normal text, 3:1 for large text)",
        "label_missing" => "Associate a label element with the form field",
        "heading_empty" => "Put text content inside the heading",
        "button_empty" => "Add text or an aria-label to the button",
        "link_empty" => "Add descriptive text to the link",
        "language_missing" => "Set the lang attribute on the html element",
        "title_missing" => "Add a title element to the document head",
        _ => "See the WCAG documentation for this check",
    }
}

fn normalize_wave(payload: &Value, page: &PageRef) -> Option<Vec<Violation>> {
    let categories = payload.get("categories")?.as_object()?;
    let mut violations = Vec::new();

    // serde_json objects iterate in key order, which keeps the output
    // stable for identical payloads.
    if let Some(items) = categories
        .get("error")
        .and_then(|c| c.get("items"))
        .and_then(Value::as_object)
    {
        for (code, data) in items {
            let count = data.get("count").and_then(Value::as_u64).unwrap_or(1) as u32;
            let message = data
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("WAVE error");
            violations.push(
                Violation::new(code, message, wave_severity(code), ScannerKind::Wave, &page.url)
                    .with_criterion(wave_criterion(code))
                    .with_count(count)
                    .with_remediation(wave_remediation(code)),
            );
        }
    }

    if let Some(items) = categories
        .get("alert")
        .and_then(|c| c.get("items"))
        .and_then(Value::as_object)
    {
        for (code, data) in items {
            let count = data.get("count").and_then(Value::as_u64).unwrap_or(1) as u32;
            let message = data
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("WAVE alert");
            violations.push(
                Violation::new(code, message, Severity::Low, ScannerKind::Wave, &page.url)
                    .with_criterion(wave_criterion(code))
                    .with_count(count)
                    .with_remediation("Verify this manually"),
            );
        }
    }

    Some(violations)
}

// ---------------------------------------------------------------------------
// Pa11y

/// Extract the WCAG criterion from a Pa11y code such as
/// `WCAG2AA.Principle1.Guideline1_1.1_1_1`: take the last path segment
/// and parse the digit triple.
pub fn pa11y_criterion(code: &str) -> Option<String> {
    let last = code.rsplit('.').next()?;
    let caps = PA11Y_CRITERION.captures(last)?;
    Some(format!("{}.{}.{}", &caps[1], &caps[2], &caps[3]))
}

fn pa11y_severity(issue_type: &str) -> Severity {
    match issue_type {
        "error" => Severity::High,
        "warning" => Severity::Medium,
        _ => Severity::Low,
    }
}

fn normalize_pa11y(payload: &Value, page: &PageRef) -> Option<Vec<Violation>> {
    // Pa11y emits either {"issues": [...]} or a bare array.
    let issues = payload
        .get("issues")
        .and_then(Value::as_array)
        .or_else(|| payload.as_array())?;

    let mut violations = Vec::new();
    for issue in issues {
        let Some(code) = issue.get("code").and_then(Value::as_str) else {
            continue;
        };
        let issue_type = issue.get("type").and_then(Value::as_str).unwrap_or("notice");
        let message = issue.get("message").and_then(Value::as_str).unwrap_or("");

        let mut violation = Violation::new(
            code,
            message,
            pa11y_severity(issue_type),
            ScannerKind::Pa11y,
            &page.url,
        );
        if let Some(criterion) = pa11y_criterion(code) {
            violation = violation.with_criterion(criterion);
        }
        if let Some(selector) = issue.get("selector").and_then(Value::as_str) {
            violation = violation.with_selector(selector);
        }
        if let Some(context) = issue.get("context").and_then(Value::as_str) {
            violation = violation.with_snippet(context);
        }
        violations.push(violation);
    }

    Some(violations)
}

// ---------------------------------------------------------------------------
// Axe

/// Extract the WCAG criterion from axe tags: `wcag143` -> `1.4.3`,
/// `wcag1410` -> `1.4.10`
pub fn axe_criterion(tags: &[&str]) -> Option<String> {
    for tag in tags {
        if let Some(caps) = AXE_WCAG_TAG.captures(&tag.to_ascii_lowercase()) {
            let digits = caps[1].to_string();
            return Some(match digits.len() {
                3 => format!("{}.{}.{}", &digits[0..1], &digits[1..2], &digits[2..3]),
                _ => format!("{}.{}.{}", &digits[0..1], &digits[1..2], &digits[2..4]),
            });
        }
    }
    None
}

fn axe_severity(impact: &str) -> Severity {
    match impact {
        "critical" => Severity::Critical,
        "serious" => Severity::High,
        "moderate" => Severity::Medium,
        "minor" => Severity::Low,
        _ => Severity::Medium,
    }
}

fn normalize_axe(payload: &Value, page: &PageRef) -> Option<Vec<Violation>> {
    // The axe CLI reports one object per scanned URL; accept either the
    // object itself or a single-element array of them.
    let report = if payload.is_array() {
        payload.get(0)?
    } else {
        payload
    };
    let violations_json = report.get("violations")?.as_array()?;

    let mut violations = Vec::new();
    for item in violations_json {
        let Some(id) = item.get("id").and_then(Value::as_str) else {
            continue;
        };
        let impact = item.get("impact").and_then(Value::as_str).unwrap_or("moderate");
        let message = item
            .get("description")
            .and_then(Value::as_str)
            .or_else(|| item.get("help").and_then(Value::as_str))
            .unwrap_or("");

        let nodes = item.get("nodes");
        let count = match nodes {
            Some(Value::Array(list)) => list.len().max(1) as u32,
            Some(Value::Number(n)) => n.as_u64().unwrap_or(1) as u32,
            _ => 1,
        };

        let tags: Vec<&str> = item
            .get("tags")
            .and_then(Value::as_array)
            .map(|t| t.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut violation = Violation::new(
            id,
            message,
            axe_severity(impact),
            ScannerKind::Axe,
            &page.url,
        )
        .with_count(count);

        if let Some(criterion) = axe_criterion(&tags) {
            violation = violation.with_criterion(criterion);
        }
        if let Some(first) = nodes.and_then(Value::as_array).and_then(|n| n.first()) {
            if let Some(target) = first
                .get("target")
                .and_then(Value::as_array)
                .and_then(|t| t.first())
                .and_then(Value::as_str)
            {
                violation = violation.with_selector(target);
            }
            if let Some(html) = first.get("html").and_then(Value::as_str) {
                violation = violation.with_snippet(html);
            }
        }
        if let Some(help_url) = item.get("helpUrl").and_then(Value::as_str) {
            violation = violation.with_remediation(help_url);
        }

        violations.push(violation);
    }

    Some(violations)
}

// ---------------------------------------------------------------------------
// Lighthouse

/// The Lighthouse audit ids that belong to the accessibility category
const LIGHTHOUSE_AUDITS: &[&str] = &[
    "aria-allowed-attr",
    "aria-command-name",
    "aria-hidden-body",
    "aria-hidden-focus",
    "aria-input-field-name",
    "aria-meter-name",
    "aria-progressbar-name",
    "aria-required-attr",
    "aria-required-children",
    "aria-required-parent",
    "aria-roles",
    "aria-toggle-field-name",
    "aria-tooltip-name",
    "aria-treeitem-name",
    "aria-valid-attr-value",
    "aria-valid-attr",
    "button-name",
    "bypass",
    "color-contrast",
    "definition-list",
    "dlitem",
    "document-title",
    "duplicate-id-active",
    "duplicate-id-aria",
    "form-field-multiple-labels",
    "frame-title",
    "html-has-lang",
    "html-lang-valid",
    "html-xml-lang-mismatch",
    "image-alt",
    "input-image-alt",
    "label",
    "link-name",
    "list",
    "listitem",
    "meta-refresh",
    "meta-viewport",
    "object-alt",
    "scrollable-region-focusable",
    "select-name",
    "skip-link",
    "tabindex",
    "td-headers-attr",
    "th-has-data-cells",
    "valid-lang",
    "video-caption",
];

/// Lighthouse audit id -> WCAG criterion
pub fn lighthouse_criterion(audit_id: &str) -> &'static str {
    match audit_id {
        "aria-allowed-attr" | "aria-command-name" | "aria-hidden-body" | "aria-hidden-focus"
        | "aria-input-field-name" | "aria-required-attr" | "aria-roles"
        | "aria-toggle-field-name" | "aria-tooltip-name" | "aria-treeitem-name"
        | "aria-valid-attr-value" | "aria-valid-attr" | "button-name" => "4.1.2",
        "aria-meter-name" | "aria-progressbar-name" | "image-alt" | "input-image-alt"
        | "object-alt" => "1.1.1",
        "aria-required-children" | "aria-required-parent" | "definition-list" | "dlitem"
        | "label" | "list" | "listitem" | "select-name" | "td-headers-attr"
        | "th-has-data-cells" => "1.3.1",
        "bypass" | "frame-title" | "skip-link" => "2.4.1",
        "color-contrast" => "1.4.3",
        "document-title" => "2.4.2",
        "duplicate-id-active" | "duplicate-id-aria" => "4.1.1",
        "form-field-multiple-labels" => "3.3.2",
        "html-has-lang" | "html-lang-valid" | "html-xml-lang-mismatch" => "3.1.1",
        "link-name" => "2.4.4",
        "meta-refresh" => "2.2.1",
        "meta-viewport" => "1.4.4",
        "scrollable-region-focusable" => "2.1.1",
        "tabindex" => "2.4.3",
        "valid-lang" => "3.1.2",
        "video-caption" => "1.2.2",
        _ => "",
    }
}

fn lighthouse_severity(audit_id: &str) -> Severity {
    if audit_id.contains("aria") || audit_id.contains("contrast") {
        Severity::High
    } else {
        Severity::Medium
    }
}

fn normalize_lighthouse(payload: &Value, page: &PageRef) -> Option<Vec<Violation>> {
    let audits = payload.get("audits")?.as_object()?;

    let mut violations = Vec::new();
    // Iterate the fixed audit list rather than the payload keys so
    // unrelated audits (performance etc.) never leak in.
    for audit_id in LIGHTHOUSE_AUDITS {
        let Some(audit) = audits.get(*audit_id) else {
            continue;
        };
        let Some(score) = audit.get("score").and_then(Value::as_f64) else {
            continue;
        };
        if score >= 1.0 {
            continue;
        }

        let message = audit.get("title").and_then(Value::as_str).unwrap_or("");
        let count = audit
            .get("details")
            .and_then(|d| d.get("items"))
            .and_then(Value::as_array)
            .map(|items| items.len().max(1) as u32)
            .unwrap_or(1);

        let mut violation = Violation::new(
            *audit_id,
            message,
            lighthouse_severity(audit_id),
            ScannerKind::Lighthouse,
            &page.url,
        )
        .with_criterion(lighthouse_criterion(audit_id))
        .with_count(count);

        if let Some(description) = audit.get("description").and_then(Value::as_str) {
            violation = violation.with_remediation(description);
        }

        violations.push(violation);
    }

    Some(violations)
}
