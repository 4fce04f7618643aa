//! Deterministic canned scanner output for offline mode
//!
//! Simulate mode exists for demos and for tests that must be byte-stable
//! across runs: every adapter returns the same payload for the same URL,
//! without touching the network or spawning a process.

use serde_json::{json, Value};

use audit_core::scanner::ScannerKind;

/// The canned payload a scanner returns for `url` in simulate mode
pub fn simulated_payload(kind: ScannerKind, url: &str) -> Value {
    match kind {
        ScannerKind::Wave => wave_payload(url),
        ScannerKind::Pa11y => pa11y_payload(url),
        ScannerKind::Axe => axe_payload(url),
        ScannerKind::Lighthouse => lighthouse_payload(url),
    }
}

fn wave_payload(url: &str) -> Value {
    json!({
        "status": { "success": true, "httpstatuscode": 200 },
        "statistics": {
            "pageurl": url,
            "pagetitle": "Simulated page",
            "time": 1.42,
            "totalelements": 186
        },
        "categories": {
            "error": {
                "description": "Errors",
                "count": 4,
                "items": {
                    "alt_missing": {
                        "id": "alt_missing",
                        "description": "Missing alternative text",
                        "count": 3
                    },
                    "contrast": {
                        "id": "contrast",
                        "description": "Very low contrast",
                        "count": 1
                    }
                }
            },
            "alert": {
                "description": "Alerts",
                "count": 1,
                "items": {
                    "contrast": {
                        "id": "contrast",
                        "description": "Very low contrast (borderline ratio)",
                        "count": 1
                    }
                }
            },
            "feature": {
                "description": "Features",
                "count": 1,
                "items": {
                    "alt": {
                        "id": "alt",
                        "description": "Alternative text present",
                        "count": 12
                    }
                }
            }
        }
    })
}

fn pa11y_payload(url: &str) -> Value {
    json!({
        "pageUrl": url,
        "documentTitle": "Simulated page",
        "issues": [
            {
                "type": "error",
                "code": "WCAG2AA.Principle1.Guideline1_3.1_3_1",
                "message": "This table is missing header cells associated with its data cells.",
                "selector": "#content > table",
                "context": "<table><tr><td>Name</td><td>Value</td></tr></table>"
            },
            {
                "type": "notice",
                "code": "WCAG2AA.Principle1.Guideline1_3.1_3_1",
                "message": "Check that the table markup reflects the data relationships.",
                "selector": "#footer > table",
                "context": "<table><tr><td>Links</td></tr></table>"
            }
        ]
    })
}

fn axe_payload(url: &str) -> Value {
    json!({
        "url": url,
        "violations": [
            {
                "id": "color-contrast",
                "impact": "serious",
                "description": "Elements must have sufficient color contrast",
                "help": "Elements must have sufficient color contrast",
                "helpUrl": "https://dequeuniversity.com/rules/axe/4.7/color-contrast",
                "tags": ["cat.color", "wcag2aa", "wcag143"],
                "nodes": [
                    {
                        "target": ["header .nav-link"],
                        "html": "<a class=\"nav-link\" href=\"/about\">About</a>"
                    }
                ]
            }
        ],
        "passes": [],
        "incomplete": []
    })
}

fn lighthouse_payload(url: &str) -> Value {
    json!({
        "finalUrl": url,
        "categories": {
            "accessibility": { "id": "accessibility", "score": 0.82 }
        },
        "audits": {
            "color-contrast": {
                "id": "color-contrast",
                "score": 0,
                "title": "Background and foreground colors do not have a sufficient contrast ratio.",
                "description": "Low-contrast text is difficult or impossible for many users to read.",
                "details": {
                    "items": [ { "node": { "selector": "header .nav-link" } } ]
                }
            },
            "image-alt": {
                "id": "image-alt",
                "score": 1,
                "title": "Image elements have `[alt]` attributes"
            },
            "first-contentful-paint": {
                "id": "first-contentful-paint",
                "score": 0.4,
                "title": "First Contentful Paint"
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payloads_are_deterministic() {
        for kind in ScannerKind::all() {
            let a = simulated_payload(kind, "https://example.com/");
            let b = simulated_payload(kind, "https://example.com/");
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_payloads_are_keyed_by_url() {
        let a = simulated_payload(ScannerKind::Pa11y, "https://a.example/");
        let b = simulated_payload(ScannerKind::Pa11y, "https://b.example/");
        assert_ne!(a, b);
        assert_eq!(a["pageUrl"], "https://a.example/");
    }

    #[test]
    fn test_wave_shape() {
        let payload = simulated_payload(ScannerKind::Wave, "https://example.com/");
        assert_eq!(payload["status"]["success"], true);
        assert_eq!(payload["categories"]["error"]["items"]["alt_missing"]["count"], 3);
    }
}
