//! Pattern-driven remediation plan
//!
//! Turns the aggregated violation list into a short, prioritized list of
//! concrete work items. Patterns are keyed on well-known code fragments
//! and criteria rather than individual scanner vocabularies, so one
//! recommendation covers the same defect reported by several scanners.

use audit_core::result::{AggregatedViolation, Recommendation, RecommendationPriority};

const MAX_RECOMMENDATIONS: usize = 5;

struct Pattern {
    code_fragment: &'static str,
    criterion: &'static str,
    priority: RecommendationPriority,
    title: &'static str,
    description: &'static str,
    actions: &'static [&'static str],
}

static PATTERNS: &[Pattern] = &[
    Pattern {
        code_fragment: "alt",
        criterion: "1.1.1",
        priority: RecommendationPriority::High,
        title: "Missing alternative text for images",
        description: "Images without descriptive alternative text are invisible to screen reader users.",
        actions: &[
            "Add a descriptive alt attribute to every informative image",
            "Use alt=\"\" for purely decorative images",
            "Check that the text describes the content, not just the image",
        ],
    },
    Pattern {
        code_fragment: "contrast",
        criterion: "1.4.3",
        priority: RecommendationPriority::High,
        title: "Insufficient color contrast",
        description: "Text contrast against its background does not meet the WCAG minimum ratios.",
        actions: &[
            "Raise the contrast ratio to at least 4.5:1 for normal text",
            "Ensure at least 3:1 for large text (18pt, or 14pt bold)",
            "Verify contrast at design time with a checker tool",
        ],
    },
    Pattern {
        code_fragment: "label",
        criterion: "1.3.1",
        priority: RecommendationPriority::High,
        title: "Form fields without labels",
        description: "Inputs without an associated label cannot be identified by assistive technology.",
        actions: &[
            "Associate every input with a label element",
            "Use aria-label where a visible label is not possible",
            "Group related fields with fieldset and legend",
        ],
    },
    Pattern {
        code_fragment: "heading",
        criterion: "",
        priority: RecommendationPriority::Medium,
        title: "Broken heading structure",
        description: "The heading hierarchy does not follow a logical order.",
        actions: &[
            "Use headings in hierarchical order (h1, h2, h3, ...)",
            "Do not skip heading levels",
            "Use a single h1 per page as the main title",
        ],
    },
    Pattern {
        code_fragment: "lang",
        criterion: "3.1.1",
        priority: RecommendationPriority::Medium,
        title: "Document language not declared",
        description: "A missing lang attribute prevents screen readers from choosing the right pronunciation.",
        actions: &[
            "Add a lang attribute to the html element",
            "Declare lang on passages in a different language",
            "Use valid language codes (e.g. en, it, fr)",
        ],
    },
];

/// Generate the prioritized remediation plan from the aggregated list
pub fn generate(violations: &[AggregatedViolation]) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for pattern in PATTERNS {
        let matched = violations.iter().any(|v| {
            v.code.to_ascii_lowercase().contains(pattern.code_fragment)
                || (!pattern.criterion.is_empty()
                    && v.wcag_criterion.as_deref() == Some(pattern.criterion))
        });
        if matched {
            recommendations.push(Recommendation {
                priority: pattern.priority,
                title: pattern.title.to_string(),
                description: pattern.description.to_string(),
                actions: pattern.actions.iter().map(|a| a.to_string()).collect(),
            });
        }
    }

    // Findings that match no pattern still deserve a manual pass.
    if recommendations.is_empty() && !violations.is_empty() {
        recommendations.push(Recommendation {
            priority: RecommendationPriority::Medium,
            title: "Manual review recommended".to_string(),
            description:
                "Several accessibility issues were detected that need a manual review to resolve."
                    .to_string(),
            actions: vec![
                "Test with a real screen reader".to_string(),
                "Verify keyboard-only navigation".to_string(),
                "Run sessions with users with disabilities".to_string(),
            ],
        });
    }

    recommendations.sort_by_key(|r| r.priority);
    recommendations.truncate(MAX_RECOMMENDATIONS);
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_core::scanner::ScannerKind;
    use audit_core::severity::Severity;
    use std::collections::BTreeSet;

    fn group(code: &str, criterion: Option<&str>) -> AggregatedViolation {
        let mut scanners = BTreeSet::new();
        scanners.insert(ScannerKind::Wave);
        AggregatedViolation {
            code: code.to_string(),
            wcag_criterion: criterion.map(String::from),
            severity: Severity::High,
            message: "m".to_string(),
            remediation: None,
            scanners,
            total_count: 1,
            pages: vec![],
        }
    }

    #[test]
    fn test_empty_input_no_recommendations() {
        assert!(generate(&[]).is_empty());
    }

    #[test]
    fn test_patterns_match_code_or_criterion() {
        let recs = generate(&[group("alt_missing", Some("1.1.1"))]);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].priority, RecommendationPriority::High);

        // Criterion alone is enough even when the code says nothing.
        let recs = generate(&[group("color-issue", Some("1.4.3"))]);
        assert_eq!(recs.len(), 1);
        assert!(recs[0].title.contains("contrast"));
    }

    #[test]
    fn test_unmatched_violations_get_manual_review() {
        let recs = generate(&[group("aria-roles", Some("4.1.2"))]);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].title, "Manual review recommended");
    }

    #[test]
    fn test_high_priority_sorts_first_and_capped() {
        let recs = generate(&[
            group("heading_empty", None),
            group("alt_missing", Some("1.1.1")),
            group("contrast", Some("1.4.3")),
            group("label_missing", Some("1.3.1")),
            group("language_missing", Some("3.1.1")),
        ]);
        assert!(recs.len() <= 5);
        assert_eq!(recs[0].priority, RecommendationPriority::High);
        assert!(recs.windows(2).all(|w| w[0].priority <= w[1].priority));
    }
}
