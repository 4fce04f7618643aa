//! WCAG 2.1 success criteria definitions

use serde::{Deserialize, Serialize};

/// WCAG conformance level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WcagLevel {
    /// Level A (minimum)
    A,
    /// Level AA (mid-range)
    AA,
    /// Level AAA (highest)
    AAA,
}

impl std::fmt::Display for WcagLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WcagLevel::A => write!(f, "A"),
            WcagLevel::AA => write!(f, "AA"),
            WcagLevel::AAA => write!(f, "AAA"),
        }
    }
}

/// WCAG principle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WcagPrinciple {
    /// Information and UI components must be presentable to users
    Perceivable,
    /// UI components and navigation must be operable
    Operable,
    /// Information and operation of the UI must be understandable
    Understandable,
    /// Content must be interpretable by a wide variety of user agents
    Robust,
}

impl WcagPrinciple {
    /// Stable lowercase identifier used in wire payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            WcagPrinciple::Perceivable => "perceivable",
            WcagPrinciple::Operable => "operable",
            WcagPrinciple::Understandable => "understandable",
            WcagPrinciple::Robust => "robust",
        }
    }

    /// All four principles in POUR order
    pub fn all() -> [WcagPrinciple; 4] {
        [
            WcagPrinciple::Perceivable,
            WcagPrinciple::Operable,
            WcagPrinciple::Understandable,
            WcagPrinciple::Robust,
        ]
    }
}

impl std::fmt::Display for WcagPrinciple {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WcagPrinciple::Perceivable => write!(f, "Perceivable"),
            WcagPrinciple::Operable => write!(f, "Operable"),
            WcagPrinciple::Understandable => write!(f, "Understandable"),
            WcagPrinciple::Robust => write!(f, "Robust"),
        }
    }
}

/// Derive the POUR principle from a criterion id (e.g. "1.4.3").
///
/// A missing or unparseable criterion defaults to Robust, matching how
/// untagged findings are bucketed in reports.
pub fn principle_for_criterion(criterion: &str) -> WcagPrinciple {
    match criterion.as_bytes().first() {
        Some(b'1') => WcagPrinciple::Perceivable,
        Some(b'2') => WcagPrinciple::Operable,
        Some(b'3') => WcagPrinciple::Understandable,
        _ => WcagPrinciple::Robust,
    }
}

/// WCAG success criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WcagCriterion {
    /// Criterion identifier (e.g. "1.1.1")
    pub id: &'static str,
    /// Criterion name
    pub name: &'static str,
    /// Conformance level
    pub level: WcagLevel,
    /// Governing principle
    pub principle: WcagPrinciple,
}

/// WCAG 2.1 success criteria, levels A and AA (the EAA audit scope)
pub const CRITERIA: &[WcagCriterion] = &[
    // Perceivable - Level A
    WcagCriterion { id: "1.1.1", name: "Non-text Content", level: WcagLevel::A, principle: WcagPrinciple::Perceivable },
    WcagCriterion { id: "1.2.2", name: "Captions (Prerecorded)", level: WcagLevel::A, principle: WcagPrinciple::Perceivable },
    WcagCriterion { id: "1.3.1", name: "Info and Relationships", level: WcagLevel::A, principle: WcagPrinciple::Perceivable },
    WcagCriterion { id: "1.3.2", name: "Meaningful Sequence", level: WcagLevel::A, principle: WcagPrinciple::Perceivable },
    WcagCriterion { id: "1.3.3", name: "Sensory Characteristics", level: WcagLevel::A, principle: WcagPrinciple::Perceivable },
    WcagCriterion { id: "1.4.1", name: "Use of Color", level: WcagLevel::A, principle: WcagPrinciple::Perceivable },
    WcagCriterion { id: "1.4.2", name: "Audio Control", level: WcagLevel::A, principle: WcagPrinciple::Perceivable },
    // Perceivable - Level AA
    WcagCriterion { id: "1.3.4", name: "Orientation", level: WcagLevel::AA, principle: WcagPrinciple::Perceivable },
    WcagCriterion { id: "1.3.5", name: "Identify Input Purpose", level: WcagLevel::AA, principle: WcagPrinciple::Perceivable },
    WcagCriterion { id: "1.4.3", name: "Contrast (Minimum)", level: WcagLevel::AA, principle: WcagPrinciple::Perceivable },
    WcagCriterion { id: "1.4.4", name: "Resize Text", level: WcagLevel::AA, principle: WcagPrinciple::Perceivable },
    WcagCriterion { id: "1.4.5", name: "Images of Text", level: WcagLevel::AA, principle: WcagPrinciple::Perceivable },
    WcagCriterion { id: "1.4.10", name: "Reflow", level: WcagLevel::AA, principle: WcagPrinciple::Perceivable },
    WcagCriterion { id: "1.4.11", name: "Non-text Contrast", level: WcagLevel::AA, principle: WcagPrinciple::Perceivable },
    WcagCriterion { id: "1.4.12", name: "Text Spacing", level: WcagLevel::AA, principle: WcagPrinciple::Perceivable },
    WcagCriterion { id: "1.4.13", name: "Content on Hover or Focus", level: WcagLevel::AA, principle: WcagPrinciple::Perceivable },
    // Operable - Level A
    WcagCriterion { id: "2.1.1", name: "Keyboard", level: WcagLevel::A, principle: WcagPrinciple::Operable },
    WcagCriterion { id: "2.1.2", name: "No Keyboard Trap", level: WcagLevel::A, principle: WcagPrinciple::Operable },
    WcagCriterion { id: "2.2.1", name: "Timing Adjustable", level: WcagLevel::A, principle: WcagPrinciple::Operable },
    WcagCriterion { id: "2.4.1", name: "Bypass Blocks", level: WcagLevel::A, principle: WcagPrinciple::Operable },
    WcagCriterion { id: "2.4.2", name: "Page Titled", level: WcagLevel::A, principle: WcagPrinciple::Operable },
    WcagCriterion { id: "2.4.3", name: "Focus Order", level: WcagLevel::A, principle: WcagPrinciple::Operable },
    WcagCriterion { id: "2.4.4", name: "Link Purpose (In Context)", level: WcagLevel::A, principle: WcagPrinciple::Operable },
    // Operable - Level AA
    WcagCriterion { id: "2.4.5", name: "Multiple Ways", level: WcagLevel::AA, principle: WcagPrinciple::Operable },
    WcagCriterion { id: "2.4.6", name: "Headings and Labels", level: WcagLevel::AA, principle: WcagPrinciple::Operable },
    WcagCriterion { id: "2.4.7", name: "Focus Visible", level: WcagLevel::AA, principle: WcagPrinciple::Operable },
    // Understandable - Level A
    WcagCriterion { id: "3.1.1", name: "Language of Page", level: WcagLevel::A, principle: WcagPrinciple::Understandable },
    WcagCriterion { id: "3.2.1", name: "On Focus", level: WcagLevel::A, principle: WcagPrinciple::Understandable },
    WcagCriterion { id: "3.2.2", name: "On Input", level: WcagLevel::A, principle: WcagPrinciple::Understandable },
    WcagCriterion { id: "3.3.1", name: "Error Identification", level: WcagLevel::A, principle: WcagPrinciple::Understandable },
    WcagCriterion { id: "3.3.2", name: "Labels or Instructions", level: WcagLevel::A, principle: WcagPrinciple::Understandable },
    // Understandable - Level AA
    WcagCriterion { id: "3.1.2", name: "Language of Parts", level: WcagLevel::AA, principle: WcagPrinciple::Understandable },
    WcagCriterion { id: "3.2.3", name: "Consistent Navigation", level: WcagLevel::AA, principle: WcagPrinciple::Understandable },
    WcagCriterion { id: "3.2.4", name: "Consistent Identification", level: WcagLevel::AA, principle: WcagPrinciple::Understandable },
    WcagCriterion { id: "3.3.3", name: "Error Suggestion", level: WcagLevel::AA, principle: WcagPrinciple::Understandable },
    WcagCriterion { id: "3.3.4", name: "Error Prevention (Legal, Financial, Data)", level: WcagLevel::AA, principle: WcagPrinciple::Understandable },
    // Robust - Level A
    WcagCriterion { id: "4.1.1", name: "Parsing", level: WcagLevel::A, principle: WcagPrinciple::Robust },
    WcagCriterion { id: "4.1.2", name: "Name, Role, Value", level: WcagLevel::A, principle: WcagPrinciple::Robust },
    // Robust - Level AA
    WcagCriterion { id: "4.1.3", name: "Status Messages", level: WcagLevel::AA, principle: WcagPrinciple::Robust },
];

/// Look up a criterion by id
pub fn criterion_by_id(id: &str) -> Option<&'static WcagCriterion> {
    CRITERIA.iter().find(|c| c.id == id)
}

/// Conformance level of a criterion, if known
pub fn level_for_criterion(id: &str) -> Option<WcagLevel> {
    criterion_by_id(id).map(|c| c.level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criterion_by_id() {
        let c = criterion_by_id("1.1.1").unwrap();
        assert_eq!(c.name, "Non-text Content");
        assert_eq!(c.level, WcagLevel::A);
        assert!(criterion_by_id("9.9.9").is_none());
    }

    #[test]
    fn test_principle_for_criterion() {
        assert_eq!(principle_for_criterion("1.4.3"), WcagPrinciple::Perceivable);
        assert_eq!(principle_for_criterion("2.4.4"), WcagPrinciple::Operable);
        assert_eq!(principle_for_criterion("3.1.1"), WcagPrinciple::Understandable);
        assert_eq!(principle_for_criterion("4.1.2"), WcagPrinciple::Robust);
        assert_eq!(principle_for_criterion(""), WcagPrinciple::Robust);
    }

    #[test]
    fn test_table_principles_match_first_digit() {
        for c in CRITERIA {
            assert_eq!(c.principle, principle_for_criterion(c.id), "criterion {}", c.id);
        }
    }
}
