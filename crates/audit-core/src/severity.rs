//! Severity levels for accessibility violations

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Severity level of an accessibility violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks access for entire user groups (e.g. missing text alternatives)
    Critical,
    /// Significantly impairs use of the page
    High,
    /// Degrades the experience for some users
    Medium,
    /// Minor issue or best-practice advisory
    Low,
}

impl Severity {
    /// Priority value, higher means more severe
    pub fn priority(&self) -> u8 {
        match self {
            Severity::Critical => 4,
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
        }
    }

    /// Stable lowercase identifier used in wire payloads and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }

    /// Check if severity is at least as severe as threshold
    pub fn is_at_least(&self, threshold: Severity) -> bool {
        self.priority() >= threshold.priority()
    }

    /// All severity levels ordered from most to least severe
    pub fn all_ordered() -> [Severity; 4] {
        [
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
        ]
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority().cmp(&other.priority())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_priority() {
        assert_eq!(Severity::Critical.priority(), 4);
        assert_eq!(Severity::High.priority(), 3);
        assert_eq!(Severity::Medium.priority(), 2);
        assert_eq!(Severity::Low.priority(), 1);
    }

    #[test]
    fn test_severity_comparison() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_is_at_least() {
        assert!(Severity::Critical.is_at_least(Severity::Medium));
        assert!(Severity::High.is_at_least(Severity::High));
        assert!(!Severity::Low.is_at_least(Severity::Medium));
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let back: Severity = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(back, Severity::High);
    }
}
