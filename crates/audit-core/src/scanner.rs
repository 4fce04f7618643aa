//! Scanner identities and static capability descriptors

use serde::{Deserialize, Serialize};

/// The external accessibility scanners the engine can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerKind {
    /// WAVE (WebAIM) remote HTTP API
    Wave,
    /// Pa11y CLI subprocess
    Pa11y,
    /// axe-core CLI subprocess
    Axe,
    /// Lighthouse CLI subprocess (accessibility category only)
    Lighthouse,
}

impl ScannerKind {
    /// Stable lowercase identifier used in wire payloads and file names
    pub fn as_str(&self) -> &'static str {
        match self {
            ScannerKind::Wave => "wave",
            ScannerKind::Pa11y => "pa11y",
            ScannerKind::Axe => "axe",
            ScannerKind::Lighthouse => "lighthouse",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            ScannerKind::Wave => "WAVE",
            ScannerKind::Pa11y => "Pa11y",
            ScannerKind::Axe => "Axe-core",
            ScannerKind::Lighthouse => "Lighthouse",
        }
    }

    /// All scanner kinds in canonical order
    pub fn all() -> [ScannerKind; 4] {
        [
            ScannerKind::Wave,
            ScannerKind::Pa11y,
            ScannerKind::Axe,
            ScannerKind::Lighthouse,
        ]
    }

    /// Static capability descriptor for this scanner
    pub fn descriptor(&self) -> &'static ScannerDescriptor {
        match self {
            ScannerKind::Wave => &WAVE_DESCRIPTOR,
            ScannerKind::Pa11y => &PA11Y_DESCRIPTOR,
            ScannerKind::Axe => &AXE_DESCRIPTOR,
            ScannerKind::Lighthouse => &LIGHTHOUSE_DESCRIPTOR,
        }
    }
}

impl std::fmt::Display for ScannerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Rough latency class of a scanner run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyClass {
    /// Typically completes within a few seconds
    Fast,
    /// Typically 10-30 seconds
    Moderate,
    /// Typically 30+ seconds (full page audit with rendering)
    Slow,
}

/// Static description of a scanner's requirements and coverage
#[derive(Debug, Clone, Copy)]
pub struct ScannerDescriptor {
    /// Whether the scanner needs an API key to run
    pub requires_api_key: bool,
    /// Typical latency class
    pub latency: LatencyClass,
    /// WCAG criteria this scanner can detect
    pub criteria: &'static [&'static str],
}

static WAVE_DESCRIPTOR: ScannerDescriptor = ScannerDescriptor {
    requires_api_key: true,
    latency: LatencyClass::Moderate,
    criteria: &[
        "1.1.1", "1.3.1", "1.4.3", "2.4.2", "2.4.4", "3.1.1",
    ],
};

static PA11Y_DESCRIPTOR: ScannerDescriptor = ScannerDescriptor {
    requires_api_key: false,
    latency: LatencyClass::Moderate,
    criteria: &[
        "1.1.1", "1.3.1", "1.4.3", "2.4.1", "2.4.2", "2.4.4", "3.1.1", "3.3.2", "4.1.1", "4.1.2",
    ],
};

static AXE_DESCRIPTOR: ScannerDescriptor = ScannerDescriptor {
    requires_api_key: false,
    latency: LatencyClass::Fast,
    criteria: &[
        "1.1.1", "1.3.1", "1.4.3", "2.1.1", "2.4.1", "2.4.2", "2.4.4", "3.1.1", "4.1.1", "4.1.2",
    ],
};

static LIGHTHOUSE_DESCRIPTOR: ScannerDescriptor = ScannerDescriptor {
    requires_api_key: false,
    latency: LatencyClass::Slow,
    criteria: &[
        "1.1.1", "1.3.1", "1.4.3", "1.4.4", "2.1.1", "2.4.1", "2.4.2", "2.4.3", "2.4.4",
        "3.1.1", "3.1.2", "3.3.2", "4.1.1", "4.1.2",
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_api_key() {
        assert!(ScannerKind::Wave.descriptor().requires_api_key);
        assert!(!ScannerKind::Pa11y.descriptor().requires_api_key);
        assert!(!ScannerKind::Axe.descriptor().requires_api_key);
        assert!(!ScannerKind::Lighthouse.descriptor().requires_api_key);
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&ScannerKind::Pa11y).unwrap(), "\"pa11y\"");
        let back: ScannerKind = serde_json::from_str("\"lighthouse\"").unwrap();
        assert_eq!(back, ScannerKind::Lighthouse);
    }

    #[test]
    fn test_descriptors_cover_known_criteria() {
        for kind in ScannerKind::all() {
            for id in kind.descriptor().criteria {
                assert!(
                    crate::wcag::criterion_by_id(id).is_some(),
                    "{} lists unknown criterion {}",
                    kind,
                    id
                );
            }
        }
    }
}
