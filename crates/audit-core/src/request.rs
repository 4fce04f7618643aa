//! Scan requests and their validation

use serde::{Deserialize, Serialize};
use url::{Host, Url};

use crate::error::{ValidationError, ValidationErrorDetail};
use crate::scanner::ScannerKind;

/// Minimum accepted per-scanner timeout in milliseconds
pub const MIN_TIMEOUT_MS: u64 = 1_000;
/// Maximum accepted per-scanner timeout in milliseconds
pub const MAX_TIMEOUT_MS: u64 = 600_000;

/// Execution mode for a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Drive the real external scanners
    Real,
    /// Deterministic offline mode with canned scanner output
    Simulate,
}

/// Per-scanner enable flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerToggles {
    /// WAVE remote API
    pub wave: bool,
    /// Pa11y CLI
    pub pa11y: bool,
    /// axe-core CLI
    pub axe: bool,
    /// Lighthouse CLI
    pub lighthouse: bool,
}

impl ScannerToggles {
    /// Enable every scanner
    pub fn all() -> Self {
        Self { wave: true, pa11y: true, axe: true, lighthouse: true }
    }

    /// Whether a given scanner is enabled
    pub fn is_enabled(&self, kind: ScannerKind) -> bool {
        match kind {
            ScannerKind::Wave => self.wave,
            ScannerKind::Pa11y => self.pa11y,
            ScannerKind::Axe => self.axe,
            ScannerKind::Lighthouse => self.lighthouse,
        }
    }

    /// Enabled scanners in canonical order
    pub fn enabled_kinds(&self) -> Vec<ScannerKind> {
        ScannerKind::all()
            .into_iter()
            .filter(|k| self.is_enabled(*k))
            .collect()
    }

    /// Number of enabled scanners
    pub fn enabled_count(&self) -> usize {
        self.enabled_kinds().len()
    }
}

impl Default for ScannerToggles {
    fn default() -> Self {
        Self::all()
    }
}

/// Immutable input describing one requested scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Absolute http(s) URL of the site to audit
    pub url: String,
    /// Requesting organization
    pub company_name: String,
    /// Contact email for the audit report
    pub email: String,
    /// Which scanners to run
    #[serde(default)]
    pub scanners: ScannerToggles,
    /// Per-scanner timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Execution mode
    #[serde(default = "default_mode")]
    pub mode: ScanMode,
    /// Discovery bound: maximum number of pages to scan
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Discovery bound: maximum link depth from the seed
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_mode() -> ScanMode {
    ScanMode::Real
}

fn default_max_pages() -> u32 {
    5
}

fn default_max_depth() -> u32 {
    2
}

impl ScanRequest {
    /// Validate the request.
    ///
    /// `allow_local` permits loopback and private targets, used by test
    /// deployments scanning staging hosts.
    pub fn validate(&self, allow_local: bool) -> Result<(), ValidationError> {
        let mut err = ValidationError::new("invalid scan request");

        match Url::parse(&self.url) {
            Ok(u) => {
                if u.scheme() != "http" && u.scheme() != "https" {
                    err.push(ValidationErrorDetail::new(
                        "url",
                        format!("scheme \"{}\" is not http or https", u.scheme()),
                    ));
                } else if !allow_local && is_local_host(&u) {
                    err.push(ValidationErrorDetail::new(
                        "url",
                        "local or private addresses are not allowed",
                    ));
                }
            }
            Err(e) => {
                err.push(ValidationErrorDetail::new("url", format!("not a valid URL: {e}")));
            }
        }

        if self.company_name.trim().is_empty() {
            err.push(ValidationErrorDetail::new("company_name", "must not be empty"));
        }

        if !self.email.contains('@') || self.email.trim().is_empty() {
            err.push(ValidationErrorDetail::new("email", "not a valid email address"));
        }

        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            err.push(ValidationErrorDetail::new(
                "timeout_ms",
                format!("must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}"),
            ));
        }

        if self.max_pages < 1 {
            err.push(ValidationErrorDetail::new("max_pages", "must be at least 1"));
        }

        if self.max_depth < 1 {
            err.push(ValidationErrorDetail::new("max_depth", "must be at least 1"));
        }

        if err.details.is_empty() {
            Ok(())
        } else {
            Err(err)
        }
    }
}

fn is_local_host(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(d)) => {
            let d = d.to_ascii_lowercase();
            d == "localhost" || d.ends_with(".localhost") || d.ends_with(".local")
        }
        Some(Host::Ipv4(ip)) => ip.is_loopback() || ip.is_private() || ip.is_link_local(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> ScanRequest {
        ScanRequest {
            url: url.to_string(),
            company_name: "ACME Srl".to_string(),
            email: "audit@acme.example".to_string(),
            scanners: ScannerToggles::all(),
            timeout_ms: 30_000,
            mode: ScanMode::Simulate,
            max_pages: 3,
            max_depth: 2,
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(request("https://example.com").validate(false).is_ok());
    }

    #[test]
    fn test_rejects_bad_scheme() {
        let err = request("ftp://example.com").validate(false).unwrap_err();
        assert_eq!(err.details[0].field, "url");
    }

    #[test]
    fn test_rejects_local_address_unless_allowed() {
        assert!(request("http://localhost:8080").validate(false).is_err());
        assert!(request("http://127.0.0.1").validate(false).is_err());
        assert!(request("http://localhost:8080").validate(true).is_ok());
    }

    #[test]
    fn test_rejects_empty_company() {
        let mut req = request("https://example.com");
        req.company_name = "  ".to_string();
        let err = req.validate(false).unwrap_err();
        assert!(err.details.iter().any(|d| d.field == "company_name"));
    }

    #[test]
    fn test_rejects_timeout_out_of_range() {
        let mut req = request("https://example.com");
        req.timeout_ms = 500;
        assert!(req.validate(false).is_err());
        req.timeout_ms = 700_000;
        assert!(req.validate(false).is_err());
    }

    #[test]
    fn test_enabled_kinds_order() {
        let toggles = ScannerToggles { wave: false, pa11y: true, axe: true, lighthouse: false };
        assert_eq!(toggles.enabled_kinds(), vec![ScannerKind::Pa11y, ScannerKind::Axe]);
        assert_eq!(toggles.enabled_count(), 2);
    }

    #[test]
    fn test_wire_shape_roundtrip() {
        let json = r#"{
            "url": "https://example.com",
            "company_name": "ACME",
            "email": "a@b.example",
            "scanners": { "wave": true, "pa11y": false, "axe": true, "lighthouse": true },
            "timeout_ms": 45000,
            "mode": "simulate",
            "max_pages": 10,
            "max_depth": 3
        }"#;
        let req: ScanRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.mode, ScanMode::Simulate);
        assert!(!req.scanners.pa11y);
        assert_eq!(req.max_pages, 10);
    }
}
