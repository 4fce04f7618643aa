//! Audit Pipeline - normalization, aggregation and scoring
//!
//! The pure middle of the audit engine: raw scanner payloads come in,
//! a deterministic [`ScanResult`](audit_core::result::ScanResult) comes
//! out.
//!
//! - [`normalize`](normalize::normalize) converts each scanner's output
//!   into canonical violations, tolerating partial or malformed payloads.
//! - [`aggregate`](aggregate::aggregate) deduplicates per page, merges
//!   across pages, sorts, scores and derives the compliance level.
//! - [`remediation`] turns the aggregated list into a prioritized plan.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod aggregate;
pub mod normalize;
pub mod remediation;

pub use aggregate::{aggregate, compliance_level, compute_score, dedupe_page};
pub use normalize::normalize;

#[cfg(test)]
mod tests {
    use audit_core::page::PageRef;
    use audit_core::scanner::ScannerKind;
    use audit_scanners::output::RawScanOutput;
    use audit_scanners::simulate::simulated_payload;

    /// The simulate fixtures drive the end-to-end expectations; make sure
    /// normalization of the whole fixture set stays stable.
    #[test]
    fn test_fixture_normalization_counts() {
        let page = PageRef::seed("https://simulate.local/home");
        let counts: Vec<usize> = ScannerKind::all()
            .into_iter()
            .map(|kind| {
                let raw = RawScanOutput::success(simulated_payload(kind, &page.url));
                crate::normalize(kind, &raw, &page).len()
            })
            .collect();
        // wave: 2 errors + 1 alert, pa11y: error + notice, axe: 1, lighthouse: 1
        assert_eq!(counts, vec![3, 2, 1, 1]);
    }
}
