//! Audit Scanners - adapters for the external accessibility scanners
//!
//! Each supported scanner (WAVE, Pa11y, axe-core, Lighthouse) is driven
//! through the [`ScannerAdapter`] trait: one page in, one
//! [`RawScanOutput`] out. Adapters enforce their own deadline, classify
//! failures per the [`output::FailureKind`] taxonomy, retry transient
//! failures with exponential backoff, honor cancellation, and in
//! simulate mode return deterministic canned payloads without any
//! external call.
//!
//! The orchestrator obtains adapters through an [`AdapterProvider`], so
//! tests can substitute stubs with controlled latency and failures.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod adapter;
pub mod axe;
pub mod lighthouse;
pub mod output;
pub mod pa11y;
pub mod retry;
pub mod simulate;
pub mod subprocess;
pub mod wave;

pub use adapter::{AdapterConfig, AdapterProvider, DefaultAdapterProvider, ScannerAdapter};
pub use axe::AxeAdapter;
pub use lighthouse::LighthouseAdapter;
pub use output::{FailureKind, RawScanOutput, ScanFailure};
pub use pa11y::Pa11yAdapter;
pub use retry::RetryPolicy;
pub use simulate::simulated_payload;
pub use wave::WaveAdapter;

#[cfg(test)]
mod tests {
    use super::*;
    use audit_core::scanner::ScannerKind;

    #[test]
    fn test_default_provider_covers_all_kinds() {
        let provider = DefaultAdapterProvider::new();
        for kind in ScannerKind::all() {
            assert_eq!(provider.adapter(kind).kind(), kind);
        }
    }
}
