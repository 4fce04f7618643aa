//! Pa11y CLI adapter

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use audit_core::page::PageRef;
use audit_core::request::ScanMode;
use audit_core::scanner::ScannerKind;

use crate::adapter::{AdapterConfig, ScannerAdapter};
use crate::output::RawScanOutput;
use crate::retry::{run_with_retries, RetryPolicy};
use crate::simulate::simulated_payload;
use crate::subprocess::run_json_command;

// Pa11y exits 0 when the page is clean and 2 when it found issues; both
// carry valid JSON on stdout.
const OK_EXIT_CODES: &[i32] = &[0, 2];

/// Adapter for the Pa11y command-line scanner
pub struct Pa11yAdapter {
    program: String,
}

impl Pa11yAdapter {
    /// Adapter invoking the `pa11y` binary from PATH
    pub fn new() -> Self {
        Self {
            program: "pa11y".to_string(),
        }
    }

    /// Adapter invoking a specific binary (used by packaged installs)
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn attempt(
        &self,
        page: &PageRef,
        cfg: &AdapterConfig,
        cancel: &CancellationToken,
    ) -> RawScanOutput {
        let args = [
            "--reporter",
            "json",
            "--standard",
            "WCAG2AA",
            page.url.as_str(),
        ];
        match run_json_command(&self.program, &args, cfg.timeout(), OK_EXIT_CODES, cancel).await {
            Ok(payload) => RawScanOutput::success(payload),
            Err(failure) => RawScanOutput::failure(failure),
        }
    }
}

impl Default for Pa11yAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScannerAdapter for Pa11yAdapter {
    fn kind(&self) -> ScannerKind {
        ScannerKind::Pa11y
    }

    async fn scan(
        &self,
        page: &PageRef,
        cfg: &AdapterConfig,
        cancel: &CancellationToken,
    ) -> RawScanOutput {
        if cfg.mode == ScanMode::Simulate {
            return RawScanOutput::success(simulated_payload(ScannerKind::Pa11y, &page.url));
        }

        let policy = RetryPolicy::with_retries(cfg.max_retries);
        run_with_retries(policy, cancel, |_| self.attempt(page, cfg, cancel)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulate_mode_is_offline() {
        let adapter = Pa11yAdapter::new();
        let cfg = AdapterConfig {
            mode: ScanMode::Simulate,
            ..AdapterConfig::default()
        };
        let out = adapter
            .scan(&PageRef::seed("https://simulate.local/home"), &cfg, &CancellationToken::new())
            .await;
        assert!(out.is_success());
    }
}
