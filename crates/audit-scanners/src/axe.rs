//! axe-core CLI adapter

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

/// Adapter for the `@axe-core/cli` command-line scanner
pub struct AxeAdapter {
    program: String,
}

impl AxeAdapter {
    /// Adapter invoking the `axe` binary from PATH
    pub fn new() -> Self {
        Self {
            program: "axe".to_string(),
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
            page.url.as_str(),
            "--stdout",
            "--tags",
            "wcag2a,wcag2aa",
            "--chrome-options",
            "headless,no-sandbox",
        ];
        match run_json_command(&self.program, &args, cfg.timeout(), &[0], cancel).await {
            Ok(payload) => RawScanOutput::success(payload),
            Err(failure) => RawScanOutput::failure(failure),
        }
    }
}

impl Default for AxeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScannerAdapter for AxeAdapter {
    fn kind(&self) -> ScannerKind {
        ScannerKind::Axe
    }

    async fn scan(
        &self,
        page: &PageRef,
        cfg: &AdapterConfig,
        cancel: &CancellationToken,
    ) -> RawScanOutput {
        if cfg.mode == ScanMode::Simulate {
            return RawScanOutput::success(simulated_payload(ScannerKind::Axe, &page.url));
        }

        let policy = RetryPolicy::with_retries(cfg.max_retries);
        run_with_retries(policy, cancel, |_| self.attempt(page, cfg, cancel)).await
    }
}
