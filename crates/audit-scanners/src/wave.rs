//! WAVE (WebAIM) HTTP API adapter

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use audit_core::page::PageRef;
use audit_core::request::ScanMode;
use audit_core::scanner::ScannerKind;

use crate::adapter::{AdapterConfig, ScannerAdapter};
use crate::output::{RawScanOutput, ScanFailure};
use crate::retry::{run_with_retries, RetryPolicy};
use crate::simulate::simulated_payload;

const WAVE_ENDPOINT: &str = "https://wave.webaim.org/api/request";

/// Adapter for the WAVE remote API. The only scanner that needs an API
/// key; everything else about it is a plain JSON-over-HTTPS call.
pub struct WaveAdapter {
    client: reqwest::Client,
}

impl WaveAdapter {
    /// Build the adapter with a shared HTTP client
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn attempt(
        &self,
        page: &PageRef,
        cfg: &AdapterConfig,
        api_key: &str,
        cancel: &CancellationToken,
    ) -> RawScanOutput {
        let request = self
            .client
            .get(WAVE_ENDPOINT)
            .query(&[("key", api_key), ("url", page.url.as_str()), ("reporttype", "4")])
            .timeout(cfg.timeout());

        let response = tokio::select! {
            res = request.send() => res,
            _ = cancel.cancelled() => {
                return RawScanOutput::failure(ScanFailure::cancelled());
            }
        };

        let response = match response {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return RawScanOutput::failure(ScanFailure::timeout(cfg.timeout_ms));
            }
            Err(e) => {
                return RawScanOutput::failure(ScanFailure::transport(format!(
                    "WAVE request failed: {e}"
                )));
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return RawScanOutput::failure(ScanFailure::configuration(format!(
                "WAVE rejected the API key (HTTP {status})"
            )));
        }
        if !status.is_success() {
            return RawScanOutput::failure(ScanFailure::transport(format!(
                "WAVE returned HTTP {status}"
            )));
        }

        match response.json::<serde_json::Value>().await {
            Ok(payload) => RawScanOutput::success(payload),
            Err(e) => RawScanOutput::failure(ScanFailure::protocol(format!(
                "WAVE response was not valid JSON: {e}"
            ))),
        }
    }
}

impl Default for WaveAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScannerAdapter for WaveAdapter {
    fn kind(&self) -> ScannerKind {
        ScannerKind::Wave
    }

    async fn scan(
        &self,
        page: &PageRef,
        cfg: &AdapterConfig,
        cancel: &CancellationToken,
    ) -> RawScanOutput {
        if cfg.mode == ScanMode::Simulate {
            return RawScanOutput::success(simulated_payload(ScannerKind::Wave, &page.url));
        }

        let api_key = match cfg.wave_api_key.as_deref() {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => {
                return RawScanOutput::failure(ScanFailure::configuration(
                    "WAVE API key is not configured",
                ));
            }
        };

        let policy = RetryPolicy::with_retries(cfg.max_retries);
        run_with_retries(policy, cancel, |attempt| {
            if attempt > 0 {
                tracing::debug!(url = %page.url, attempt, "retrying WAVE scan");
            }
            self.attempt(page, cfg, &api_key, cancel)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::FailureKind;

    fn config(mode: ScanMode, key: Option<&str>) -> AdapterConfig {
        AdapterConfig {
            timeout_ms: 5_000,
            max_retries: 0,
            mode,
            wave_api_key: key.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_simulate_mode_is_offline() {
        let adapter = WaveAdapter::new();
        let page = PageRef::seed("https://simulate.local/home");
        let out = adapter
            .scan(&page, &config(ScanMode::Simulate, None), &CancellationToken::new())
            .await;
        assert!(out.is_success());
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let adapter = WaveAdapter::new();
        let page = PageRef::seed("https://example.com/");
        let out = adapter
            .scan(&page, &config(ScanMode::Real, None), &CancellationToken::new())
            .await;
        assert_eq!(out.as_failure().unwrap().kind, FailureKind::Configuration);
    }
}
