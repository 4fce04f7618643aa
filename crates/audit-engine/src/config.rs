//! Engine configuration

use std::path::PathBuf;
use std::time::Duration;

/// Tunables for the scan engine. Every concurrency bound from the
/// resource model lives here so deployments can size the engine without
/// touching code.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Admission limit on concurrently active scans
    pub max_concurrent_scans: usize,
    /// Pages scanned concurrently within one scan (1 = sequential, the
    /// polite default towards the target host)
    pub page_concurrency: usize,
    /// Scanners run concurrently on one page; `None` means all enabled
    pub scanner_concurrency: Option<usize>,
    /// Adapter retry budget for retryable failures
    pub max_retries: u32,
    /// WAVE API key, when configured
    pub wave_api_key: Option<String>,
    /// Concurrent fetches during page discovery
    pub discovery_concurrency: usize,
    /// Per-fetch timeout during discovery
    pub discovery_fetch_timeout: Duration,
    /// Wall-clock budget for the whole discovery phase
    pub discovery_phase_timeout: Duration,
    /// Events retained per scan for late subscribers
    pub event_history_limit: usize,
    /// Pending events per subscriber before it is dropped with an overrun
    pub subscriber_queue_bound: usize,
    /// How long a closed scan's event history stays available
    pub history_retention: Duration,
    /// How long terminal scan states stay in the registry
    pub state_retention: Duration,
    /// Grace period for in-flight adapters after cancellation
    pub cancel_grace: Duration,
    /// Allow loopback and private scan targets (test deployments)
    pub allow_local_targets: bool,
    /// Root directory for scan artifacts; `None` disables artifact writes
    pub output_root: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_scans: 10,
            page_concurrency: 1,
            scanner_concurrency: None,
            max_retries: 2,
            wave_api_key: None,
            discovery_concurrency: 5,
            discovery_fetch_timeout: Duration::from_secs(10),
            discovery_phase_timeout: Duration::from_secs(60),
            event_history_limit: 500,
            subscriber_queue_bound: 100,
            history_retention: Duration::from_secs(30 * 60),
            state_retention: Duration::from_secs(60 * 60),
            cancel_grace: Duration::from_secs(5),
            allow_local_targets: false,
            output_root: None,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden from the environment.
    ///
    /// Recognized variables: `AUDIT_MAX_CONCURRENT_SCANS`,
    /// `AUDIT_OUTPUT_DIR`, `AUDIT_ALLOW_LOCAL`, `WAVE_API_KEY`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(n) = env_parse::<usize>("AUDIT_MAX_CONCURRENT_SCANS") {
            config.max_concurrent_scans = n.max(1);
        }
        if let Ok(dir) = std::env::var("AUDIT_OUTPUT_DIR") {
            if !dir.is_empty() {
                config.output_root = Some(PathBuf::from(dir));
            }
        }
        if let Ok(v) = std::env::var("AUDIT_ALLOW_LOCAL") {
            config.allow_local_targets =
                matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Ok(key) = std::env::var("WAVE_API_KEY") {
            if !key.is_empty() {
                config.wave_api_key = Some(key);
            }
        }

        config
    }

    /// Scanner concurrency for a page with `enabled` scanners
    pub fn scanner_concurrency_for(&self, enabled: usize) -> usize {
        self.scanner_concurrency.unwrap_or(enabled).max(1)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_resource_model() {
        let config = EngineConfig::default();
        assert_eq!(config.max_concurrent_scans, 10);
        assert_eq!(config.page_concurrency, 1);
        assert_eq!(config.discovery_concurrency, 5);
        assert_eq!(config.subscriber_queue_bound, 100);
        assert_eq!(config.event_history_limit, 500);
        assert_eq!(config.cancel_grace, Duration::from_secs(5));
    }

    #[test]
    fn test_scanner_concurrency_fallback() {
        let mut config = EngineConfig::default();
        assert_eq!(config.scanner_concurrency_for(4), 4);
        config.scanner_concurrency = Some(2);
        assert_eq!(config.scanner_concurrency_for(4), 2);
        config.scanner_concurrency = Some(0);
        assert_eq!(config.scanner_concurrency_for(4), 1);
    }
}
