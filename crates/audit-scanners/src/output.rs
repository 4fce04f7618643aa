//! Raw scanner output and the adapter failure taxonomy

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Classification of an adapter failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Missing API key, binary not found, unusable setup
    Configuration,
    /// The adapter's own deadline elapsed
    Timeout,
    /// Network failure, broken pipe, transient exit code
    Transport,
    /// Output produced but unparseable
    Protocol,
}

impl FailureKind {
    /// Default retryability of this failure class.
    ///
    /// Timeouts are non-retryable at the adapter level; a caller that
    /// wants another attempt schedules a new run.
    pub fn default_retryable(&self) -> bool {
        matches!(self, FailureKind::Transport)
    }
}

/// A failed scanner run
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct ScanFailure {
    /// Failure classification
    pub kind: FailureKind,
    /// Diagnostic message (logs and artifacts only, never shown to clients)
    pub message: String,
    /// Whether the adapter may retry this failure
    pub retryable: bool,
}

impl ScanFailure {
    /// Build a failure with the kind's default retryability
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.default_retryable(),
        }
    }

    /// Missing key, missing binary or other setup problem
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Configuration, message)
    }

    /// Deadline exceeded after `timeout_ms`
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("scanner timed out after {timeout_ms}ms"),
        )
    }

    /// Network or subprocess transport problem
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, message)
    }

    /// Output was produced but could not be parsed
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Protocol, message)
    }

    /// The scan was cancelled while this run was in flight
    pub fn cancelled() -> Self {
        Self {
            kind: FailureKind::Transport,
            message: "scan cancelled".to_string(),
            retryable: false,
        }
    }

    /// Override the retryable flag
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Coarse-grained reason string exposed to clients
    pub fn client_reason(&self) -> &'static str {
        match self.kind {
            FailureKind::Timeout => "timeout",
            FailureKind::Configuration | FailureKind::Transport | FailureKind::Protocol => {
                "scanner_unavailable"
            }
        }
    }
}

/// One scanner's raw result for one page.
///
/// The payload is an opaque JSON tree in the scanner's own schema; only
/// the normalizer interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum RawScanOutput {
    /// The scanner produced output
    Success {
        /// Scanner-specific JSON payload
        payload: Value,
    },
    /// The run failed
    Failure {
        /// Failure details
        failure: ScanFailure,
    },
}

impl RawScanOutput {
    /// Wrap a payload
    pub fn success(payload: Value) -> Self {
        RawScanOutput::Success { payload }
    }

    /// Wrap a failure
    pub fn failure(failure: ScanFailure) -> Self {
        RawScanOutput::Failure { failure }
    }

    /// Whether this run produced usable output
    pub fn is_success(&self) -> bool {
        matches!(self, RawScanOutput::Success { .. })
    }

    /// The failure, if any
    pub fn as_failure(&self) -> Option<&ScanFailure> {
        match self {
            RawScanOutput::Failure { failure } => Some(failure),
            RawScanOutput::Success { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retryability() {
        assert!(ScanFailure::transport("reset").retryable);
        assert!(!ScanFailure::timeout(5000).retryable);
        assert!(!ScanFailure::configuration("no key").retryable);
        assert!(!ScanFailure::protocol("bad json").retryable);
    }

    #[test]
    fn test_client_reasons() {
        assert_eq!(ScanFailure::timeout(100).client_reason(), "timeout");
        assert_eq!(ScanFailure::transport("x").client_reason(), "scanner_unavailable");
        assert_eq!(ScanFailure::cancelled().client_reason(), "scanner_unavailable");
    }

    #[test]
    fn test_output_accessors() {
        let ok = RawScanOutput::success(serde_json::json!({"issues": []}));
        assert!(ok.is_success());
        assert!(ok.as_failure().is_none());

        let failed = RawScanOutput::failure(ScanFailure::timeout(100));
        assert!(!failed.is_success());
        assert_eq!(failed.as_failure().unwrap().kind, FailureKind::Timeout);
    }
}
