//! Shared subprocess plumbing for the CLI-based scanners

use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::output::ScanFailure;

/// Run a scanner CLI and parse its stdout as JSON.
///
/// The contract with every CLI scanner is the same: URL on the command
/// line, JSON on stdout. `ok_exit_codes` lists the codes that still carry
/// valid output (Pa11y exits 2 when it finds issues). The child is killed
/// when the deadline elapses or the scan is cancelled.
pub async fn run_json_command(
    program: &str,
    args: &[&str],
    timeout: Duration,
    ok_exit_codes: &[i32],
    cancel: &CancellationToken,
) -> Result<Value, ScanFailure> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ScanFailure::configuration(format!("{program} binary not found"))
        } else {
            ScanFailure::transport(format!("failed to spawn {program}: {e}"))
        }
    })?;

    // Dropping the wait future drops the child handle, which kills the
    // process because of kill_on_drop.
    let output = tokio::select! {
        out = child.wait_with_output() => {
            out.map_err(|e| ScanFailure::transport(format!("{program} wait failed: {e}")))?
        }
        _ = tokio::time::sleep(timeout) => {
            return Err(ScanFailure::timeout(timeout.as_millis() as u64));
        }
        _ = cancel.cancelled() => {
            return Err(ScanFailure::cancelled());
        }
    };

    let code = output.status.code().unwrap_or(-1);
    if !ok_exit_codes.contains(&code) {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ScanFailure::transport(format!(
            "{program} exited with code {code}: {}",
            stderr.trim().chars().take(400).collect::<String>()
        )));
    }

    serde_json::from_slice(&output.stdout)
        .map_err(|e| ScanFailure::protocol(format!("{program} produced unparseable JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::FailureKind;

    #[tokio::test]
    async fn test_missing_binary_is_configuration_error() {
        let cancel = CancellationToken::new();
        let err = run_json_command(
            "definitely-not-a-real-scanner-binary",
            &["https://example.com"],
            Duration::from_secs(1),
            &[0],
            &cancel,
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind, FailureKind::Configuration);
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn test_cancelled_before_run() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        // `sleep` exists everywhere the test suite runs; stdout is not JSON
        // but cancellation fires before the child gets that far.
        let err = run_json_command("sleep", &["5"], Duration::from_secs(10), &[0], &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.message, "scan cancelled");
    }

    #[tokio::test]
    async fn test_deadline_kills_child() {
        let cancel = CancellationToken::new();
        let err = run_json_command("sleep", &["5"], Duration::from_millis(50), &[0], &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::Timeout);
    }

    #[tokio::test]
    async fn test_unparseable_stdout_is_protocol_error() {
        let cancel = CancellationToken::new();
        let err = run_json_command("echo", &["not json"], Duration::from_secs(5), &[0], &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::Protocol);
    }

    #[tokio::test]
    async fn test_valid_json_passes_through() {
        let cancel = CancellationToken::new();
        let value = run_json_command(
            "echo",
            &["{\"issues\":[]}"],
            Duration::from_secs(5),
            &[0],
            &cancel,
        )
        .await
        .unwrap();
        assert!(value.get("issues").is_some());
    }
}
