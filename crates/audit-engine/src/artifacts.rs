//! Best-effort scan artifacts on disk
//!
//! Everything written here is diagnostic material, not authoritative
//! state: a failed write is logged and the scan carries on.

use serde_json::Value;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use audit_core::result::ScanResult;
use audit_core::scanner::ScannerKind;

use crate::events::Subscription;

/// Writer for one scan's artifact directory
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    /// Writer rooted at `<root>/eaa_<scan_id>`
    pub fn new(root: &Path, scan_id: Uuid) -> Self {
        Self {
            dir: root.join(format!("eaa_{scan_id}")),
        }
    }

    /// The scan's artifact directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the final `summary.json`
    pub async fn write_summary(&self, result: &ScanResult) {
        let path = self.dir.join("summary.json");
        match serde_json::to_vec_pretty(result) {
            Ok(bytes) => self.write_file(&path, &bytes).await,
            Err(e) => tracing::warn!(error = %e, "failed to serialize scan summary"),
        }
    }

    /// Write one scanner's raw payload for one page, as
    /// `page_<n>/<scanner>.json`
    pub async fn write_raw(&self, page_index: usize, kind: ScannerKind, payload: &Value) {
        let path = self
            .dir
            .join(format!("page_{}", page_index + 1))
            .join(format!("{}.json", kind.as_str()));
        match serde_json::to_vec_pretty(payload) {
            Ok(bytes) => self.write_file(&path, &bytes).await,
            Err(e) => tracing::warn!(error = %e, "failed to serialize raw scanner output"),
        }
    }

    /// Drain an event subscription into `events.ndjson`, one JSON object
    /// per line. Runs until the stream ends.
    pub async fn run_event_log(&self, mut subscription: Subscription) {
        let path = self.dir.join("events.ndjson");
        let mut lines = Vec::new();
        while let Some(event) = subscription.recv().await {
            if let Ok(line) = serde_json::to_string(&event) {
                lines.push(line);
                // Flush in small batches so a crash loses little.
                if lines.len() >= 16 {
                    self.append_lines(&path, &mut lines).await;
                }
            }
        }
        self.append_lines(&path, &mut lines).await;
    }

    async fn append_lines(&self, path: &Path, lines: &mut Vec<String>) {
        if lines.is_empty() {
            return;
        }
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            tracing::warn!(error = %e, "failed to create artifact directory");
            lines.clear();
            return;
        }
        let mut payload = lines.join("\n");
        payload.push('\n');
        lines.clear();

        use tokio::io::AsyncWriteExt;
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await;
        match file {
            Ok(mut f) => {
                if let Err(e) = f.write_all(payload.as_bytes()).await {
                    tracing::warn!(error = %e, "failed to append event log");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to open event log"),
        }
    }

    async fn write_file(&self, path: &Path, bytes: &[u8]) {
        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!(error = %e, path = %path.display(), "failed to create artifact directory");
                return;
            }
        }
        if let Err(e) = tokio::fs::write(path, bytes).await {
            tracing::warn!(error = %e, path = %path.display(), "failed to write artifact");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_raw_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let scan_id = Uuid::new_v4();
        let writer = ArtifactWriter::new(tmp.path(), scan_id);

        writer.write_raw(0, ScannerKind::Wave, &json!({"ok": true})).await;
        writer.write_raw(1, ScannerKind::Axe, &json!({"ok": true})).await;

        assert!(writer.dir().join("page_1").join("wave.json").exists());
        assert!(writer.dir().join("page_2").join("axe.json").exists());
    }

    #[tokio::test]
    async fn test_failed_write_is_not_fatal() {
        // Root under a path that cannot be created.
        let writer = ArtifactWriter::new(Path::new("/dev/null/nope"), Uuid::new_v4());
        writer.write_raw(0, ScannerKind::Wave, &json!({})).await;
    }
}
