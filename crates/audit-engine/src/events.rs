//! Per-scan event bus with bounded history and replay
//!
//! One producer per scan, any number of subscribers. Sequence numbers
//! are assigned under the topic lock, so every subscriber observes the
//! same strictly increasing `1, 2, 3, ...` sequence. Slow consumers are
//! dropped with an overrun flag rather than ever blocking the producer.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

use audit_core::result::{ComplianceMetrics, PageResult};
use audit_core::scanner::ScannerKind;

/// One event on a scan's stream, in wire shape
/// `{scan_id, seq, ts, type, payload}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEvent {
    /// The scan this event belongs to
    pub scan_id: Uuid,
    /// Monotonic 1-based sequence number, per scan
    pub seq: u64,
    /// Wall-clock timestamp
    pub ts: DateTime<Utc>,
    /// Event type and payload
    #[serde(flatten)]
    pub kind: ScanEventKind,
}

/// The event variants emitted over a scan's lifetime
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ScanEventKind {
    /// The scan moved to Running
    ScanStarted {
        /// Target URL
        url: String,
    },
    /// Scanning of one page began
    PageStarted {
        /// Normalized page URL
        url: String,
        /// 1-based page index
        index: usize,
        /// Total pages in this scan
        total: usize,
    },
    /// One scanner was dispatched against one page
    ScannerStarted {
        /// Page URL
        page: String,
        /// Scanner
        scanner: ScannerKind,
    },
    /// Mid-run progress for one scanner
    ScannerProgress {
        /// Page URL
        page: String,
        /// Scanner
        scanner: ScannerKind,
        /// Progress percent for this scanner run
        percent: u8,
    },
    /// A scanner run finished with usable output
    ScannerCompleted {
        /// Page URL
        page: String,
        /// Scanner
        scanner: ScannerKind,
        /// Violations found after normalization
        violations: usize,
        /// Run duration
        elapsed_ms: u64,
    },
    /// A scanner run failed; the scan continues
    ScannerFailed {
        /// Page URL
        page: String,
        /// Scanner
        scanner: ScannerKind,
        /// Coarse failure reason
        reason: String,
        /// Whether the failure indicates a setup problem that will
        /// affect every page
        critical: bool,
    },
    /// All pages done, aggregation began
    AggregationStarted,
    /// Terminal: the scan completed with a usable result
    ScanCompleted {
        /// Final metrics
        metrics: ComplianceMetrics,
    },
    /// Terminal: the scan failed
    ScanFailed {
        /// Coarse failure reason
        reason: String,
    },
    /// Terminal: the scan was cancelled
    ScanCancelled {
        /// Page results collected before cancellation, for diagnostics
        partial: Vec<PageResult>,
    },
}

impl ScanEventKind {
    /// Stable wire name of this variant
    pub fn event_type(&self) -> &'static str {
        match self {
            ScanEventKind::ScanStarted { .. } => "scan_started",
            ScanEventKind::PageStarted { .. } => "page_started",
            ScanEventKind::ScannerStarted { .. } => "scanner_started",
            ScanEventKind::ScannerProgress { .. } => "scanner_progress",
            ScanEventKind::ScannerCompleted { .. } => "scanner_completed",
            ScanEventKind::ScannerFailed { .. } => "scanner_failed",
            ScanEventKind::AggregationStarted => "aggregation_started",
            ScanEventKind::ScanCompleted { .. } => "scan_completed",
            ScanEventKind::ScanFailed { .. } => "scan_failed",
            ScanEventKind::ScanCancelled { .. } => "scan_cancelled",
        }
    }

    /// Whether this variant terminates the scan's stream
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanEventKind::ScanCompleted { .. }
                | ScanEventKind::ScanFailed { .. }
                | ScanEventKind::ScanCancelled { .. }
        )
    }
}

struct SubscriberSlot {
    tx: mpsc::Sender<ScanEvent>,
    overrun: Arc<AtomicBool>,
}

struct Topic {
    seq: u64,
    history: VecDeque<ScanEvent>,
    subscribers: Vec<SubscriberSlot>,
    closed_at: Option<Instant>,
}

impl Topic {
    fn new() -> Self {
        Self {
            seq: 0,
            history: VecDeque::new(),
            subscribers: Vec::new(),
            closed_at: None,
        }
    }
}

/// Handle for consuming one scan's event stream.
///
/// Replayed history is delivered before live events; both sides observe
/// the same sequence numbers.
pub struct Subscription {
    backlog: VecDeque<ScanEvent>,
    rx: mpsc::Receiver<ScanEvent>,
    overrun: Arc<AtomicBool>,
}

impl Subscription {
    /// Receive the next event. `None` means the stream is closed (or
    /// this subscriber was dropped for falling behind).
    pub async fn recv(&mut self) -> Option<ScanEvent> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }
        self.rx.recv().await
    }

    /// Non-blocking receive
    pub fn try_recv(&mut self) -> Option<ScanEvent> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }
        self.rx.try_recv().ok()
    }

    /// Whether this subscriber was dropped because its queue overran
    pub fn is_overrun(&self) -> bool {
        self.overrun.load(Ordering::Relaxed)
    }
}

/// Per-scan publish/subscribe with bounded history
pub struct EventBus {
    topics: DashMap<Uuid, Arc<Mutex<Topic>>>,
    history_limit: usize,
    queue_bound: usize,
    retention: Duration,
}

impl EventBus {
    /// Bus with the given history bound, per-subscriber queue bound and
    /// post-close history retention
    pub fn new(history_limit: usize, queue_bound: usize, retention: Duration) -> Self {
        Self {
            topics: DashMap::new(),
            history_limit,
            queue_bound,
            retention,
        }
    }

    fn topic(&self, scan_id: Uuid) -> Arc<Mutex<Topic>> {
        self.topics
            .entry(scan_id)
            .or_insert_with(|| Arc::new(Mutex::new(Topic::new())))
            .clone()
    }

    /// Publish an event on a scan's stream. Never blocks: a subscriber
    /// whose queue is full is marked overrun and dropped. Returns the
    /// assigned sequence number.
    pub fn publish(&self, scan_id: Uuid, kind: ScanEventKind) -> u64 {
        let topic = self.topic(scan_id);
        let mut topic = topic.lock();

        topic.seq += 1;
        let event = ScanEvent {
            scan_id,
            seq: topic.seq,
            ts: Utc::now(),
            kind,
        };

        topic.history.push_back(event.clone());
        while topic.history.len() > self.history_limit {
            topic.history.pop_front();
        }

        topic.subscribers.retain(|slot| match slot.tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                slot.overrun.store(true, Ordering::Relaxed);
                tracing::warn!(scan_id = %scan_id, "dropping slow event subscriber");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });

        event.seq
    }

    /// Subscribe to a scan's stream starting after `since_seq`.
    ///
    /// Retained history with `seq > since_seq` is replayed first. On a
    /// closed topic the subscription yields the remaining history and
    /// then ends.
    pub fn subscribe(&self, scan_id: Uuid, since_seq: u64) -> Subscription {
        let topic = self.topic(scan_id);
        let mut topic = topic.lock();

        let backlog: VecDeque<ScanEvent> = topic
            .history
            .iter()
            .filter(|e| e.seq > since_seq)
            .cloned()
            .collect();

        let (tx, rx) = mpsc::channel(self.queue_bound.max(1));
        let overrun = Arc::new(AtomicBool::new(false));
        if topic.closed_at.is_none() {
            topic.subscribers.push(SubscriberSlot {
                tx,
                overrun: Arc::clone(&overrun),
            });
        }
        // On a closed topic tx is dropped here and recv() ends after the
        // backlog drains.

        Subscription { backlog, rx, overrun }
    }

    /// Latest sequence number assigned for a scan
    pub fn latest_seq(&self, scan_id: Uuid) -> u64 {
        self.topics
            .get(&scan_id)
            .map(|topic| topic.lock().seq)
            .unwrap_or(0)
    }

    /// Drop a scan's subscribers; history stays available for the
    /// retention window
    pub fn close(&self, scan_id: Uuid) {
        if let Some(topic) = self.topics.get(&scan_id) {
            let mut topic = topic.lock();
            topic.subscribers.clear();
            topic.closed_at = Some(Instant::now());
        }
    }

    /// Evict closed topics past their retention window; returns how many
    /// were removed
    pub fn sweep(&self) -> usize {
        let before = self.topics.len();
        let retention = self.retention;
        self.topics.retain(|_, topic| {
            let topic = topic.lock();
            match topic.closed_at {
                Some(closed) => closed.elapsed() < retention,
                None => true,
            }
        });
        before - self.topics.len()
    }

    /// Number of live topics
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(500, 100, Duration::from_secs(30 * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(i: usize) -> ScanEventKind {
        ScanEventKind::ScannerProgress {
            page: "https://example.com/".to_string(),
            scanner: ScannerKind::Axe,
            percent: i as u8,
        }
    }

    #[tokio::test]
    async fn test_sequence_is_contiguous() {
        let bus = EventBus::default();
        let scan_id = Uuid::new_v4();
        let mut sub = bus.subscribe(scan_id, 0);

        for i in 1..=5 {
            assert_eq!(bus.publish(scan_id, kind(i)), i as u64);
        }
        for expected in 1..=5u64 {
            assert_eq!(sub.recv().await.unwrap().seq, expected);
        }
    }

    #[tokio::test]
    async fn test_replay_then_live() {
        let bus = EventBus::default();
        let scan_id = Uuid::new_v4();

        for i in 1..=4 {
            bus.publish(scan_id, kind(i));
        }
        let mut sub = bus.subscribe(scan_id, 2);
        bus.publish(scan_id, kind(5));

        let seqs: Vec<u64> = vec![
            sub.recv().await.unwrap().seq,
            sub.recv().await.unwrap().seq,
            sub.recv().await.unwrap().seq,
        ];
        assert_eq!(seqs, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn test_two_subscribers_see_identical_sequences() {
        let bus = EventBus::default();
        let scan_id = Uuid::new_v4();
        let mut a = bus.subscribe(scan_id, 0);
        let mut b = bus.subscribe(scan_id, 0);

        for i in 1..=3 {
            bus.publish(scan_id, kind(i));
        }
        for expected in 1..=3u64 {
            assert_eq!(a.recv().await.unwrap().seq, expected);
            assert_eq!(b.recv().await.unwrap().seq, expected);
        }
    }

    #[tokio::test]
    async fn test_history_bound() {
        let bus = EventBus::new(3, 100, Duration::from_secs(60));
        let scan_id = Uuid::new_v4();
        for i in 1..=10 {
            bus.publish(scan_id, kind(i));
        }
        let mut sub = bus.subscribe(scan_id, 0);
        // Only the last three events are retained.
        assert_eq!(sub.try_recv().unwrap().seq, 8);
        assert_eq!(sub.try_recv().unwrap().seq, 9);
        assert_eq!(sub.try_recv().unwrap().seq, 10);
    }

    #[tokio::test]
    async fn test_slow_subscriber_is_dropped_with_overrun() {
        let bus = EventBus::new(500, 2, Duration::from_secs(60));
        let scan_id = Uuid::new_v4();
        let mut sub = bus.subscribe(scan_id, 0);

        for i in 1..=10 {
            bus.publish(scan_id, kind(i));
        }

        // The queue held 2 events; the third publish dropped the
        // subscriber.
        assert!(sub.try_recv().is_some());
        assert!(sub.try_recv().is_some());
        assert!(sub.recv().await.is_none());
        assert!(sub.is_overrun());
    }

    #[tokio::test]
    async fn test_closed_topic_still_replays_history() {
        let bus = EventBus::default();
        let scan_id = Uuid::new_v4();
        for i in 1..=3 {
            bus.publish(scan_id, kind(i));
        }
        bus.close(scan_id);

        let mut sub = bus.subscribe(scan_id, 0);
        assert_eq!(sub.recv().await.unwrap().seq, 1);
        assert_eq!(sub.recv().await.unwrap().seq, 2);
        assert_eq!(sub.recv().await.unwrap().seq, 3);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_sweep_honors_retention() {
        let bus = EventBus::new(500, 100, Duration::from_secs(0));
        let scan_id = Uuid::new_v4();
        bus.publish(scan_id, kind(1));
        assert_eq!(bus.sweep(), 0);

        bus.close(scan_id);
        assert_eq!(bus.sweep(), 1);
        assert_eq!(bus.topic_count(), 0);
    }

    #[test]
    fn test_wire_shape() {
        let event = ScanEvent {
            scan_id: Uuid::nil(),
            seq: 7,
            ts: Utc::now(),
            kind: ScanEventKind::ScannerFailed {
                page: "https://example.com/".to_string(),
                scanner: ScannerKind::Pa11y,
                reason: "timeout".to_string(),
                critical: false,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["seq"], 7);
        assert_eq!(json["type"], "scanner_failed");
        assert_eq!(json["payload"]["scanner"], "pa11y");
        assert_eq!(json["payload"]["reason"], "timeout");

        let unit = serde_json::to_value(ScanEventKind::AggregationStarted).unwrap();
        assert_eq!(unit["type"], "aggregation_started");
    }
}
