//! Per-turn activity recording and streaming
//!
//! Every internal step of a turn (embedding, SQL, delegation, tool call)
//! is recorded as a typed, timestamped event. The recorder keeps the
//! ordered trace for the turn and mirrors each event into a broadcast
//! channel so the outer transport can push them to clients as they happen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Process-wide event id counter; ids are strictly increasing across all
/// turns, which makes them a usable tie-break for simultaneous completions.
static NEXT_EVENT_ID: AtomicU64 = AtomicU64::new(1);

/// Closed set of activity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Reasoning,
    Delegation,
    Embedding,
    Search,
    Database,
    Mcp,
    Inventory,
    Order,
    ToolCall,
    Result,
    Error,
}

/// One entry in the per-turn execution log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Strictly increasing id (process-wide counter)
    pub id: u64,

    /// Turn this event belongs to, for multiplexed consumers
    pub turn_id: Uuid,

    /// Wall-clock completion time
    pub timestamp: DateTime<Utc>,

    pub kind: ActivityKind,
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_location: Option<String>,
}

impl ActivityEvent {
    /// Create a draft event; id, turn id, and timestamp are assigned when
    /// the event is recorded.
    pub fn new(kind: ActivityKind, title: impl Into<String>) -> Self {
        Self {
            id: 0,
            turn_id: Uuid::nil(),
            timestamp: Utc::now(),
            kind,
            title: title.into(),
            details: None,
            sql_text: None,
            latency_ms: None,
            worker_name: None,
            source_location: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql_text = Some(sql.into());
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    pub fn with_worker(mut self, worker: impl Into<String>) -> Self {
        self.worker_name = Some(worker.into());
        self
    }

    pub fn with_source(mut self, location: impl Into<String>) -> Self {
        self.source_location = Some(location.into());
        self
    }
}

/// Per-turn recorder handle
///
/// Cheap to clone; every worker involved in a turn gets a clone. Events are
/// appended in completion order; the id counter breaks ties among
/// simultaneous completions.
#[derive(Clone)]
pub struct ActivityRecorder {
    turn_id: Uuid,
    events: Arc<Mutex<Vec<ActivityEvent>>>,
    sink: broadcast::Sender<ActivityEvent>,
}

impl ActivityRecorder {
    /// Create a recorder with its own streaming channel
    pub fn new(turn_id: Uuid) -> Self {
        let (sink, _rx) = broadcast::channel(256);
        Self {
            turn_id,
            events: Arc::new(Mutex::new(Vec::new())),
            sink,
        }
    }

    /// Create a recorder that mirrors events into an existing sink
    /// (the orchestrator's process-wide broadcaster).
    pub fn with_sink(turn_id: Uuid, sink: broadcast::Sender<ActivityEvent>) -> Self {
        Self {
            turn_id,
            events: Arc::new(Mutex::new(Vec::new())),
            sink,
        }
    }

    pub fn turn_id(&self) -> Uuid {
        self.turn_id
    }

    /// Record an event: assigns id, turn id, and completion timestamp,
    /// appends to the trace, and pushes to the streaming sink. The sink is
    /// a broadcast channel, so a slow subscriber lags rather than stalling
    /// the turn.
    pub fn record(&self, mut event: ActivityEvent) {
        event.id = NEXT_EVENT_ID.fetch_add(1, Ordering::SeqCst);
        event.turn_id = self.turn_id;
        event.timestamp = Utc::now();

        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }

        // No subscribers is not an error
        let _ = self.sink.send(event);
    }

    /// Take the ordered trace and reset the recorder
    pub fn take(&self) -> Vec<ActivityEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(_) => Vec::new(),
        }
    }

    /// Current number of recorded events
    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe to the streaming view of this recorder's events
    pub fn subscribe(&self) -> broadcast::Receiver<ActivityEvent> {
        self.sink.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_strictly_increase() {
        let recorder = ActivityRecorder::new(Uuid::new_v4());
        for i in 0..10 {
            recorder.record(ActivityEvent::new(
                ActivityKind::Search,
                format!("step {}", i),
            ));
        }

        let trace = recorder.take();
        assert_eq!(trace.len(), 10);
        for pair in trace.windows(2) {
            assert!(pair[0].id < pair[1].id);
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
    }

    #[test]
    fn test_take_resets() {
        let recorder = ActivityRecorder::new(Uuid::new_v4());
        recorder.record(ActivityEvent::new(ActivityKind::Database, "query"));
        assert_eq!(recorder.take().len(), 1);
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_events_carry_turn_id() {
        let turn_id = Uuid::new_v4();
        let recorder = ActivityRecorder::new(turn_id);
        recorder.record(
            ActivityEvent::new(ActivityKind::Embedding, "embed query").with_latency(12),
        );

        let trace = recorder.take();
        assert_eq!(trace[0].turn_id, turn_id);
        assert_eq!(trace[0].latency_ms, Some(12));
    }

    #[tokio::test]
    async fn test_streaming_sink_receives_events() {
        let recorder = ActivityRecorder::new(Uuid::new_v4());
        let mut rx = recorder.subscribe();

        recorder.record(ActivityEvent::new(ActivityKind::Delegation, "dispatch"));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, ActivityKind::Delegation);
        assert_eq!(received.title, "dispatch");
    }

    #[test]
    fn test_slow_subscriber_does_not_block_recording() {
        let recorder = ActivityRecorder::new(Uuid::new_v4());
        // Subscriber that never drains
        let _rx = recorder.subscribe();

        for i in 0..1000 {
            recorder.record(ActivityEvent::new(ActivityKind::Search, format!("{}", i)));
        }
        assert_eq!(recorder.len(), 1000);
    }

    #[test]
    fn test_serialization_shape() {
        let mut event = ActivityEvent::new(ActivityKind::ToolCall, "run_query")
            .with_sql("SELECT 1")
            .with_worker("SearchAgent");
        event.id = 7;

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "tool_call");
        assert_eq!(json["sql_text"], "SELECT 1");
        assert!(json.get("latency_ms").is_none());
    }
}
