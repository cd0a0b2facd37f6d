//! Completed-game archival hook. The core never touches a database; it hands
//! a terminal room's full event stream to whatever sink the process wired
//! up at startup.

use async_trait::async_trait;

use crate::events::Event;
use crate::room::RoomSummary;

#[async_trait]
pub trait ArchivalSink: Send + Sync {
    async fn archive(&self, summary: RoomSummary, events: Vec<Event>);
}

/// Default sink: discards the stream. Used when no archival collaborator is
/// configured.
pub struct NoopArchivalSink;

#[async_trait]
impl ArchivalSink for NoopArchivalSink {
    async fn archive(&self, _summary: RoomSummary, _events: Vec<Event>) {}
}

/// Reference sink: logs the room summary and event count at `info`. Good
/// enough for local runs and tests; a real deployment swaps this for one
/// that writes to object storage or a message queue.
pub struct LoggingArchivalSink;

#[async_trait]
impl ArchivalSink for LoggingArchivalSink {
    async fn archive(&self, summary: RoomSummary, events: Vec<Event>) {
        tracing::info!(
            room_id = %summary.room_id,
            room_code = %summary.room_code,
            event_count = events.len(),
            "room archived"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::Phase;
    use uuid::Uuid;

    #[tokio::test]
    async fn logging_sink_does_not_panic_on_empty_stream() {
        let summary = RoomSummary {
            room_id: Uuid::new_v4(),
            room_code: "ABC123".into(),
            host_name: "Alice".into(),
            occupied: 0,
            total: 4,
            started: true,
            phase: Phase::GameOver,
            created_at: chrono::Utc::now(),
        };
        LoggingArchivalSink.archive(summary, Vec::new()).await;
    }
}
