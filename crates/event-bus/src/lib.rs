//! # Analysis Event Bus
//!
//! The event bus broadcasts what the incremental analysis engine has accomplished so that
//! editors, diagnostics publishers and other observers can react to it.
//!
//! ## Delivery
//!
//! Publishing is synchronous and best-effort: an event is handed to every subscriber that
//! exists at the moment it is sent. There is no queueing for late subscribers and no retry.
//! A subscriber that falls more than [`EVENT_BUS_CAPACITY`] events behind observes a lag
//! error on its receiver and skips ahead.
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────┐    ┌─────────────────┐
//! │   Incremental   │    │  Event Bus   │    │   Consumers     │
//! │   Analyzer      │───▶│  (Broadcast) │───▶│   • Diagnostics │
//! │                 │    │              │    │   • Tree views  │
//! │ • Pass results  │    │              │    │   • CLI         │
//! │ • Scope errors  │    │              │    │                 │
//! │ • Invalidation  │    │              │    │                 │
//! └─────────────────┘    └──────────────┘    └─────────────────┘
//! ```

use chrono::{DateTime, Utc};
use document_model::IncrementalAnalysisResult;
use serde::Serialize;
use tokio::sync::broadcast::{self, Sender};

pub const EVENT_BUS_CAPACITY: usize = 1024;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum AnalysisEvent {
    AnalysisComplete(AnalysisCompleted),
    AnalysisError(AnalysisFailed),
    CacheInvalidated(CacheInvalidated),
    AllCachesCleared(AllCachesCleared),
}

impl AnalysisEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisEvent::AnalysisComplete(_) => "analysis-complete",
            AnalysisEvent::AnalysisError(_) => "analysis-error",
            AnalysisEvent::CacheInvalidated(_) => "cache-invalidated",
            AnalysisEvent::AllCachesCleared(_) => "all-caches-cleared",
        }
    }

    /// Document the event is about, if it concerns a single one.
    pub fn uri(&self) -> Option<&str> {
        match self {
            AnalysisEvent::AnalysisComplete(e) => Some(&e.result.uri),
            AnalysisEvent::AnalysisError(e) => Some(&e.uri),
            AnalysisEvent::CacheInvalidated(e) => Some(&e.uri),
            AnalysisEvent::AllCachesCleared(_) => None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AnalysisCompleted {
    pub result: IncrementalAnalysisResult,
    pub completed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnalysisFailed {
    pub uri: String,
    pub scope: String,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CacheInvalidated {
    pub uri: String,
    pub invalidated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AllCachesCleared {
    pub cleared_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct EventBus {
    sender: Sender<AnalysisEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self { sender }
    }

    pub fn send(&self, event: &AnalysisEvent) {
        if self.sender.send(event.clone()).is_err() {
            // No subscribers right now; events are not retained for later ones.
            tracing::debug!("No receivers for event bus, dropping {} event", event.name());
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalidated(uri: &str) -> AnalysisEvent {
        AnalysisEvent::CacheInvalidated(CacheInvalidated {
            uri: uri.to_string(),
            invalidated_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.send(&invalidated("file:///a.ts"));

        assert_eq!(first.recv().await.unwrap().uri(), Some("file:///a.ts"));
        assert_eq!(second.recv().await.unwrap().uri(), Some("file:///a.ts"));
    }

    #[test]
    fn test_send_without_receivers_is_ignored() {
        let bus = EventBus::new();
        assert_eq!(bus.receiver_count(), 0);
        bus.send(&invalidated("file:///a.ts"));
    }

    #[tokio::test]
    async fn test_late_subscribers_miss_earlier_events() {
        let bus = EventBus::new();
        let mut early = bus.subscribe();
        bus.send(&invalidated("file:///first.ts"));

        let mut late = bus.subscribe();
        bus.send(&AnalysisEvent::AllCachesCleared(AllCachesCleared {
            cleared_at: Utc::now(),
        }));

        assert_eq!(early.recv().await.unwrap().name(), "cache-invalidated");
        assert_eq!(early.recv().await.unwrap().name(), "all-caches-cleared");
        assert_eq!(late.recv().await.unwrap().name(), "all-caches-cleared");
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let json = serde_json::to_value(invalidated("file:///a.ts")).unwrap();
        assert_eq!(json["type"], "CacheInvalidated");
        assert_eq!(json["payload"]["uri"], "file:///a.ts");
    }
}
