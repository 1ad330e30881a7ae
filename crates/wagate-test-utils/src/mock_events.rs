// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event sink implementations for tests.

use async_trait::async_trait;
use tokio::sync::Mutex;

use wagate_core::EventSink;

/// One captured event publication.
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub event: String,
    pub payload: serde_json::Value,
}

/// Event sink that records every publication for assertion.
#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<PublishedEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All publications so far, in order.
    pub async fn events(&self) -> Vec<PublishedEvent> {
        self.events.lock().await.clone()
    }

    /// Publications matching the given event name, in order.
    pub async fn events_named(&self, name: &str) -> Vec<PublishedEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.event == name)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn publish(&self, event: &str, payload: serde_json::Value) {
        self.events.lock().await.push(PublishedEvent {
            event: event.to_string(),
            payload,
        });
    }
}

/// Event sink that drops everything.
#[derive(Default)]
pub struct NoopEventSink;

impl NoopEventSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventSink for NoopEventSink {
    async fn publish(&self, _event: &str, _payload: serde_json::Value) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn recording_sink_captures_in_order() {
        let sink = RecordingEventSink::new();
        sink.publish("session_state", json!({"device_id": "d", "state": "qr_ready"}))
            .await;
        sink.publish("message_sent", json!({"message_id": "m"})).await;

        let events = sink.events().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, "session_state");
        assert_eq!(events[1].event, "message_sent");

        let states = sink.events_named("session_state").await;
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].payload["state"], "qr_ready");
    }
}
