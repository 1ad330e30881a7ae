// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event sink capability for notifying outside observers of state transitions.

use async_trait::async_trait;

/// Fire-and-forget publish channel toward UI and audit observers.
///
/// Implementations must never block session processing on observer failures;
/// a publish that cannot be delivered is silently dropped.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, event: &str, payload: serde_json::Value);
}
