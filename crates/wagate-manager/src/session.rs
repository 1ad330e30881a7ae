// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory state for one live device session.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::time::Instant;
use uuid::Uuid;

use wagate_core::types::{DeliveryItem, DeviceId, SessionState};
use wagate_core::SessionDriver;

/// Live state for a single device, owned by the registry.
///
/// Each entry carries a `generation` token minted at creation. Driver events
/// and teardown requests carry the generation they were issued for; a mismatch
/// means the session was replaced in the meantime and the request is stale.
pub struct DeviceSession {
    pub device_id: DeviceId,
    pub state: SessionState,
    pub pairing_code: Option<String>,
    pub phone_identity: Option<String>,
    /// Monotonic instant of the last observed driver activity.
    pub last_activity: Instant,
    pub generation: Uuid,
    pub driver: Arc<dyn SessionDriver>,
    /// FIFO delivery queue drained by the periodic delivery tick.
    pub queue: VecDeque<DeliveryItem>,
}

impl DeviceSession {
    /// Fresh session in `Connecting` state with an empty queue.
    pub fn new(device_id: DeviceId, driver: Arc<dyn SessionDriver>) -> Self {
        Self {
            device_id,
            state: SessionState::Connecting,
            pairing_code: None,
            phone_identity: None,
            last_activity: Instant::now(),
            generation: Uuid::new_v4(),
            driver,
            queue: VecDeque::new(),
        }
    }

    /// Record driver activity now, resetting the inactivity clock.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Time since the last observed driver activity.
    pub fn idle_for(&self) -> std::time::Duration {
        self.last_activity.elapsed()
    }
}
