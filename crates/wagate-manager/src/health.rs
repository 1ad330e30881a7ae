// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session health monitoring.
//!
//! The health tick sweeps connected sessions and actively probes any that
//! have been silent past the inactivity threshold. A confirmed connection
//! refreshes the activity clock; a reported disconnect or a failing probe
//! demotes the session through the regular teardown path, so the side effects
//! match an organic disconnect.

use tokio::time::Duration;
use tracing::{debug, warn};

use wagate_core::types::{ConnectivityState, DeviceUpdate, SessionState};

use crate::lifecycle::{now_rfc3339, SessionManager};

impl SessionManager {
    /// Probe idle connected sessions once.
    pub async fn run_health_tick(&self) {
        let threshold =
            Duration::from_secs(self.inner.config.health.inactivity_threshold_secs);

        for (device_id, handle) in self.inner.registry.snapshot() {
            let (driver, generation, idle) = {
                let session = handle.lock().await;
                if session.state != SessionState::Connected {
                    continue;
                }
                (session.driver.clone(), session.generation, session.idle_for())
            };

            if idle <= threshold {
                continue;
            }
            debug!(
                device_id,
                idle_secs = idle.as_secs(),
                "session idle past threshold, probing connectivity"
            );

            match driver.connectivity_state().await {
                Ok(ConnectivityState::Connected) => {
                    {
                        let mut session = handle.lock().await;
                        if session.generation == generation {
                            session.touch();
                        }
                    }
                    self.persist_device(
                        &device_id,
                        DeviceUpdate {
                            last_seen: Some(now_rfc3339()),
                            ..Default::default()
                        },
                    )
                    .await;
                }
                Ok(ConnectivityState::Disconnected) => {
                    warn!(device_id, "health probe reported disconnected");
                    self.teardown_session(
                        &device_id,
                        generation,
                        SessionState::Disconnected,
                        Some("health probe reported disconnected".to_string()),
                    )
                    .await;
                }
                Err(e) => {
                    warn!(device_id, error = %e, "health probe failed");
                    self.teardown_session(
                        &device_id,
                        generation,
                        SessionState::Error,
                        Some(format!("health probe failed: {e}")),
                    )
                    .await;
                }
            }
        }
    }
}
