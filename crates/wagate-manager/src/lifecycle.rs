// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle controller.
//!
//! `SessionManager` owns the registry and drives every state transition:
//! creation, driver initialization, pairing, readiness, disconnects, and
//! teardown. Driver events arrive through a per-device pump task and are
//! checked against the session generation before they mutate anything, so an
//! event from a destroyed driver can never corrupt a newer session.
//!
//! For every transition the persistence write is issued before the event-sink
//! publish, keeping observers at most as fresh as the database.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::Mutex;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use wagate_config::model::WagateConfig;
use wagate_core::types::{DeviceId, DeviceRecord, DeviceUpdate, DriverEvent, SessionState};
use wagate_core::{DeviceStore, DriverFactory, EventSink, WagateError};

use crate::cleanup;
use crate::registry::{SessionHandle, SessionRegistry};
use crate::session::DeviceSession;

/// Current UTC time as an RFC 3339 string, the format used for every
/// persisted timestamp.
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub(crate) struct ManagerInner {
    pub registry: SessionRegistry,
    pub store: Arc<dyn DeviceStore>,
    pub events: Arc<dyn EventSink>,
    pub drivers: Arc<dyn DriverFactory>,
    pub config: WagateConfig,
}

/// Multi-device session manager.
///
/// Cheap to clone; all clones share the same registry and collaborators.
#[derive(Clone)]
pub struct SessionManager {
    pub(crate) inner: Arc<ManagerInner>,
}

impl SessionManager {
    pub fn new(
        config: WagateConfig,
        store: Arc<dyn DeviceStore>,
        events: Arc<dyn EventSink>,
        drivers: Arc<dyn DriverFactory>,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                registry: SessionRegistry::new(),
                store,
                events,
                drivers,
                config,
            }),
        }
    }

    /// Force persisted device statuses left over from a previous process run
    /// back to `disconnected`.
    ///
    /// Call once at startup before creating sessions: no driver survives a
    /// restart, so any other persisted status is stale. Returns the number of
    /// records reset.
    pub async fn reset_persisted_statuses(&self) -> Result<usize, WagateError> {
        let mut reset = 0usize;
        for record in self.inner.store.get_all_devices().await? {
            if record.status == SessionState::Disconnected.to_string() {
                continue;
            }
            self.inner
                .store
                .update_device(
                    &record.id,
                    DeviceUpdate {
                        status: Some(SessionState::Disconnected),
                        pairing_code: Some(None),
                        error_message: Some(Some(
                            "session reset: manager restarted while session was active"
                                .to_string(),
                        )),
                        ..Default::default()
                    },
                )
                .await?;
            reset += 1;
        }
        if reset > 0 {
            info!(reset, "stale persisted session statuses reset");
        }
        Ok(reset)
    }

    /// Create and start a session for `device_id`.
    ///
    /// Returns `Ok(false)` without side effects when the device already has a
    /// live session. On `Ok(true)` the driver initializes in the background;
    /// progress is observable via driver events and the accessors.
    pub async fn create_session(
        &self,
        device_id: &DeviceId,
        name: &str,
    ) -> Result<bool, WagateError> {
        let id = device_id.0.as_str();

        // Cheap pre-check; insert_if_absent below is the authoritative guard.
        if self.inner.registry.get(id).is_some() {
            debug!(device_id = %device_id, "session already live, create is a no-op");
            return Ok(false);
        }

        let driver = self.inner.drivers.create(device_id)?;
        let session = DeviceSession::new(device_id.clone(), driver.clone());
        let generation = session.generation;
        let handle: SessionHandle = Arc::new(Mutex::new(session));

        if !self.inner.registry.insert_if_absent(id, handle.clone()) {
            debug!(device_id = %device_id, "session already live, create is a no-op");
            return Ok(false);
        }

        if let Err(e) = self.persist_session_start(id, name).await {
            self.inner.registry.remove_exact(id, &handle);
            return Err(e);
        }

        cleanup::cleanup_session_artifacts(&self.inner.config.sessions, id).await;
        self.publish_session_state(id, SessionState::Connecting, None, None)
            .await;
        info!(device_id = %device_id, "session created, initializing driver");

        let manager = self.clone();
        let init_driver = driver.clone();
        let init_id = device_id.clone();
        tokio::spawn(async move {
            if let Err(e) = init_driver.initialize().await {
                warn!(device_id = %init_id, error = %e, "driver initialization failed");
                manager
                    .teardown_session(
                        &init_id.0,
                        generation,
                        SessionState::Error,
                        Some(format!("initialization failed: {e}")),
                    )
                    .await;
            }
        });

        let manager = self.clone();
        let pump_id = device_id.clone();
        tokio::spawn(async move {
            while let Some(event) = driver.next_event().await {
                if manager
                    .apply_driver_event(&pump_id.0, generation, event)
                    .await
                {
                    break;
                }
            }
            debug!(device_id = %pump_id, "driver event stream ended");
        });

        Ok(true)
    }

    /// Operator-initiated disconnect. Returns `false` if no session was live.
    ///
    /// Preempts an in-flight connect: the generation captured here wins, and
    /// any later event from the old driver is discarded.
    pub async fn disconnect_session(&self, device_id: &DeviceId) -> Result<bool, WagateError> {
        let Some(handle) = self.inner.registry.get(&device_id.0) else {
            return Ok(false);
        };
        let generation = handle.lock().await.generation;
        Ok(self
            .teardown_session(&device_id.0, generation, SessionState::Disconnected, None)
            .await)
    }

    /// Current in-memory state for `device_id`, or `None` when no session is live.
    pub async fn state(&self, device_id: &DeviceId) -> Option<SessionState> {
        let handle = self.inner.registry.get(&device_id.0)?;
        let state = handle.lock().await.state;
        Some(state)
    }

    /// Pairing code awaiting scan, if the session is in `qr_ready`.
    pub async fn pairing_code(&self, device_id: &DeviceId) -> Option<String> {
        let handle = self.inner.registry.get(&device_id.0)?;
        let session = handle.lock().await;
        session.pairing_code.clone()
    }

    /// Whether the session is connected and able to send.
    pub async fn is_ready(&self, device_id: &DeviceId) -> bool {
        self.state(device_id).await == Some(SessionState::Connected)
    }

    /// IDs of all devices with a live session.
    pub fn active_device_ids(&self) -> Vec<String> {
        self.inner
            .registry
            .snapshot()
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Spawn the periodic delivery, scheduler, and health loops.
    ///
    /// All loops stop when `cancel` is triggered; live sessions are not torn
    /// down on cancellation, the host disconnects them explicitly if desired.
    pub fn start(&self, cancel: CancellationToken) {
        let delivery = self.clone();
        let delivery_cancel = cancel.clone();
        let drain_interval =
            Duration::from_secs(self.inner.config.delivery.drain_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(drain_interval);
            // Skip the first immediate tick.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => { delivery.run_delivery_tick().await; }
                    _ = delivery_cancel.cancelled() => {
                        info!("delivery loop shutting down");
                        break;
                    }
                }
            }
        });

        let scheduler = self.clone();
        let scheduler_cancel = cancel.clone();
        let scheduler_interval =
            Duration::from_secs(self.inner.config.scheduler.interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(scheduler_interval);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => { scheduler.run_scheduler_tick().await; }
                    _ = scheduler_cancel.cancelled() => {
                        info!("scheduler loop shutting down");
                        break;
                    }
                }
            }
        });

        let health = self.clone();
        let health_interval = Duration::from_secs(self.inner.config.health.interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(health_interval);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => { health.run_health_tick().await; }
                    _ = cancel.cancelled() => {
                        info!("health loop shutting down");
                        break;
                    }
                }
            }
        });
    }

    /// Apply one driver event for the given generation.
    ///
    /// Returns `true` when the event pump should stop: the session reached a
    /// terminal state, or this generation is no longer current.
    pub(crate) async fn apply_driver_event(
        &self,
        device_id: &str,
        generation: Uuid,
        event: DriverEvent,
    ) -> bool {
        let Some(handle) = self.inner.registry.get(device_id) else {
            debug!(device_id, "event for removed session ignored");
            return true;
        };

        let mut session = handle.lock().await;
        if session.generation != generation {
            debug!(device_id, "event for superseded session ignored");
            return true;
        }

        match event {
            DriverEvent::PairingCode(code) => {
                session.state = SessionState::QrReady;
                session.pairing_code = Some(code.clone());
                session.touch();
                drop(session);

                self.persist_device(
                    device_id,
                    DeviceUpdate {
                        status: Some(SessionState::QrReady),
                        pairing_code: Some(Some(code.clone())),
                        ..Default::default()
                    },
                )
                .await;
                self.publish_session_state(device_id, SessionState::QrReady, Some(&code), None)
                    .await;
                info!(device_id, "pairing code ready");
                false
            }
            DriverEvent::Ready(identity) => {
                session.state = SessionState::Connected;
                session.phone_identity = Some(identity.clone());
                session.pairing_code = None;
                session.touch();
                drop(session);

                self.persist_device(
                    device_id,
                    DeviceUpdate {
                        status: Some(SessionState::Connected),
                        phone_identity: Some(Some(identity.clone())),
                        pairing_code: Some(None),
                        last_seen: Some(now_rfc3339()),
                        error_message: Some(None),
                        connection_attempts: Some(0),
                    },
                )
                .await;
                self.publish_session_state(device_id, SessionState::Connected, None, None)
                    .await;
                info!(device_id, phone_identity = %identity, "session connected");
                false
            }
            DriverEvent::IncomingMessage(payload) => {
                session.touch();
                drop(session);

                self.persist_device(
                    device_id,
                    DeviceUpdate {
                        last_seen: Some(now_rfc3339()),
                        ..Default::default()
                    },
                )
                .await;
                self.inner
                    .events
                    .publish(
                        "incoming_message",
                        json!({ "device_id": device_id, "payload": payload }),
                    )
                    .await;
                false
            }
            DriverEvent::Disconnected(reason) => {
                drop(session);
                self.teardown_session(
                    device_id,
                    generation,
                    SessionState::Disconnected,
                    Some(reason),
                )
                .await;
                true
            }
            DriverEvent::AuthFailure(reason) => {
                drop(session);
                self.teardown_session(
                    device_id,
                    generation,
                    SessionState::AuthFailed,
                    Some(reason),
                )
                .await;
                true
            }
            DriverEvent::Error(message) => {
                drop(session);
                self.teardown_session(device_id, generation, SessionState::Error, Some(message))
                    .await;
                true
            }
        }
    }

    /// Tear down the session for `device_id` if it still belongs to
    /// `generation`: remove it from the registry, destroy the driver, clean
    /// session artifacts, persist the final status, publish the transition.
    ///
    /// Returns `false` when the generation was superseded or already gone.
    pub(crate) async fn teardown_session(
        &self,
        device_id: &str,
        generation: Uuid,
        final_state: SessionState,
        error: Option<String>,
    ) -> bool {
        let Some(handle) = self.inner.registry.get(device_id) else {
            return false;
        };

        let driver = {
            let mut session = handle.lock().await;
            if session.generation != generation {
                debug!(device_id, "teardown for superseded session skipped");
                return false;
            }
            session.state = final_state;
            session.pairing_code = None;
            // Invalidate the generation while still holding the lock, so a
            // racing teardown for the same generation loses right here.
            session.generation = Uuid::new_v4();
            session.driver.clone()
        };

        if !self.inner.registry.remove_exact(device_id, &handle) {
            debug!(device_id, "teardown lost the registry race");
            return false;
        }

        if let Err(e) = driver.destroy().await {
            warn!(device_id, error = %e, "driver destroy failed");
        }
        cleanup::cleanup_session_artifacts(&self.inner.config.sessions, device_id).await;

        // Authentication failures count against the device's connection
        // attempts; an operator re-create continues from there.
        let connection_attempts = if final_state == SessionState::AuthFailed {
            match self.inner.store.get_device(device_id).await {
                Ok(Some(record)) => Some(record.connection_attempts + 1),
                Ok(None) => None,
                Err(e) => {
                    warn!(device_id, error = %e, "attempt count lookup failed");
                    None
                }
            }
        } else {
            None
        };

        self.persist_device(
            device_id,
            DeviceUpdate {
                status: Some(final_state),
                pairing_code: Some(None),
                error_message: Some(error.clone()),
                connection_attempts,
                ..Default::default()
            },
        )
        .await;
        self.publish_session_state(device_id, final_state, None, error.as_deref())
            .await;
        info!(device_id, state = %final_state, "session torn down");
        true
    }

    /// Persist a device update, logging instead of failing the session on error.
    pub(crate) async fn persist_device(&self, device_id: &str, update: DeviceUpdate) {
        if let Err(e) = self.inner.store.update_device(device_id, update).await {
            warn!(device_id, error = %e, "device state persistence failed");
        }
    }

    pub(crate) async fn publish_session_state(
        &self,
        device_id: &str,
        state: SessionState,
        pairing_code: Option<&str>,
        error: Option<&str>,
    ) {
        let mut payload = json!({ "device_id": device_id, "state": state.to_string() });
        if let Some(code) = pairing_code {
            payload["pairing_code"] = json!(code);
        }
        if let Some(message) = error {
            payload["error"] = json!(message);
        }
        self.inner.events.publish("session_state", payload).await;
    }

    async fn persist_session_start(&self, id: &str, name: &str) -> Result<(), WagateError> {
        match self.inner.store.get_device(id).await? {
            Some(record) => {
                self.inner
                    .store
                    .update_device(
                        id,
                        DeviceUpdate {
                            status: Some(SessionState::Connecting),
                            pairing_code: Some(None),
                            error_message: Some(None),
                            connection_attempts: Some(record.connection_attempts + 1),
                            ..Default::default()
                        },
                    )
                    .await
            }
            None => {
                self.inner
                    .store
                    .create_device(&DeviceRecord {
                        id: id.to_string(),
                        name: name.to_string(),
                        status: SessionState::Connecting.to_string(),
                        phone_identity: None,
                        pairing_code: None,
                        last_seen: None,
                        error_message: None,
                        connection_attempts: 1,
                        created_at: now_rfc3339(),
                    })
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wagate_test_utils::{MemoryStore, MockDriverFactory, RecordingEventSink};

    fn manager_with(
        store: Arc<MemoryStore>,
        events: Arc<RecordingEventSink>,
    ) -> SessionManager {
        let mut config = WagateConfig::default();
        config.sessions.settle_delay_ms = 0;
        SessionManager::new(config, store, events, Arc::new(MockDriverFactory::new()))
    }

    #[tokio::test]
    async fn racing_teardowns_resolve_to_a_single_transition() {
        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(RecordingEventSink::new());
        let manager = manager_with(store.clone(), events.clone());

        let device_id = DeviceId::from("dev-race");
        manager.create_session(&device_id, "race").await.unwrap();
        let handle = manager.inner.registry.get("dev-race").unwrap();
        let generation = handle.lock().await.generation;

        // An operator disconnect racing a health-probe demotion, both issued
        // for the same generation.
        let (first, second) = tokio::join!(
            manager.teardown_session(
                "dev-race",
                generation,
                SessionState::Disconnected,
                None,
            ),
            manager.teardown_session(
                "dev-race",
                generation,
                SessionState::Error,
                Some("health probe failed".to_string()),
            ),
        );
        assert!(first ^ second, "exactly one teardown wins");
        assert!(manager.inner.registry.is_empty());

        let terminal: Vec<String> = events
            .events_named("session_state")
            .await
            .iter()
            .map(|e| e.payload["state"].as_str().unwrap().to_string())
            .filter(|state| state != "connecting")
            .collect();
        assert_eq!(terminal.len(), 1, "one terminal transition published");

        let record = store.get_device("dev-race").await.unwrap().unwrap();
        assert_eq!(record.status, terminal[0], "loser must not overwrite status");
    }

    #[tokio::test]
    async fn teardown_with_stale_generation_is_refused() {
        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(RecordingEventSink::new());
        let manager = manager_with(store, events);

        let device_id = DeviceId::from("dev-stale");
        manager.create_session(&device_id, "stale").await.unwrap();

        assert!(
            !manager
                .teardown_session(
                    "dev-stale",
                    Uuid::new_v4(),
                    SessionState::Disconnected,
                    None,
                )
                .await
        );
        assert!(manager.inner.registry.get("dev-stale").is_some());
    }
}
