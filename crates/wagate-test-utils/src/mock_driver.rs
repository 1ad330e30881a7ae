// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock session driver for deterministic testing.
//!
//! `MockDriver` implements `SessionDriver` with injectable driver events and
//! captured outbound sends for assertion in tests. Each driver is paired with
//! a shared [`MockDriverState`] handle through which a test scripts its
//! behavior, and [`MockDriverFactory`] hands out the handle per device.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use wagate_core::types::{ConnectivityState, DeviceId, DriverEvent, MessageId};
use wagate_core::{DriverFactory, SessionDriver, WagateError};

/// One captured outbound send.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub recipient: String,
    pub body: String,
}

/// Shared scripting handle for a [`MockDriver`].
///
/// The event sender stays alive here even after the driver is destroyed, so
/// tests can emit late events and assert they are ignored.
pub struct MockDriverState {
    sent: Mutex<Vec<SentMessage>>,
    events_tx: mpsc::UnboundedSender<DriverEvent>,
    connectivity: Mutex<Option<ConnectivityState>>,
    fail_sends: AtomicU32,
    fail_initialize: AtomicBool,
    initialized: AtomicBool,
    destroyed: AtomicBool,
}

impl MockDriverState {
    /// Emit a driver event as if the external engine produced it.
    ///
    /// Returns `false` if the consumer side is gone.
    pub fn emit(&self, event: DriverEvent) -> bool {
        self.events_tx.send(event).is_ok()
    }

    /// Script the next `count` sends to fail before sends succeed again.
    pub fn fail_next_sends(&self, count: u32) {
        self.fail_sends.store(count, Ordering::SeqCst);
    }

    /// Script `initialize()` to fail.
    pub fn fail_initialize(&self) {
        self.fail_initialize.store(true, Ordering::SeqCst);
    }

    /// Script the connectivity probe result. `None` makes the probe fail.
    pub fn set_connectivity(&self, state: Option<ConnectivityState>) {
        *self.connectivity.lock().unwrap() = state;
    }

    /// All sends captured so far, in order.
    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn was_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn was_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    fn record_send(&self, recipient: &str, body: &str) -> Result<MessageId, WagateError> {
        let remaining = self.fail_sends.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_sends.store(remaining - 1, Ordering::SeqCst);
            return Err(WagateError::driver("scripted send failure"));
        }
        self.sent.lock().unwrap().push(SentMessage {
            recipient: recipient.to_string(),
            body: body.to_string(),
        });
        Ok(MessageId(format!("mock-msg-{}", uuid::Uuid::new_v4())))
    }
}

/// A scripted session driver for testing.
pub struct MockDriver {
    state: Arc<MockDriverState>,
    events_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<DriverEvent>>,
}

impl MockDriver {
    /// Create a driver plus the scripting handle controlling it.
    pub fn new() -> (Arc<Self>, Arc<MockDriverState>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let state = Arc::new(MockDriverState {
            sent: Mutex::new(Vec::new()),
            events_tx,
            connectivity: Mutex::new(Some(ConnectivityState::Connected)),
            fail_sends: AtomicU32::new(0),
            fail_initialize: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
        });
        let driver = Arc::new(Self {
            state: state.clone(),
            events_rx: tokio::sync::Mutex::new(events_rx),
        });
        (driver, state)
    }
}

#[async_trait]
impl SessionDriver for MockDriver {
    async fn initialize(&self) -> Result<(), WagateError> {
        if self.state.fail_initialize.load(Ordering::SeqCst) {
            return Err(WagateError::driver("scripted initialize failure"));
        }
        self.state.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy(&self) -> Result<(), WagateError> {
        self.state.destroyed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send_text(&self, recipient: &str, body: &str) -> Result<MessageId, WagateError> {
        self.state.record_send(recipient, body)
    }

    async fn send_media(
        &self,
        recipient: &str,
        _bytes: &[u8],
        mime_type: &str,
        caption: Option<&str>,
    ) -> Result<MessageId, WagateError> {
        let body = format!("[media {}] {}", mime_type, caption.unwrap_or(""));
        self.state.record_send(recipient, &body)
    }

    async fn send_location(
        &self,
        recipient: &str,
        latitude: f64,
        longitude: f64,
        label: Option<&str>,
    ) -> Result<MessageId, WagateError> {
        let body = format!("[location {latitude},{longitude}] {}", label.unwrap_or(""));
        self.state.record_send(recipient, &body)
    }

    async fn connectivity_state(&self) -> Result<ConnectivityState, WagateError> {
        match *self.state.connectivity.lock().unwrap() {
            Some(state) => Ok(state),
            None => Err(WagateError::driver("scripted probe failure")),
        }
    }

    async fn next_event(&self) -> Option<DriverEvent> {
        self.events_rx.lock().await.recv().await
    }
}

/// `DriverFactory` that hands out mock drivers and records their scripting
/// handles per device.
#[derive(Default)]
pub struct MockDriverFactory {
    handles: Mutex<HashMap<String, Arc<MockDriverState>>>,
    failing_initializers: Mutex<Vec<String>>,
    fail_create: AtomicBool,
    created: AtomicU32,
}

impl MockDriverFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next `create()` calls to fail.
    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Script drivers created for `device_id` to fail `initialize()`.
    ///
    /// Takes effect at creation time, before the caller can reach the
    /// driver's scripting handle.
    pub fn fail_initialize_for(&self, device_id: &str) {
        self.failing_initializers
            .lock()
            .unwrap()
            .push(device_id.to_string());
    }

    /// Scripting handle for the most recent driver created for `device_id`.
    pub fn handle_for(&self, device_id: &str) -> Option<Arc<MockDriverState>> {
        self.handles.lock().unwrap().get(device_id).cloned()
    }

    /// Total number of drivers created across all devices.
    pub fn created_count(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }
}

impl DriverFactory for MockDriverFactory {
    fn create(&self, device_id: &DeviceId) -> Result<Arc<dyn SessionDriver>, WagateError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(WagateError::driver("scripted create failure"));
        }
        let (driver, state) = MockDriver::new();
        if self
            .failing_initializers
            .lock()
            .unwrap()
            .contains(&device_id.0)
        {
            state.fail_initialize();
        }
        self.handles
            .lock()
            .unwrap()
            .insert(device_id.0.clone(), state);
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_text_is_captured() {
        let (driver, state) = MockDriver::new();
        let id = driver.send_text("966500000000", "hello").await.unwrap();
        assert!(id.0.starts_with("mock-msg-"));

        let sent = state.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "966500000000");
        assert_eq!(sent[0].body, "hello");
    }

    #[tokio::test]
    async fn scripted_send_failures_are_consumed_in_order() {
        let (driver, state) = MockDriver::new();
        state.fail_next_sends(2);

        assert!(driver.send_text("r", "a").await.is_err());
        assert!(driver.send_text("r", "b").await.is_err());
        assert!(driver.send_text("r", "c").await.is_ok());
        assert_eq!(state.sent_count(), 1);
    }

    #[tokio::test]
    async fn events_flow_from_state_to_driver() {
        let (driver, state) = MockDriver::new();
        state.emit(DriverEvent::PairingCode("abc".to_string()));
        state.emit(DriverEvent::Ready("966501234567".to_string()));

        match driver.next_event().await {
            Some(DriverEvent::PairingCode(code)) => assert_eq!(code, "abc"),
            other => panic!("unexpected event: {other:?}"),
        }
        match driver.next_event().await {
            Some(DriverEvent::Ready(identity)) => assert_eq!(identity, "966501234567"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn events_can_still_be_emitted_after_destroy() {
        let (driver, state) = MockDriver::new();
        driver.destroy().await.unwrap();
        assert!(state.was_destroyed());
        assert!(state.emit(DriverEvent::Ready("late".to_string())));
    }

    #[tokio::test]
    async fn probe_follows_scripted_connectivity() {
        let (driver, state) = MockDriver::new();
        assert_eq!(
            driver.connectivity_state().await.unwrap(),
            ConnectivityState::Connected
        );

        state.set_connectivity(Some(ConnectivityState::Disconnected));
        assert_eq!(
            driver.connectivity_state().await.unwrap(),
            ConnectivityState::Disconnected
        );

        state.set_connectivity(None);
        assert!(driver.connectivity_state().await.is_err());
    }

    #[tokio::test]
    async fn factory_registers_one_handle_per_device() {
        let factory = MockDriverFactory::new();
        let driver = factory.create(&DeviceId::from("dev-1")).unwrap();
        driver.initialize().await.unwrap();

        let handle = factory.handle_for("dev-1").unwrap();
        assert!(handle.was_initialized());
        assert!(factory.handle_for("dev-2").is_none());
        assert_eq!(factory.created_count(), 1);
    }

    #[tokio::test]
    async fn scripted_initialize_failure() {
        let (driver, state) = MockDriver::new();
        state.fail_initialize();
        assert!(driver.initialize().await.is_err());
        assert!(!state.was_initialized());
    }
}
