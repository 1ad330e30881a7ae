// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session driver capability: the external automation engine that maintains a
//! live connection to the messaging network for one device.

use async_trait::async_trait;

use crate::error::WagateError;
use crate::types::{ConnectivityState, DeviceId, DriverEvent, MessageId};

/// Per-device opaque automation handle.
///
/// A driver instance is created by the lifecycle controller, owned exclusively
/// by its device session, and never shared across devices. All methods are
/// potentially slow network I/O and must not be called while holding registry
/// locks.
#[async_trait]
pub trait SessionDriver: Send + Sync {
    /// Start the underlying session. Pairing and readiness are reported
    /// asynchronously via [`next_event`](Self::next_event).
    async fn initialize(&self) -> Result<(), WagateError>;

    /// Tear down the underlying session and release its resources.
    async fn destroy(&self) -> Result<(), WagateError>;

    /// Send a plain text message.
    async fn send_text(&self, recipient: &str, body: &str) -> Result<MessageId, WagateError>;

    /// Send a media attachment with an optional caption.
    async fn send_media(
        &self,
        recipient: &str,
        bytes: &[u8],
        mime_type: &str,
        caption: Option<&str>,
    ) -> Result<MessageId, WagateError>;

    /// Send a location pin with an optional label.
    async fn send_location(
        &self,
        recipient: &str,
        latitude: f64,
        longitude: f64,
        label: Option<&str>,
    ) -> Result<MessageId, WagateError>;

    /// Actively probe the driver for its reported connectivity state.
    async fn connectivity_state(&self) -> Result<ConnectivityState, WagateError>;

    /// Receive the next driver event, or `None` once the event stream is closed.
    ///
    /// The lifecycle controller is the single consumer; drivers must not
    /// require callback registration.
    async fn next_event(&self) -> Option<DriverEvent>;
}

/// Factory for driver instances, injected into the session manager.
///
/// `create` only constructs the handle; no external resources are acquired
/// until [`SessionDriver::initialize`] runs.
pub trait DriverFactory: Send + Sync {
    fn create(
        &self,
        device_id: &DeviceId,
    ) -> Result<std::sync::Arc<dyn SessionDriver>, WagateError>;
}
