// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across capability traits and the Wagate session manager.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Stable identifier for a managed device. Foreign key to the persisted device record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub String);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        DeviceId(s.to_string())
    }
}

/// Provider-assigned identifier for a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Connection state of one device session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    Connecting,
    QrReady,
    Connected,
    Error,
    AuthFailed,
}

impl SessionState {
    /// States in which a live driver instance exists for the device.
    ///
    /// `create_session` on a device in an active state is an idempotent no-op.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            SessionState::Connecting | SessionState::QrReady | SessionState::Connected
        )
    }
}

/// Connectivity reported by a driver probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Connected,
    Disconnected,
}

/// Lifecycle status of a persisted message record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Scheduled,
    Sent,
    Failed,
}

/// Outbound payload variants accepted by the driver send capability.
#[derive(Debug, Clone)]
pub enum OutboundPayload {
    Text {
        body: String,
    },
    Media {
        bytes: Vec<u8>,
        mime_type: String,
        caption: Option<String>,
    },
    Location {
        latitude: f64,
        longitude: f64,
        label: Option<String>,
    },
}

/// One outbound message awaiting delivery, with its retry count.
///
/// The `id` doubles as the persisted message record ID so delivery outcomes
/// can be written back without a lookup.
#[derive(Debug, Clone)]
pub struct DeliveryItem {
    pub id: String,
    pub recipient: String,
    pub payload: OutboundPayload,
    pub retries: u32,
    pub max_retries: u32,
}

impl DeliveryItem {
    /// Create a fresh delivery item with zero retries consumed.
    pub fn new(
        id: impl Into<String>,
        recipient: impl Into<String>,
        payload: OutboundPayload,
        max_retries: u32,
    ) -> Self {
        Self {
            id: id.into(),
            recipient: recipient.into(),
            payload,
            retries: 0,
            max_retries,
        }
    }
}

/// Events emitted by a session driver instance.
#[derive(Debug, Clone)]
pub enum DriverEvent {
    /// One-time pairing code/QR payload for operator display.
    PairingCode(String),
    /// Session is live; carries the authenticated phone identity.
    Ready(String),
    /// Driver lost its connection; carries the provider reason string.
    Disconnected(String),
    /// Terminal authentication failure; requires operator re-pairing.
    AuthFailure(String),
    /// Inbound message payload from the messaging network.
    IncomingMessage(serde_json::Value),
    /// Unexpected driver error.
    Error(String),
}

/// Per-recipient outcome of a bulk send.
#[derive(Debug, Clone, Serialize)]
pub struct BulkSendOutcome {
    pub recipient: String,
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

/// Persisted device record, mirrored (eventually consistently) from session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: String,
    pub name: String,
    pub status: String,
    pub phone_identity: Option<String>,
    pub pairing_code: Option<String>,
    pub last_seen: Option<String>,
    pub error_message: Option<String>,
    pub connection_attempts: i64,
    pub created_at: String,
}

/// Persisted outbound message record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub device_id: String,
    pub recipient: String,
    pub body: String,
    pub status: String,
    pub provider_message_id: Option<String>,
    pub sent_at: Option<String>,
    pub error_message: Option<String>,
    /// Present only for scheduled records.
    pub scheduled_at: Option<String>,
    pub created_at: String,
}

/// Partial update for a persisted device record.
///
/// `None` leaves a column untouched; `Some(None)` on a nullable column clears it.
#[derive(Debug, Clone, Default)]
pub struct DeviceUpdate {
    pub status: Option<SessionState>,
    pub phone_identity: Option<Option<String>>,
    pub pairing_code: Option<Option<String>>,
    pub last_seen: Option<String>,
    pub error_message: Option<Option<String>>,
    pub connection_attempts: Option<i64>,
}

/// Partial update for a persisted message record.
#[derive(Debug, Clone, Default)]
pub struct MessageUpdate {
    pub status: Option<MessageStatus>,
    pub provider_message_id: Option<String>,
    pub sent_at: Option<String>,
    pub error_message: Option<String>,
}
