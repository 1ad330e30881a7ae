// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence collaborator: a narrow CRUD interface over device and message records.

use async_trait::async_trait;

use crate::error::WagateError;
use crate::types::{DeviceRecord, DeviceUpdate, MessageRecord, MessageUpdate};

/// Durable store of device records and message records.
///
/// The session manager issues writes synchronously before a state transition
/// is considered complete, but treats write failures as non-fatal to the
/// session itself.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn get_device(&self, id: &str) -> Result<Option<DeviceRecord>, WagateError>;

    async fn get_all_devices(&self) -> Result<Vec<DeviceRecord>, WagateError>;

    async fn create_device(&self, record: &DeviceRecord) -> Result<(), WagateError>;

    async fn update_device(&self, id: &str, update: DeviceUpdate) -> Result<(), WagateError>;

    async fn create_message(&self, record: &MessageRecord) -> Result<(), WagateError>;

    async fn update_message(&self, id: &str, update: MessageUpdate) -> Result<(), WagateError>;

    /// Message records with `status = scheduled` and `scheduled_at <= now`
    /// (RFC 3339 UTC), oldest first.
    async fn due_scheduled_messages(&self, now: &str) -> Result<Vec<MessageRecord>, WagateError>;
}
