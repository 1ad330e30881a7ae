// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory `DeviceStore` for tests that do not need SQLite on disk.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use wagate_core::types::{DeviceRecord, DeviceUpdate, MessageRecord, MessageUpdate};
use wagate_core::{DeviceStore, WagateError};

/// HashMap-backed store with the same partial-update semantics as the SQLite
/// adapter.
#[derive(Default)]
pub struct MemoryStore {
    devices: Mutex<HashMap<String, DeviceRecord>>,
    messages: Mutex<HashMap<String, MessageRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct message lookup for assertions.
    pub async fn message(&self, id: &str) -> Option<MessageRecord> {
        self.messages.lock().await.get(id).cloned()
    }

    /// All message records, unordered.
    pub async fn all_messages(&self) -> Vec<MessageRecord> {
        self.messages.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn get_device(&self, id: &str) -> Result<Option<DeviceRecord>, WagateError> {
        Ok(self.devices.lock().await.get(id).cloned())
    }

    async fn get_all_devices(&self) -> Result<Vec<DeviceRecord>, WagateError> {
        let mut devices: Vec<DeviceRecord> =
            self.devices.lock().await.values().cloned().collect();
        devices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(devices)
    }

    async fn create_device(&self, record: &DeviceRecord) -> Result<(), WagateError> {
        let mut devices = self.devices.lock().await;
        if devices.contains_key(&record.id) {
            return Err(WagateError::Internal(format!(
                "device {} already exists",
                record.id
            )));
        }
        devices.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn update_device(&self, id: &str, update: DeviceUpdate) -> Result<(), WagateError> {
        let mut devices = self.devices.lock().await;
        let record = devices
            .get_mut(id)
            .ok_or_else(|| WagateError::DeviceNotFound(id.to_string()))?;

        if let Some(status) = update.status {
            record.status = status.to_string();
        }
        if let Some(phone_identity) = update.phone_identity {
            record.phone_identity = phone_identity;
        }
        if let Some(pairing_code) = update.pairing_code {
            record.pairing_code = pairing_code;
        }
        if let Some(last_seen) = update.last_seen {
            record.last_seen = Some(last_seen);
        }
        if let Some(error_message) = update.error_message {
            record.error_message = error_message;
        }
        if let Some(connection_attempts) = update.connection_attempts {
            record.connection_attempts = connection_attempts;
        }
        Ok(())
    }

    async fn create_message(&self, record: &MessageRecord) -> Result<(), WagateError> {
        self.messages
            .lock()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn update_message(&self, id: &str, update: MessageUpdate) -> Result<(), WagateError> {
        let mut messages = self.messages.lock().await;
        let record = messages
            .get_mut(id)
            .ok_or_else(|| WagateError::Internal(format!("message {id} not found")))?;

        if let Some(status) = update.status {
            record.status = status.to_string();
        }
        if let Some(provider_message_id) = update.provider_message_id {
            record.provider_message_id = Some(provider_message_id);
        }
        if let Some(sent_at) = update.sent_at {
            record.sent_at = Some(sent_at);
        }
        if let Some(error_message) = update.error_message {
            record.error_message = Some(error_message);
        }
        Ok(())
    }

    async fn due_scheduled_messages(&self, now: &str) -> Result<Vec<MessageRecord>, WagateError> {
        let messages = self.messages.lock().await;
        let mut due: Vec<MessageRecord> = messages
            .values()
            .filter(|m| {
                m.status == "scheduled"
                    && m.scheduled_at
                        .as_deref()
                        .is_some_and(|at| at <= now)
            })
            .cloned()
            .collect();
        due.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at));
        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wagate_core::{MessageStatus, SessionState};

    fn device(id: &str) -> DeviceRecord {
        DeviceRecord {
            id: id.to_string(),
            name: id.to_string(),
            status: "disconnected".to_string(),
            phone_identity: None,
            pairing_code: None,
            last_seen: None,
            error_message: None,
            connection_attempts: 0,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn update_applies_partial_fields_and_clears() {
        let store = MemoryStore::new();
        store.create_device(&device("d")).await.unwrap();

        store
            .update_device(
                "d",
                DeviceUpdate {
                    status: Some(SessionState::Connected),
                    pairing_code: Some(Some("qr".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        store
            .update_device(
                "d",
                DeviceUpdate {
                    pairing_code: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let record = store.get_device("d").await.unwrap().unwrap();
        assert_eq!(record.status, "connected");
        assert!(record.pairing_code.is_none());
    }

    #[tokio::test]
    async fn due_scheduled_filters_and_orders() {
        let store = MemoryStore::new();
        store.create_device(&device("d")).await.unwrap();
        for (id, status, at) in [
            ("a", "scheduled", Some("2026-01-01T02:00:00Z")),
            ("b", "scheduled", Some("2026-01-01T01:00:00Z")),
            ("c", "scheduled", Some("2026-12-01T00:00:00Z")),
            ("e", "pending", None),
        ] {
            store
                .create_message(&MessageRecord {
                    id: id.to_string(),
                    device_id: "d".to_string(),
                    recipient: "r".to_string(),
                    body: "m".to_string(),
                    status: status.to_string(),
                    provider_message_id: None,
                    sent_at: None,
                    error_message: None,
                    scheduled_at: at.map(str::to_string),
                    created_at: "2026-01-01T00:00:00Z".to_string(),
                })
                .await
                .unwrap();
        }

        let due = store
            .due_scheduled_messages("2026-06-01T00:00:00Z")
            .await
            .unwrap();
        let ids: Vec<&str> = due.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn message_update_marks_failed() {
        let store = MemoryStore::new();
        store
            .create_message(&MessageRecord {
                id: "m".to_string(),
                device_id: "d".to_string(),
                recipient: "r".to_string(),
                body: "x".to_string(),
                status: "pending".to_string(),
                provider_message_id: None,
                sent_at: None,
                error_message: None,
                scheduled_at: None,
                created_at: "2026-01-01T00:00:00Z".to_string(),
            })
            .await
            .unwrap();

        store
            .update_message(
                "m",
                MessageUpdate {
                    status: Some(MessageStatus::Failed),
                    error_message: Some("retries exhausted".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let record = store.message("m").await.unwrap();
        assert_eq!(record.status, "failed");
        assert_eq!(record.error_message.as_deref(), Some("retries exhausted"));
    }
}
