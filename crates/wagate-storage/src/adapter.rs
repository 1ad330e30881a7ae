// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `DeviceStore` implementation backed by SQLite.

use async_trait::async_trait;

use wagate_config::model::StorageConfig;
use wagate_core::traits::DeviceStore;
use wagate_core::WagateError;

use crate::database::Database;
use crate::models::{DeviceRecord, DeviceUpdate, MessageRecord, MessageUpdate};
use crate::queries;

/// SQLite-backed device and message store.
///
/// Thin adapter over the typed query modules; owns the serialized
/// connection for its lifetime.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the store described by `config`, running migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, WagateError> {
        let db = Database::open_with_options(&config.database_path, config.wal_mode).await?;
        Ok(Self { db })
    }

    /// Wrap an already-open database handle.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Force any status left over from a previous process run back to
    /// `disconnected`. Call once before creating sessions.
    pub async fn reset_stale_statuses(&self, reason: &str) -> Result<usize, WagateError> {
        queries::devices::reset_stale_statuses(&self.db, reason).await
    }

    /// Checkpoint and close the underlying database.
    pub async fn close(&self) -> Result<(), WagateError> {
        self.db.close().await
    }

    /// The underlying database handle, for queries outside the trait surface.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl DeviceStore for SqliteStore {
    async fn get_device(&self, id: &str) -> Result<Option<DeviceRecord>, WagateError> {
        queries::devices::get_device(&self.db, id).await
    }

    async fn get_all_devices(&self) -> Result<Vec<DeviceRecord>, WagateError> {
        queries::devices::get_all_devices(&self.db).await
    }

    async fn create_device(&self, record: &DeviceRecord) -> Result<(), WagateError> {
        queries::devices::create_device(&self.db, record).await
    }

    async fn update_device(&self, id: &str, update: DeviceUpdate) -> Result<(), WagateError> {
        queries::devices::update_device(&self.db, id, update).await
    }

    async fn create_message(&self, record: &MessageRecord) -> Result<(), WagateError> {
        queries::messages::create_message(&self.db, record).await
    }

    async fn update_message(&self, id: &str, update: MessageUpdate) -> Result<(), WagateError> {
        queries::messages::update_message(&self.db, id, update).await
    }

    async fn due_scheduled_messages(&self, now: &str) -> Result<Vec<MessageRecord>, WagateError> {
        queries::messages::due_scheduled_messages(&self.db, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wagate_core::SessionState;

    async fn open_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("store.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let store = SqliteStore::open(&config).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn store_implements_device_crud_through_trait() {
        let (store, _dir) = open_store().await;
        let store: &dyn DeviceStore = &store;

        store
            .create_device(&DeviceRecord {
                id: "dev-a".to_string(),
                name: "warehouse".to_string(),
                status: "disconnected".to_string(),
                phone_identity: None,
                pairing_code: None,
                last_seen: None,
                error_message: None,
                connection_attempts: 0,
                created_at: "2026-01-01T00:00:00.000Z".to_string(),
            })
            .await
            .unwrap();

        store
            .update_device(
                "dev-a",
                DeviceUpdate {
                    status: Some(SessionState::Connected),
                    phone_identity: Some(Some("966501234567".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let device = store.get_device("dev-a").await.unwrap().unwrap();
        assert_eq!(device.status, "connected");
        assert_eq!(device.phone_identity.as_deref(), Some("966501234567"));
        assert_eq!(store.get_all_devices().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reset_stale_statuses_is_reachable_from_store() {
        let (store, _dir) = open_store().await;
        store
            .create_device(&DeviceRecord {
                id: "dev-b".to_string(),
                name: "stale".to_string(),
                status: "connected".to_string(),
                phone_identity: None,
                pairing_code: None,
                last_seen: None,
                error_message: None,
                connection_attempts: 2,
                created_at: "2026-01-01T00:00:00.000Z".to_string(),
            })
            .await
            .unwrap();

        let reset = store.reset_stale_statuses("restart").await.unwrap();
        assert_eq!(reset, 1);
        let device = store.get_device("dev-b").await.unwrap().unwrap();
        assert_eq!(device.status, "disconnected");
    }
}
