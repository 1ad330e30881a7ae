// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device record CRUD operations.

use rusqlite::params;

use wagate_core::WagateError;

use crate::database::Database;
use crate::models::{DeviceRecord, DeviceUpdate};

fn row_to_device(row: &rusqlite::Row<'_>) -> Result<DeviceRecord, rusqlite::Error> {
    Ok(DeviceRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        status: row.get(2)?,
        phone_identity: row.get(3)?,
        pairing_code: row.get(4)?,
        last_seen: row.get(5)?,
        error_message: row.get(6)?,
        connection_attempts: row.get(7)?,
        created_at: row.get(8)?,
    })
}

const DEVICE_COLUMNS: &str = "id, name, status, phone_identity, pairing_code, last_seen, \
                              error_message, connection_attempts, created_at";

/// Create a new device record.
pub async fn create_device(db: &Database, record: &DeviceRecord) -> Result<(), WagateError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO devices (id, name, status, phone_identity, pairing_code,
                                      last_seen, error_message, connection_attempts, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id,
                    record.name,
                    record.status,
                    record.phone_identity,
                    record.pairing_code,
                    record.last_seen,
                    record.error_message,
                    record.connection_attempts,
                    record.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a device by ID.
pub async fn get_device(db: &Database, id: &str) -> Result<Option<DeviceRecord>, WagateError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE id = ?1"))?;
            let result = stmt.query_row(params![id], row_to_device);
            match result {
                Ok(device) => Ok(Some(device)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all devices, most recently created first.
pub async fn get_all_devices(db: &Database) -> Result<Vec<DeviceRecord>, WagateError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DEVICE_COLUMNS} FROM devices ORDER BY created_at DESC"
            ))?;
            let rows = stmt.query_map([], row_to_device)?;
            let mut devices = Vec::new();
            for row in rows {
                devices.push(row?);
            }
            Ok(devices)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply a partial update to a device record.
///
/// Only columns named in the update are touched; `Some(None)` clears a
/// nullable column. A no-op update returns without issuing SQL.
pub async fn update_device(
    db: &Database,
    id: &str,
    update: DeviceUpdate,
) -> Result<(), WagateError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut sets: Vec<&str> = Vec::new();
            let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

            if let Some(status) = update.status {
                sets.push("status = ?");
                values.push(Box::new(status.to_string()));
            }
            if let Some(phone_identity) = update.phone_identity {
                sets.push("phone_identity = ?");
                values.push(Box::new(phone_identity));
            }
            if let Some(pairing_code) = update.pairing_code {
                sets.push("pairing_code = ?");
                values.push(Box::new(pairing_code));
            }
            if let Some(last_seen) = update.last_seen {
                sets.push("last_seen = ?");
                values.push(Box::new(last_seen));
            }
            if let Some(error_message) = update.error_message {
                sets.push("error_message = ?");
                values.push(Box::new(error_message));
            }
            if let Some(connection_attempts) = update.connection_attempts {
                sets.push("connection_attempts = ?");
                values.push(Box::new(connection_attempts));
            }

            if sets.is_empty() {
                return Ok(());
            }
            sets.push("updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')");

            let sql = format!("UPDATE devices SET {} WHERE id = ?", sets.join(", "));
            values.push(Box::new(id));
            conn.execute(
                &sql,
                rusqlite::params_from_iter(values.iter().map(|v| v.as_ref())),
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Force every device left in a non-disconnected status back to `disconnected`.
///
/// Run once at process startup: no live driver survives a restart, so any
/// other persisted status is stale. Returns the number of records reset.
pub async fn reset_stale_statuses(db: &Database, reason: &str) -> Result<usize, WagateError> {
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| {
            let count = conn.execute(
                "UPDATE devices SET status = 'disconnected', pairing_code = NULL,
                 error_message = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE status != 'disconnected'",
                params![reason],
            )?;
            Ok(count)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
