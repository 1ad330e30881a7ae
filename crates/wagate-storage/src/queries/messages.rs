// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message record CRUD and scheduled-dispatch queries.

use rusqlite::params;

use wagate_core::WagateError;

use crate::database::Database;
use crate::models::{MessageRecord, MessageUpdate};

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<MessageRecord, rusqlite::Error> {
    Ok(MessageRecord {
        id: row.get(0)?,
        device_id: row.get(1)?,
        recipient: row.get(2)?,
        body: row.get(3)?,
        status: row.get(4)?,
        provider_message_id: row.get(5)?,
        sent_at: row.get(6)?,
        error_message: row.get(7)?,
        scheduled_at: row.get(8)?,
        created_at: row.get(9)?,
    })
}

const MESSAGE_COLUMNS: &str = "id, device_id, recipient, body, status, provider_message_id, \
                               sent_at, error_message, scheduled_at, created_at";

/// Insert a new message record.
pub async fn create_message(db: &Database, record: &MessageRecord) -> Result<(), WagateError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, device_id, recipient, body, status,
                                       provider_message_id, sent_at, error_message,
                                       scheduled_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id,
                    record.device_id,
                    record.recipient,
                    record.body,
                    record.status,
                    record.provider_message_id,
                    record.sent_at,
                    record.error_message,
                    record.scheduled_at,
                    record.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a message by ID.
pub async fn get_message(db: &Database, id: &str) -> Result<Option<MessageRecord>, WagateError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"))?;
            match stmt.query_row(params![id], row_to_message) {
                Ok(message) => Ok(Some(message)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply a partial update to a message record.
pub async fn update_message(
    db: &Database,
    id: &str,
    update: MessageUpdate,
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
            if let Some(provider_message_id) = update.provider_message_id {
                sets.push("provider_message_id = ?");
                values.push(Box::new(provider_message_id));
            }
            if let Some(sent_at) = update.sent_at {
                sets.push("sent_at = ?");
                values.push(Box::new(sent_at));
            }
            if let Some(error_message) = update.error_message {
                sets.push("error_message = ?");
                values.push(Box::new(error_message));
            }

            if sets.is_empty() {
                return Ok(());
            }

            let sql = format!("UPDATE messages SET {} WHERE id = ?", sets.join(", "));
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

/// Scheduled messages whose dispatch time has arrived, oldest first.
///
/// `now` is an RFC 3339 timestamp; the lexicographic comparison is correct
/// because all stored timestamps are UTC in the same format.
pub async fn due_scheduled_messages(
    db: &Database,
    now: &str,
) -> Result<Vec<MessageRecord>, WagateError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE status = 'scheduled' AND scheduled_at IS NOT NULL AND scheduled_at <= ?1
                 ORDER BY scheduled_at ASC"
            ))?;
            let rows = stmt.query_map(params![now], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
