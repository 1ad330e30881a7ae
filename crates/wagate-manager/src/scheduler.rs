// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduled-message dispatch.
//!
//! The scheduler tick scans persistence for `scheduled` records whose time
//! has arrived. Records for a connected device get one delivery attempt and
//! land in `sent` or `failed`; records for an offline device stay `scheduled`
//! and are picked up again on a later tick, unless an expiry window is
//! configured and has elapsed.

use serde_json::json;
use tracing::{debug, warn};

use wagate_core::types::{MessageRecord, MessageStatus, MessageUpdate, SessionState};

use crate::lifecycle::{now_rfc3339, SessionManager};
use crate::phone;

impl SessionManager {
    /// Scan for due scheduled messages and dispatch the deliverable ones.
    pub async fn run_scheduler_tick(&self) {
        let now = now_rfc3339();
        let due = match self.inner.store.due_scheduled_messages(&now).await {
            Ok(due) => due,
            Err(e) => {
                warn!(error = %e, "scheduled message scan failed");
                return;
            }
        };

        for message in due {
            self.dispatch_scheduled(message).await;
        }
    }

    async fn dispatch_scheduled(&self, message: MessageRecord) {
        if self.expire_if_overdue(&message).await {
            return;
        }

        let driver = {
            let Some(handle) = self.inner.registry.get(&message.device_id) else {
                // Device offline: the record stays scheduled.
                return;
            };
            let session = handle.lock().await;
            if session.state != SessionState::Connected {
                return;
            }
            session.driver.clone()
        };

        let recipient = match phone::normalize_recipient(
            &message.recipient,
            &self.inner.config.delivery.default_country_code,
        ) {
            Ok(recipient) => recipient,
            Err(e) => {
                self.fail_scheduled(&message, &format!("invalid recipient: {e}"))
                    .await;
                return;
            }
        };

        match driver.send_text(&recipient, &message.body).await {
            Ok(provider_id) => {
                self.persist_message(
                    &message.id,
                    MessageUpdate {
                        status: Some(MessageStatus::Sent),
                        provider_message_id: Some(provider_id.0),
                        sent_at: Some(now_rfc3339()),
                        error_message: None,
                    },
                )
                .await;
                self.inner
                    .events
                    .publish(
                        "message_sent",
                        json!({
                            "device_id": message.device_id,
                            "message_id": message.id,
                            "recipient": recipient,
                        }),
                    )
                    .await;
                debug!(device_id = %message.device_id, message_id = %message.id, "scheduled message delivered");
            }
            Err(e) => {
                self.fail_scheduled(&message, &format!("scheduled delivery failed: {e}"))
                    .await;
            }
        }
    }

    /// Mark the record failed if it has sat undelivered past the configured
    /// expiry window. Returns `true` if the record was consumed.
    async fn expire_if_overdue(&self, message: &MessageRecord) -> bool {
        let Some(expiry_hours) = self.inner.config.scheduler.expiry_hours else {
            return false;
        };
        let Some(scheduled_at) = message.scheduled_at.as_deref() else {
            return false;
        };

        match chrono::DateTime::parse_from_rfc3339(scheduled_at) {
            Ok(scheduled) => {
                let age = chrono::Utc::now().signed_duration_since(scheduled);
                if age > chrono::Duration::hours(expiry_hours as i64) {
                    self.fail_scheduled(message, "expired before delivery").await;
                    return true;
                }
                false
            }
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "unparseable schedule timestamp");
                self.fail_scheduled(message, "unparseable schedule timestamp")
                    .await;
                true
            }
        }
    }

    async fn fail_scheduled(&self, message: &MessageRecord, reason: &str) {
        self.persist_message(
            &message.id,
            MessageUpdate {
                status: Some(MessageStatus::Failed),
                provider_message_id: None,
                sent_at: None,
                error_message: Some(reason.to_string()),
            },
        )
        .await;
        self.inner
            .events
            .publish(
                "message_failed",
                json!({
                    "device_id": message.device_id,
                    "message_id": message.id,
                    "recipient": message.recipient,
                }),
            )
            .await;
        warn!(device_id = %message.device_id, message_id = %message.id, reason, "scheduled message failed");
    }
}
