// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery queue and retry engine.
//!
//! Single sends enqueue onto the device's FIFO queue and are drained by the
//! periodic delivery tick: head item sent, failures requeued at the tail
//! until `max_retries` attempts are consumed, then marked `failed` exactly
//! once. Bulk sends bypass the queue and run inline, returning one outcome
//! per recipient.

use serde_json::json;
use tokio::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use wagate_core::types::{
    BulkSendOutcome, DeliveryItem, DeviceId, MessageId, MessageRecord, MessageStatus,
    MessageUpdate, OutboundPayload, SessionState,
};
use wagate_core::{SessionDriver, WagateError};

use crate::lifecycle::{now_rfc3339, SessionManager};
use crate::phone;
use crate::registry::SessionHandle;

impl SessionManager {
    /// Queue a text message for delivery.
    ///
    /// Returns `Ok(false)` when the device has no connected session; the
    /// message is not recorded in that case. Invalid recipients and empty
    /// bodies are rejected with an error.
    pub async fn send_message(
        &self,
        device_id: &DeviceId,
        recipient: &str,
        body: &str,
    ) -> Result<bool, WagateError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(WagateError::InvalidPayload("empty message body".to_string()));
        }
        let payload = OutboundPayload::Text {
            body: body.to_string(),
        };
        self.enqueue(device_id, recipient, body, payload).await
    }

    /// Queue a media message for delivery. The record body stores the caption.
    pub async fn send_media(
        &self,
        device_id: &DeviceId,
        recipient: &str,
        bytes: Vec<u8>,
        mime_type: &str,
        caption: Option<&str>,
    ) -> Result<bool, WagateError> {
        if bytes.is_empty() {
            return Err(WagateError::InvalidPayload("empty media payload".to_string()));
        }
        if mime_type.trim().is_empty() {
            return Err(WagateError::InvalidPayload("missing mime type".to_string()));
        }
        let record_body = caption.unwrap_or("").to_string();
        let payload = OutboundPayload::Media {
            bytes,
            mime_type: mime_type.to_string(),
            caption: caption.map(str::to_string),
        };
        self.enqueue(device_id, recipient, &record_body, payload).await
    }

    /// Queue a location pin for delivery. The record body stores the label.
    pub async fn send_location(
        &self,
        device_id: &DeviceId,
        recipient: &str,
        latitude: f64,
        longitude: f64,
        label: Option<&str>,
    ) -> Result<bool, WagateError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(WagateError::InvalidPayload(format!(
                "coordinates out of range: {latitude},{longitude}"
            )));
        }
        let record_body = label.unwrap_or("").to_string();
        let payload = OutboundPayload::Location {
            latitude,
            longitude,
            label: label.map(str::to_string),
        };
        self.enqueue(device_id, recipient, &record_body, payload).await
    }

    /// Persist a `scheduled` message record for later dispatch.
    ///
    /// The device does not need a live session; the scheduler delivers the
    /// record once it is due and the device is connected. Returns the record ID.
    pub async fn schedule_message(
        &self,
        device_id: &DeviceId,
        recipient: &str,
        body: &str,
        scheduled_at: &str,
    ) -> Result<String, WagateError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(WagateError::InvalidPayload("empty message body".to_string()));
        }
        if chrono::DateTime::parse_from_rfc3339(scheduled_at).is_err() {
            return Err(WagateError::InvalidPayload(format!(
                "scheduled_at is not an RFC 3339 timestamp: {scheduled_at:?}"
            )));
        }
        let normalized = phone::normalize_recipient(
            recipient,
            &self.inner.config.delivery.default_country_code,
        )?;

        let message_id = Uuid::new_v4().to_string();
        self.inner
            .store
            .create_message(&MessageRecord {
                id: message_id.clone(),
                device_id: device_id.0.clone(),
                recipient: normalized,
                body: body.to_string(),
                status: MessageStatus::Scheduled.to_string(),
                provider_message_id: None,
                sent_at: None,
                error_message: None,
                scheduled_at: Some(scheduled_at.to_string()),
                created_at: now_rfc3339(),
            })
            .await?;
        debug!(device_id = %device_id, message_id, scheduled_at, "message scheduled");
        Ok(message_id)
    }

    /// Send `body` to each recipient inline, with `per_recipient_delay_ms`
    /// between recipients, retrying each up to the configured attempt count.
    ///
    /// Returns one outcome per recipient in input order. A failure for one
    /// recipient never aborts the rest.
    pub async fn send_bulk(
        &self,
        device_id: &DeviceId,
        recipients: &[String],
        body: &str,
        per_recipient_delay_ms: u64,
    ) -> Result<Vec<BulkSendOutcome>, WagateError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(WagateError::InvalidPayload("empty message body".to_string()));
        }

        let mut outcomes = Vec::with_capacity(recipients.len());
        for (index, recipient) in recipients.iter().enumerate() {
            if index > 0 && per_recipient_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(per_recipient_delay_ms)).await;
            }
            outcomes.push(self.bulk_send_one(device_id, recipient, body).await);
        }
        Ok(outcomes)
    }

    /// Drain every connected device's queue once.
    pub async fn run_delivery_tick(&self) {
        for (device_id, handle) in self.inner.registry.snapshot() {
            self.drain_device_queue(&device_id, &handle).await;
        }
    }

    async fn enqueue(
        &self,
        device_id: &DeviceId,
        recipient: &str,
        record_body: &str,
        payload: OutboundPayload,
    ) -> Result<bool, WagateError> {
        let normalized = phone::normalize_recipient(
            recipient,
            &self.inner.config.delivery.default_country_code,
        )?;

        let Some(handle) = self.inner.registry.get(&device_id.0) else {
            return Ok(false);
        };
        let mut session = handle.lock().await;
        if session.state != SessionState::Connected {
            return Ok(false);
        }

        let message_id = Uuid::new_v4().to_string();
        self.inner
            .store
            .create_message(&MessageRecord {
                id: message_id.clone(),
                device_id: device_id.0.clone(),
                recipient: normalized.clone(),
                body: record_body.to_string(),
                status: MessageStatus::Pending.to_string(),
                provider_message_id: None,
                sent_at: None,
                error_message: None,
                scheduled_at: None,
                created_at: now_rfc3339(),
            })
            .await?;

        session.queue.push_back(DeliveryItem::new(
            message_id,
            normalized,
            payload,
            self.inner.config.delivery.max_retries,
        ));
        Ok(true)
    }

    /// Drain one device's queue until it empties, the session loses its
    /// connection, or an item needs another attempt on a later tick.
    async fn drain_device_queue(&self, device_id: &str, handle: &SessionHandle) {
        let send_delay = Duration::from_millis(self.inner.config.delivery.send_delay_ms);
        let mut first = true;

        loop {
            let (mut item, driver) = {
                let mut session = handle.lock().await;
                if session.state != SessionState::Connected {
                    return;
                }
                let Some(item) = session.queue.pop_front() else {
                    return;
                };
                (item, session.driver.clone())
            };

            if !first && send_delay > Duration::ZERO {
                tokio::time::sleep(send_delay).await;
            }
            first = false;

            match dispatch(driver.as_ref(), &item).await {
                Ok(provider_id) => {
                    self.persist_message(
                        &item.id,
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
                                "device_id": device_id,
                                "message_id": item.id,
                                "recipient": item.recipient,
                            }),
                        )
                        .await;
                }
                Err(e) => {
                    item.retries += 1;
                    if item.retries >= item.max_retries {
                        warn!(
                            device_id,
                            message_id = %item.id,
                            attempts = item.retries,
                            error = %e,
                            "delivery attempts exhausted"
                        );
                        self.persist_message(
                            &item.id,
                            MessageUpdate {
                                status: Some(MessageStatus::Failed),
                                provider_message_id: None,
                                sent_at: None,
                                error_message: Some(format!(
                                    "failed after {} attempts: {e}",
                                    item.retries
                                )),
                            },
                        )
                        .await;
                        self.inner
                            .events
                            .publish(
                                "message_failed",
                                json!({
                                    "device_id": device_id,
                                    "message_id": item.id,
                                    "recipient": item.recipient,
                                }),
                            )
                            .await;
                    } else {
                        debug!(
                            device_id,
                            message_id = %item.id,
                            retries = item.retries,
                            error = %e,
                            "delivery failed, requeued at tail"
                        );
                        handle.lock().await.queue.push_back(item);
                        // Give the session a breather until the next tick.
                        return;
                    }
                }
            }
        }
    }

    async fn bulk_send_one(
        &self,
        device_id: &DeviceId,
        recipient: &str,
        body: &str,
    ) -> BulkSendOutcome {
        let failure = |error: String, message_id: Option<String>| BulkSendOutcome {
            recipient: recipient.to_string(),
            success: false,
            message_id,
            error: Some(error),
        };

        let normalized = match phone::normalize_recipient(
            recipient,
            &self.inner.config.delivery.default_country_code,
        ) {
            Ok(n) => n,
            Err(e) => return failure(e.to_string(), None),
        };

        let driver = {
            let Some(handle) = self.inner.registry.get(&device_id.0) else {
                return failure("session not connected".to_string(), None);
            };
            let session = handle.lock().await;
            if session.state != SessionState::Connected {
                return failure("session not connected".to_string(), None);
            }
            session.driver.clone()
        };

        let message_id = Uuid::new_v4().to_string();
        let record = MessageRecord {
            id: message_id.clone(),
            device_id: device_id.0.clone(),
            recipient: normalized.clone(),
            body: body.to_string(),
            status: MessageStatus::Pending.to_string(),
            provider_message_id: None,
            sent_at: None,
            error_message: None,
            scheduled_at: None,
            created_at: now_rfc3339(),
        };
        if let Err(e) = self.inner.store.create_message(&record).await {
            return failure(format!("persistence failed: {e}"), None);
        }

        let attempts = self.inner.config.delivery.max_retries.max(1);
        let mut last_error = String::new();
        for _ in 0..attempts {
            match driver.send_text(&normalized, body).await {
                Ok(provider_id) => {
                    self.persist_message(
                        &message_id,
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
                                "device_id": device_id.0,
                                "message_id": message_id,
                                "recipient": normalized,
                            }),
                        )
                        .await;
                    return BulkSendOutcome {
                        recipient: recipient.to_string(),
                        success: true,
                        message_id: Some(message_id),
                        error: None,
                    };
                }
                Err(e) => last_error = e.to_string(),
            }
        }

        self.persist_message(
            &message_id,
            MessageUpdate {
                status: Some(MessageStatus::Failed),
                provider_message_id: None,
                sent_at: None,
                error_message: Some(format!("failed after {attempts} attempts: {last_error}")),
            },
        )
        .await;
        self.inner
            .events
            .publish(
                "message_failed",
                json!({
                    "device_id": device_id.0,
                    "message_id": message_id,
                    "recipient": normalized,
                }),
            )
            .await;
        failure(last_error, Some(message_id))
    }

    /// Persist a message update, logging instead of failing delivery on error.
    pub(crate) async fn persist_message(&self, message_id: &str, update: MessageUpdate) {
        if let Err(e) = self.inner.store.update_message(message_id, update).await {
            warn!(message_id, error = %e, "message state persistence failed");
        }
    }
}

async fn dispatch(
    driver: &dyn SessionDriver,
    item: &DeliveryItem,
) -> Result<MessageId, WagateError> {
    match &item.payload {
        OutboundPayload::Text { body } => driver.send_text(&item.recipient, body).await,
        OutboundPayload::Media {
            bytes,
            mime_type,
            caption,
        } => {
            driver
                .send_media(&item.recipient, bytes, mime_type, caption.as_deref())
                .await
        }
        OutboundPayload::Location {
            latitude,
            longitude,
            label,
        } => {
            driver
                .send_location(&item.recipient, *latitude, *longitude, label.as_deref())
                .await
        }
    }
}
