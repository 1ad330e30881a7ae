// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Wagate session manager.

use thiserror::Error;

/// The primary error type used across all Wagate capability traits and core operations.
#[derive(Debug, Error)]
pub enum WagateError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Session driver errors (initialization failure, send failure, probe failure).
    #[error("driver error: {message}")]
    Driver {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Recipient failed phone-number normalization or length validation.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// Outbound payload rejected before reaching the driver (empty body, bad media).
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// No persisted device record exists for the given ID.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WagateError {
    /// Shorthand for a driver error carrying only a message.
    pub fn driver(message: impl Into<String>) -> Self {
        WagateError::Driver {
            message: message.into(),
            source: None,
        }
    }
}
