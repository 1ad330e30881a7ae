// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Wagate multi-device session manager.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Wagate workspace. External collaborators
//! (session driver, persistence, event sink) implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::WagateError;
pub use types::{DeviceId, MessageId, MessageStatus, SessionState};

// Re-export all capability traits at crate root.
pub use traits::{DeviceStore, DriverFactory, EventSink, SessionDriver};
