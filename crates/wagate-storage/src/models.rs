// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `wagate-core::types` for use across
//! capability trait boundaries. This module re-exports them for convenience
//! within the storage crate.

pub use wagate_core::types::{DeviceRecord, DeviceUpdate, MessageRecord, MessageUpdate};
