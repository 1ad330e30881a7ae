// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability trait definitions for the Wagate session manager.
//!
//! All external collaborators (session driver, persistence, event sink) are
//! injected through these traits and use `#[async_trait]` for dynamic
//! dispatch compatibility.

pub mod driver;
pub mod events;
pub mod storage;

// Re-export all traits at the traits module level for convenience.
pub use driver::{DriverFactory, SessionDriver};
pub use events::EventSink;
pub use storage::DeviceStore;
