// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Wagate integration tests.
//!
//! Provides mock collaborators for fast, deterministic, CI-runnable tests
//! without external services.
//!
//! # Components
//!
//! - [`MockDriver`] / [`MockDriverFactory`] - Scripted session driver with
//!   event injection and send capture
//! - [`MemoryStore`] - In-memory `DeviceStore`
//! - [`RecordingEventSink`] / [`NoopEventSink`] - Event sinks for assertions

pub mod memory_store;
pub mod mock_driver;
pub mod mock_events;

pub use memory_store::MemoryStore;
pub use mock_driver::{MockDriver, MockDriverFactory, MockDriverState, SentMessage};
pub use mock_events::{NoopEventSink, PublishedEvent, RecordingEventSink};
