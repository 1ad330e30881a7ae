// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multi-device messaging session manager.
//!
//! [`SessionManager`] owns a registry of live device sessions and drives
//! pairing, connection, delivery, scheduling, and health monitoring on top of
//! pluggable collaborators: a `SessionDriver` factory for the external
//! automation engine, a `DeviceStore` for persistence, and an `EventSink`
//! for outward notifications.
//!
//! The periodic loops are started with [`SessionManager::start`] and stopped
//! via the passed `CancellationToken`; each loop body is also exposed as a
//! public `run_*_tick` method so hosts and tests can drive it deterministically.

pub mod cleanup;
pub mod delivery;
pub mod health;
pub mod lifecycle;
pub mod phone;
pub mod registry;
pub mod scheduler;
pub mod session;

pub use lifecycle::SessionManager;
pub use registry::SessionRegistry;
pub use session::DeviceSession;
