// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concurrent map of live device sessions.
//!
//! The registry is the single source of truth for which devices currently own
//! a driver instance. Insertion is atomic check-and-insert, so two concurrent
//! `create_session` calls for the same device can never both win.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::session::DeviceSession;

/// Shared handle to one live session.
pub type SessionHandle = Arc<Mutex<DeviceSession>>;

/// Registry of live sessions keyed by device ID.
///
/// Callers must clone the `Arc` out and drop the map guard before locking the
/// session mutex; holding a dashmap ref across an await can deadlock.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, SessionHandle>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `session` for `device_id` unless an entry already exists.
    ///
    /// Returns `false` without replacing anything when the device already has
    /// a live session.
    pub fn insert_if_absent(&self, device_id: &str, session: SessionHandle) -> bool {
        match self.sessions.entry(device_id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(session);
                true
            }
        }
    }

    /// Clone out the handle for `device_id`, if live.
    pub fn get(&self, device_id: &str) -> Option<SessionHandle> {
        self.sessions.get(device_id).map(|entry| entry.value().clone())
    }

    /// Remove the entry for `device_id` only if it is still `expected`.
    ///
    /// Teardown paths race against re-creation: a newer generation may already
    /// occupy the slot, and removing it would orphan a healthy session.
    pub fn remove_exact(&self, device_id: &str, expected: &SessionHandle) -> bool {
        self.sessions
            .remove_if(device_id, |_, current| Arc::ptr_eq(current, expected))
            .is_some()
    }

    /// Snapshot of all live sessions, for periodic sweeps.
    pub fn snapshot(&self) -> Vec<(String, SessionHandle)> {
        self.sessions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wagate_core::types::DeviceId;
    use wagate_test_utils::MockDriver;

    fn handle(id: &str) -> SessionHandle {
        let (driver, _) = MockDriver::new();
        Arc::new(Mutex::new(DeviceSession::new(DeviceId::from(id), driver)))
    }

    #[tokio::test]
    async fn second_insert_for_same_device_loses() {
        let registry = SessionRegistry::new();
        let first = handle("dev");
        let second = handle("dev");

        assert!(registry.insert_if_absent("dev", first.clone()));
        assert!(!registry.insert_if_absent("dev", second));
        assert_eq!(registry.len(), 1);

        let live = registry.get("dev").unwrap();
        assert!(Arc::ptr_eq(&live, &first));
    }

    #[tokio::test]
    async fn remove_exact_spares_a_replacement() {
        let registry = SessionRegistry::new();
        let old = handle("dev");
        assert!(registry.insert_if_absent("dev", old.clone()));

        // Simulate teardown losing the race against re-creation.
        assert!(registry.remove_exact("dev", &old));
        let newer = handle("dev");
        assert!(registry.insert_if_absent("dev", newer.clone()));

        assert!(!registry.remove_exact("dev", &old), "stale handle must not evict");
        assert!(registry.get("dev").is_some());
        assert!(registry.remove_exact("dev", &newer));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn snapshot_lists_all_entries() {
        let registry = SessionRegistry::new();
        registry.insert_if_absent("a", handle("a"));
        registry.insert_if_absent("b", handle("b"));

        let mut ids: Vec<String> = registry.snapshot().into_iter().map(|(id, _)| id).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
