// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session artifact cleanup.
//!
//! The external driver keeps per-device state under `sessions.dir/<device_id>/`,
//! including exclusive lock markers left behind by crashed engine processes.
//! A stale marker makes the next initialize fail with a profile-in-use error,
//! so markers are removed before a session starts and after it is torn down.

use std::path::Path;

use tokio::time::Duration;
use tracing::{debug, warn};

use wagate_config::model::SessionsConfig;

/// Lock marker filenames written by the engine's profile locking.
const LOCK_MARKERS: &[&str] = &["SingletonLock", "SingletonCookie", "SingletonSocket", "LOCK"];

/// Remove stale lock markers for `device_id`, then wait for the filesystem to
/// settle before the directory is reused.
///
/// Best-effort: a marker that cannot be removed is logged and skipped, since
/// the session may still initialize fine without it.
pub async fn cleanup_session_artifacts(config: &SessionsConfig, device_id: &str) {
    let dir = Path::new(&config.dir).join(device_id);
    if !dir.is_dir() {
        return;
    }

    let mut removed = 0usize;
    for marker in LOCK_MARKERS {
        let path = dir.join(marker);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(device_id, path = %path.display(), error = %e, "failed to remove lock marker"),
        }
    }

    match tokio::fs::read_dir(&dir).await {
        Ok(mut entries) => {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("lock") {
                    match tokio::fs::remove_file(&path).await {
                        Ok(()) => removed += 1,
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                        Err(e) => warn!(device_id, path = %path.display(), error = %e, "failed to remove lock file"),
                    }
                }
            }
        }
        Err(e) => warn!(device_id, error = %e, "failed to scan session directory"),
    }

    if removed > 0 {
        debug!(device_id, removed, "removed stale session lock artifacts");
    }
    if config.settle_delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(config.settle_delay_ms)).await;
    }
}
