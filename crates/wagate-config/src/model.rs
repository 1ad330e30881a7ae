// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Wagate session manager.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Wagate configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WagateConfig {
    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Session artifact directory and cleanup settings.
    #[serde(default)]
    pub sessions: SessionsConfig,

    /// Delivery queue and retry settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Scheduled-message dispatch settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Session health monitoring settings.
    #[serde(default)]
    pub health: HealthConfig,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable write-ahead-log journal mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "wagate.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Session artifact directory and cleanup configuration.
///
/// The external driver persists per-device session artifacts (auth state,
/// browser profiles, exclusive lock markers) under `dir/<device_id>/`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionsConfig {
    /// Root directory holding one subdirectory per device.
    #[serde(default = "default_sessions_dir")]
    pub dir: String,

    /// Delay after lock-artifact removal before the directory is reused.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            dir: default_sessions_dir(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

fn default_sessions_dir() -> String {
    ".wagate/sessions".to_string()
}

fn default_settle_delay_ms() -> u64 {
    500
}

/// Delivery queue and retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Interval between drain ticks over connected sessions.
    #[serde(default = "default_drain_interval_secs")]
    pub drain_interval_secs: u64,

    /// Attempts per delivery item before it is marked failed.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between successive sends to the same device.
    #[serde(default = "default_send_delay_ms")]
    pub send_delay_ms: u64,

    /// Country code used to expand bare national numbers (e.g. "966").
    /// Empty string disables expansion; leading-zero numbers are then rejected.
    #[serde(default)]
    pub default_country_code: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            drain_interval_secs: default_drain_interval_secs(),
            max_retries: default_max_retries(),
            send_delay_ms: default_send_delay_ms(),
            default_country_code: String::new(),
        }
    }
}

fn default_drain_interval_secs() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    3
}

fn default_send_delay_ms() -> u64 {
    1000
}

/// Scheduled-message dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Interval between scans for due scheduled messages.
    #[serde(default = "default_scheduler_interval_secs")]
    pub interval_secs: u64,

    /// Hours after which an undeliverable scheduled message is marked failed.
    /// `None` leaves records scheduled until their device reconnects.
    #[serde(default)]
    pub expiry_hours: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_scheduler_interval_secs(),
            expiry_hours: None,
        }
    }
}

fn default_scheduler_interval_secs() -> u64 {
    10
}

/// Session health monitoring configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    /// Interval between liveness sweeps over connected sessions.
    #[serde(default = "default_health_interval_secs")]
    pub interval_secs: u64,

    /// Inactivity threshold beyond which a session is actively probed.
    #[serde(default = "default_inactivity_threshold_secs")]
    pub inactivity_threshold_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_health_interval_secs(),
            inactivity_threshold_secs: default_inactivity_threshold_secs(),
        }
    }
}

fn default_health_interval_secs() -> u64 {
    60
}

fn default_inactivity_threshold_secs() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_intervals() {
        let config = WagateConfig::default();
        assert_eq!(config.delivery.drain_interval_secs, 5);
        assert_eq!(config.delivery.max_retries, 3);
        assert_eq!(config.delivery.send_delay_ms, 1000);
        assert_eq!(config.scheduler.interval_secs, 10);
        assert_eq!(config.health.interval_secs, 60);
        assert_eq!(config.health.inactivity_threshold_secs, 300);
    }

    #[test]
    fn scheduler_expiry_disabled_by_default() {
        let config = WagateConfig::default();
        assert!(config.scheduler.expiry_hours.is_none());
    }

    #[test]
    fn country_code_defaults_empty() {
        let config = WagateConfig::default();
        assert!(config.delivery.default_country_code.is_empty());
    }
}
