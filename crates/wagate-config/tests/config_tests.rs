// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Wagate configuration system.

use wagate_config::load_config_from_str;

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_wagate_config() {
    let toml = r#"
[storage]
database_path = "/tmp/test.db"
wal_mode = false

[sessions]
dir = "/var/lib/wagate/sessions"
settle_delay_ms = 250

[delivery]
drain_interval_secs = 2
max_retries = 5
send_delay_ms = 1500
default_country_code = "966"

[scheduler]
interval_secs = 30
expiry_hours = 48

[health]
interval_secs = 120
inactivity_threshold_secs = 600
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.storage.database_path, "/tmp/test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.sessions.dir, "/var/lib/wagate/sessions");
    assert_eq!(config.sessions.settle_delay_ms, 250);
    assert_eq!(config.delivery.drain_interval_secs, 2);
    assert_eq!(config.delivery.max_retries, 5);
    assert_eq!(config.delivery.send_delay_ms, 1500);
    assert_eq!(config.delivery.default_country_code, "966");
    assert_eq!(config.scheduler.interval_secs, 30);
    assert_eq!(config.scheduler.expiry_hours, Some(48));
    assert_eq!(config.health.interval_secs, 120);
    assert_eq!(config.health.inactivity_threshold_secs, 600);
}

/// Empty TOML yields compiled defaults.
#[test]
fn empty_toml_yields_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");
    assert_eq!(config.storage.database_path, "wagate.db");
    assert!(config.storage.wal_mode);
    assert_eq!(config.delivery.drain_interval_secs, 5);
    assert_eq!(config.delivery.max_retries, 3);
    assert_eq!(config.scheduler.interval_secs, 10);
    assert!(config.scheduler.expiry_hours.is_none());
    assert_eq!(config.health.inactivity_threshold_secs, 300);
}

/// Unknown field in a section is rejected by deny_unknown_fields.
#[test]
fn unknown_field_in_delivery_produces_error() {
    let toml = r#"
[delivery]
max_retrys = 3
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("max_retrys"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Unknown top-level section is rejected.
#[test]
fn unknown_section_produces_error() {
    let toml = r#"
[metrics]
enabled = true
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown section");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("metrics"),
        "error should mention the unknown section, got: {err_str}"
    );
}

/// Type mismatch on a numeric field is rejected.
#[test]
fn type_mismatch_produces_error() {
    let toml = r#"
[health]
interval_secs = "often"
"#;

    assert!(load_config_from_str(toml).is_err());
}

/// An override merged after TOML wins, the way `WAGATE_*` env vars do.
#[test]
fn later_merge_overrides_toml_value() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };
    use wagate_config::model::WagateConfig;

    let toml = r#"
[delivery]
max_retries = 5
"#;

    let config: WagateConfig = Figment::new()
        .merge(Serialized::defaults(WagateConfig::default()))
        .merge(Toml::string(toml))
        .merge(("delivery.max_retries", 7))
        .extract()
        .expect("should merge override");

    assert_eq!(config.delivery.max_retries, 7);
}

/// `WAGATE_STORAGE_DATABASE_PATH` maps to `storage.database_path`,
/// not `storage.database.path`.
#[test]
fn underscore_key_maps_to_single_field() {
    use figment::{providers::Serialized, Figment};
    use wagate_config::model::WagateConfig;

    let config: WagateConfig = Figment::new()
        .merge(Serialized::defaults(WagateConfig::default()))
        .merge(("storage.database_path", "/srv/wagate/wagate.db"))
        .extract()
        .expect("should set database_path via dot notation");

    assert_eq!(config.storage.database_path, "/srv/wagate/wagate.db");
}

/// Partial section keeps defaults for unspecified keys.
#[test]
fn partial_section_keeps_defaults() {
    let toml = r#"
[delivery]
default_country_code = "49"
"#;

    let config = load_config_from_str(toml).unwrap();
    assert_eq!(config.delivery.default_country_code, "49");
    assert_eq!(config.delivery.max_retries, 3);
    assert_eq!(config.delivery.send_delay_ms, 1000);
}
