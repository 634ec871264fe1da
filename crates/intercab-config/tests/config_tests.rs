// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the intercab configuration system.

use intercab_config::diagnostic::{ConfigError, KeyHint};
use intercab_config::model::IntercabConfig;
use intercab_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_intercab_config() {
    let toml = r#"
[service]
name = "intercab-test"
log_level = "debug"

[storage]
database_path = "/tmp/test.db"
wal_mode = false

[telegram]
rider_token = "1:R"
driver_token = "2:D"
operator_token = "3:O"

[operator]
login = "admin"
password = "hunter2"
bootstrap_ids = [111, 222]

[dispatch]
order_debounce_ms = 1000
contact_debounce_ms = 1500
list_debounce_ms = 900
utc_offset_hours = 5
currency = "KZT"
max_passengers = 6
earliest_hour = 6
latest_hour = 22

[gateway]
enabled = true
host = "0.0.0.0"
port = 9090
webhook_secret = "whsec"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.name, "intercab-test");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.telegram.rider_token.as_deref(), Some("1:R"));
    assert_eq!(config.telegram.driver_token.as_deref(), Some("2:D"));
    assert_eq!(config.telegram.operator_token.as_deref(), Some("3:O"));
    assert_eq!(config.operator.login.as_deref(), Some("admin"));
    assert_eq!(config.operator.bootstrap_ids, vec![111, 222]);
    assert_eq!(config.dispatch.order_debounce_ms, 1000);
    assert_eq!(config.dispatch.utc_offset_hours, 5);
    assert_eq!(config.dispatch.currency, "KZT");
    assert_eq!(config.dispatch.max_passengers, 6);
    assert_eq!(config.dispatch.earliest_hour, 6);
    assert!(config.gateway.enabled);
    assert_eq!(config.gateway.port, 9090);
    assert_eq!(config.gateway.webhook_secret.as_deref(), Some("whsec"));
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.service.name, "intercab");
    assert_eq!(config.service.log_level, "info");
    assert!(config.storage.wal_mode);
    assert!(config.telegram.rider_token.is_none());
    assert!(config.operator.login.is_none());
    assert!(config.operator.bootstrap_ids.is_empty());
    assert_eq!(config.dispatch.order_debounce_ms, 1500);
    assert_eq!(config.dispatch.contact_debounce_ms, 2000);
    assert_eq!(config.dispatch.list_debounce_ms, 1500);
    assert_eq!(config.dispatch.utc_offset_hours, 3);
    assert_eq!(config.dispatch.currency, "RUB");
    assert_eq!(config.dispatch.max_passengers, 8);
    assert_eq!(config.dispatch.earliest_hour, 0);
    assert_eq!(config.dispatch.latest_hour, 23);
    assert!(!config.gateway.enabled);
    assert_eq!(config.gateway.port, 8080);
    assert!(config.gateway.webhook_secret.is_none());
}

/// A dotted override (what `INTERCAB_TELEGRAM_RIDER_TOKEN` maps to) lands on
/// `telegram.rider_token`, not `telegram.rider.token`.
#[test]
fn dotted_override_sets_rider_token() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let toml_content = r#"
[telegram]
rider_token = "from-toml"
"#;

    let config: IntercabConfig = Figment::new()
        .merge(Serialized::defaults(IntercabConfig::default()))
        .merge(Toml::string(toml_content))
        .merge(("telegram.rider_token", "from-env"))
        .extract()
        .expect("should merge override");

    assert_eq!(config.telegram.rider_token.as_deref(), Some("from-env"));
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: IntercabConfig = Figment::new()
        .merge(Serialized::defaults(IntercabConfig::default()))
        .merge(Toml::file("/nonexistent/path/intercab.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.service.name, "intercab");
}

/// Unexpected top-level section is rejected by deny_unknown_fields.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[payments]
provider = "acme"
"#;

    let errors = load_and_validate_str(toml).expect_err("unknown top-level section should be rejected");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::UnknownSection { name, .. } if name == "payments")),
        "got: {errors:?}"
    );
}

/// A misspelled key gets a spelling hint from its own section, with a span.
#[test]
fn misspelled_key_is_reported_with_hint_and_span() {
    let toml = r#"
[telegram]
rider_tokn = "abc"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    assert!(
        errors.iter().any(|e| matches!(
            e,
            ConfigError::UnknownKey { section, key, hint: KeyHint::Typo("rider_token"), span: Some(_), .. }
                if section == "telegram" && key == "rider_tokn"
        )),
        "got: {errors:?}"
    );
}

/// A valid key under the wrong header is pointed at its own section.
#[test]
fn misplaced_key_points_to_its_section() {
    let toml = r#"
[telegram]
rider_token = "1:R"
currency = "EUR"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let help: Vec<String> = errors
        .iter()
        .filter_map(|e| miette::Diagnostic::help(e).map(|h| h.to_string()))
        .collect();
    assert!(
        help.iter().any(|h| h == "`currency` belongs in [dispatch]"),
        "got: {help:?}"
    );
}

/// Invalid type (string where number expected) produces a clear message.
#[test]
fn invalid_type_is_reported() {
    let toml = r#"
[gateway]
port = "eighty"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. }) || e.to_string().contains("port")),
        "got: {errors:?}"
    );
}

/// ConfigError can be rendered using miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        section: "dispatch".to_string(),
        key: "curency".to_string(),
        hint: KeyHint::Typo("currency"),
        span: None,
        src: None,
    };
    assert!(error.code().is_some());
    let help = error.help().map(|h| h.to_string()).unwrap_or_default();
    assert!(help.contains("did you mean `currency`"), "got: {help}");
    assert!(help.contains("max_passengers"), "got: {help}");

    let handler = GraphicalReportHandler::new();
    let mut buf = String::new();
    handler
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("curency"));
}

/// Validation errors surface through the high-level loader.
#[test]
fn validation_runs_after_deserialization() {
    let toml = r#"
[dispatch]
earliest_hour = 22
latest_hour = 8
"#;

    let errors = load_and_validate_str(toml).expect_err("inverted window should fail");
    assert!(errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("earliest_hour"))
    ));
}

/// An explicit file path is loaded and validated.
#[test]
fn load_and_validate_from_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("intercab.toml");
    std::fs::write(
        &path,
        "[storage]\ndatabase_path = \"/var/lib/intercab/test.db\"\n\n[operator]\nbootstrap_ids = [42]\n",
    )
    .expect("write config");

    let config = load_and_validate_path(&path).expect("file config should validate");
    assert_eq!(config.storage.database_path, "/var/lib/intercab/test.db");
    assert_eq!(config.operator.bootstrap_ids, vec![42]);
}
