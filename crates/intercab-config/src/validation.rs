// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as hour ranges, a usable gateway host, and paired operator credentials.

use crate::diagnostic::ConfigError;
use crate::model::IntercabConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &IntercabConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let dispatch = &config.dispatch;
    if dispatch.latest_hour > 23 {
        fail(format!(
            "dispatch.latest_hour must be between 0 and 23, got {}",
            dispatch.latest_hour
        ));
    }
    if dispatch.earliest_hour > dispatch.latest_hour {
        fail(format!(
            "dispatch.earliest_hour ({}) must not be after dispatch.latest_hour ({})",
            dispatch.earliest_hour, dispatch.latest_hour
        ));
    }
    if !(-12..=14).contains(&dispatch.utc_offset_hours) {
        fail(format!(
            "dispatch.utc_offset_hours must be between -12 and 14, got {}",
            dispatch.utc_offset_hours
        ));
    }
    if dispatch.max_passengers == 0 {
        fail("dispatch.max_passengers must be at least 1".to_string());
    }
    if dispatch.currency.trim().is_empty() {
        fail("dispatch.currency must not be empty".to_string());
    }

    // The challenge needs both halves or neither.
    match (&config.operator.login, &config.operator.password) {
        (Some(_), None) => fail("operator.login is set but operator.password is missing".into()),
        (None, Some(_)) => fail("operator.password is set but operator.login is missing".into()),
        _ => {}
    }

    for (field, token) in [
        ("rider_token", &config.telegram.rider_token),
        ("driver_token", &config.telegram.driver_token),
        ("operator_token", &config.telegram.operator_token),
    ] {
        if let Some(token) = token
            && token.trim().is_empty()
        {
            fail(format!("telegram.{field} must not be empty when set"));
        }
    }

    if config.gateway.enabled {
        let host = config.gateway.host.trim();
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = !host.is_empty()
            && host
                .chars()
                .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            ));
        }
        if config.gateway.port == 0 {
            fail("gateway.port must not be 0".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
