// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the intercab dispatch engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level intercab configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IntercabConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Telegram bot tokens, one per role.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Operator credential challenge.
    #[serde(default)]
    pub operator: OperatorConfig,

    /// Conversation and dispatch tuning.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// HTTP read API and payment webhook.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "intercab".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
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
    dirs::data_dir()
        .map(|p| p.join("intercab").join("intercab.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("intercab.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Telegram bot configuration. A role without a token is not started.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    #[serde(default)]
    pub rider_token: Option<String>,

    #[serde(default)]
    pub driver_token: Option<String>,

    #[serde(default)]
    pub operator_token: Option<String>,
}

/// Operator credential challenge configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OperatorConfig {
    /// Login expected at the first challenge step. `None` disables the challenge,
    /// leaving `bootstrap_ids` as the only way to become an operator.
    #[serde(default)]
    pub login: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Platform ids promoted to operator on `/start` without a challenge.
    #[serde(default)]
    pub bootstrap_ids: Vec<i64>,
}

/// Conversation and dispatch tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Window in which a repeated "new order" tap is ignored.
    #[serde(default = "default_order_debounce_ms")]
    pub order_debounce_ms: u64,

    /// Window in which a repeated contact share is ignored.
    #[serde(default = "default_contact_debounce_ms")]
    pub contact_debounce_ms: u64,

    /// Window in which a repeated operator list request is ignored.
    #[serde(default = "default_list_debounce_ms")]
    pub list_debounce_ms: u64,

    /// Offset of the service's local time from UTC, used for pickup times.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_max_passengers")]
    pub max_passengers: u32,

    /// First pickup hour offered by the hour picker (local time).
    #[serde(default)]
    pub earliest_hour: u32,

    /// Last pickup hour offered by the hour picker (local time).
    #[serde(default = "default_latest_hour")]
    pub latest_hour: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            order_debounce_ms: default_order_debounce_ms(),
            contact_debounce_ms: default_contact_debounce_ms(),
            list_debounce_ms: default_list_debounce_ms(),
            utc_offset_hours: default_utc_offset_hours(),
            currency: default_currency(),
            max_passengers: default_max_passengers(),
            earliest_hour: 0,
            latest_hour: default_latest_hour(),
        }
    }
}

fn default_order_debounce_ms() -> u64 {
    1500
}

fn default_contact_debounce_ms() -> u64 {
    2000
}

fn default_list_debounce_ms() -> u64 {
    1500
}

fn default_utc_offset_hours() -> i32 {
    3
}

fn default_currency() -> String {
    "RUB".to_string()
}

fn default_max_passengers() -> u32 {
    8
}

fn default_latest_hour() -> u32 {
    23
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Shared secret for payment webhook signatures. `None` accepts unsigned calls.
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_gateway_host(),
            port: default_gateway_port(),
            webhook_secret: None,
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8080
}
