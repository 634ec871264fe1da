// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./intercab.toml` > `~/.config/intercab/intercab.toml` > `/etc/intercab/intercab.toml`
//! with environment variable overrides via `INTERCAB_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::IntercabConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/intercab/intercab.toml` (system-wide)
/// 3. `~/.config/intercab/intercab.toml` (user XDG config)
/// 4. `./intercab.toml` (local directory)
/// 5. `INTERCAB_*` environment variables
pub fn load_config() -> Result<IntercabConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<IntercabConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(IntercabConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<IntercabConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(IntercabConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Config files in merge order: system-wide, then per-user, then local.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/intercab/intercab.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("intercab").join("intercab.toml"));
    }
    paths.push(PathBuf::from("intercab.toml"));
    paths
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(IntercabConfig::default()));
    for path in search_paths() {
        figment = figment.merge(Toml::file(path));
    }
    figment.merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")`: `INTERCAB_TELEGRAM_RIDER_TOKEN`
/// must map to `telegram.rider_token`, not `telegram.rider.token`.
fn env_provider() -> Env {
    Env::prefixed("INTERCAB_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env var name to its dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for (section, _) in crate::diagnostic::SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("telegram_rider_token"), "telegram.rider_token");
        assert_eq!(map_env_key("dispatch_utc_offset_hours"), "dispatch.utc_offset_hours");
        assert_eq!(map_env_key("gateway_webhook_secret"), "gateway.webhook_secret");
    }

    #[test]
    fn unknown_prefix_passes_through() {
        assert_eq!(map_env_key("something_else"), "something_else");
    }
}
