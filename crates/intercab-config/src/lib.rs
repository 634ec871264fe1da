// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the intercab dispatch engine.
//!
//! `intercab.toml` has six sections (`[service]`, `[storage]`, `[telegram]`,
//! `[operator]`, `[dispatch]`, `[gateway]`), every one optional. Unknown keys
//! are rejected, `INTERCAB_<SECTION>_<KEY>` variables override file values,
//! and every failure comes back as a list of [`ConfigError`] diagnostics
//! rather than the first one found.
//!
//! ```no_run
//! let config = match intercab_config::load_and_validate() {
//!     Ok(config) => config,
//!     Err(errors) => {
//!         intercab_config::render_errors(&errors);
//!         std::process::exit(1);
//!     }
//! };
//! println!("fares in {}", config.dispatch.currency);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::IntercabConfig;

/// Loads from the search paths plus environment and validates the result.
pub fn load_and_validate() -> Result<IntercabConfig, Vec<ConfigError>> {
    checked(loader::load_config(), read_sources(&loader::search_paths()))
}

/// Loads one explicit file plus environment and validates the result.
pub fn load_and_validate_path(path: &Path) -> Result<IntercabConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_path(path), read_sources(&[path]))
}

/// Loads an inline TOML document and validates the result.
pub fn load_and_validate_str(toml_content: &str) -> Result<IntercabConfig, Vec<ConfigError>> {
    checked(
        loader::load_config_from_str(toml_content),
        || vec![("<inline>".to_string(), toml_content.to_string())],
    )
}

/// Sources are only read once extraction has failed and spans are needed.
fn checked<F>(
    extracted: Result<IntercabConfig, figment::Error>,
    sources: F,
) -> Result<IntercabConfig, Vec<ConfigError>>
where
    F: FnOnce() -> Vec<(String, String)>,
{
    let config =
        extracted.map_err(|err| diagnostic::figment_to_config_errors(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Reads whichever of `paths` exist, keyed by the absolute path figment
/// records as the error source.
fn read_sources<P: AsRef<Path>>(paths: &[P]) -> impl FnOnce() -> Vec<(String, String)> + '_ {
    move || {
        paths
            .iter()
            .filter_map(|path| {
                let path = path.as_ref();
                let content = std::fs::read_to_string(path).ok()?;
                let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
                Some((absolute.display().to_string(), content))
            })
            .collect()
    }
}
