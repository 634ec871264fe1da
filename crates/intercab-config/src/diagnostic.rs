// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config diagnostics that know the intercab section layout.
//!
//! Figment reports an unknown key with the field list of the struct it was
//! parsing. That is enough for a spelling hint, but the common mistake in an
//! intercab file is a correct key under the wrong header (`currency` under
//! `[telegram]`), so every unknown key is first looked up in the other
//! sections.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score above which a spelling hint is offered.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Every section of `intercab.toml` and the keys it accepts.
pub const SECTIONS: &[(&str, &[&str])] = &[
    ("service", &["name", "log_level"]),
    ("storage", &["database_path", "wal_mode"]),
    ("telegram", &["rider_token", "driver_token", "operator_token"]),
    ("operator", &["login", "password", "bootstrap_ids"]),
    (
        "dispatch",
        &[
            "order_debounce_ms",
            "contact_debounce_ms",
            "list_debounce_ms",
            "utc_offset_hours",
            "currency",
            "max_passengers",
            "earliest_hour",
            "latest_hour",
        ],
    ),
    ("gateway", &["enabled", "host", "port", "webhook_secret"]),
];

/// What to tell the user about an unknown key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyHint {
    /// The key is valid, but in the named section.
    Misplaced(&'static str),
    /// A valid key of the same section with a close spelling.
    Typo(&'static str),
    None,
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown section `[{name}]`")]
    #[diagnostic(
        code(intercab::config::unknown_section),
        help("{}", section_help(*suggestion))
    )]
    UnknownSection {
        name: String,
        suggestion: Option<&'static str>,
        #[label("not an intercab section")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("unknown key `{key}` in [{section}]")]
    #[diagnostic(
        code(intercab::config::unknown_key),
        help("{}", key_help(section, key, *hint))
    )]
    UnknownKey {
        section: String,
        key: String,
        hint: KeyHint,
        #[label("this key is not recognized here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for `{key}`: {detail}")]
    #[diagnostic(code(intercab::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        /// Dotted path, e.g. `gateway.port`.
        key: String,
        detail: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(code(intercab::config::missing_key))]
    MissingKey { key: String },

    /// A value that parsed but makes no sense, from [`crate::validation`].
    #[error("validation error: {message}")]
    #[diagnostic(code(intercab::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(intercab::config::other))]
    Other(String),
}

/// Keys accepted by `section`, if it is one.
pub fn section_keys(section: &str) -> Option<&'static [&'static str]> {
    SECTIONS
        .iter()
        .find(|(name, _)| *name == section)
        .map(|(_, keys)| *keys)
}

/// Decides the hint for `key` found under `[section]`.
pub fn hint_for(section: &str, key: &str) -> KeyHint {
    if let Some((home, _)) = SECTIONS
        .iter()
        .find(|(name, keys)| *name != section && keys.contains(&key))
    {
        return KeyHint::Misplaced(home);
    }
    section_keys(section)
        .and_then(|keys| closest(key, keys))
        .map_or(KeyHint::None, KeyHint::Typo)
}

fn closest(word: &str, candidates: &[&'static str]) -> Option<&'static str> {
    candidates
        .iter()
        .map(|c| (strsim::jaro_winkler(word, c), *c))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c)
}

fn section_help(suggestion: Option<&str>) -> String {
    let all = SECTIONS
        .iter()
        .map(|(name, _)| format!("[{name}]"))
        .collect::<Vec<_>>()
        .join(", ");
    match suggestion {
        Some(s) => format!("did you mean [{s}]? Sections: {all}"),
        None => format!("sections: {all}"),
    }
}

fn key_help(section: &str, key: &str, hint: KeyHint) -> String {
    let accepted = section_keys(section).map(|k| k.join(", ")).unwrap_or_default();
    match hint {
        KeyHint::Misplaced(home) => format!("`{key}` belongs in [{home}]"),
        KeyHint::Typo(k) => format!("did you mean `{k}`? [{section}] accepts: {accepted}"),
        KeyHint::None => format!("[{section}] accepts: {accepted}"),
    }
}

/// Converts every error inside `err` into a diagnostic, attaching a source
/// span when the offending key can be found in one of `sources`
/// (`(path, content)` pairs).
pub fn figment_to_config_errors(err: figment::Error, sources: &[(String, String)]) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.clone();
            match &error.kind {
                Kind::UnknownField(field, _) if path.is_empty() => {
                    let (span, src) = locate_in_sources(&error, sources, None, field);
                    let names: Vec<&'static str> = SECTIONS.iter().map(|(n, _)| *n).collect();
                    ConfigError::UnknownSection {
                        name: field.clone(),
                        suggestion: closest(field, &names),
                        span,
                        src,
                    }
                }
                Kind::UnknownField(field, _) => {
                    let section = path[0].clone();
                    let (span, src) = locate_in_sources(&error, sources, Some(&section), field);
                    ConfigError::UnknownKey {
                        hint: hint_for(&section, field),
                        section,
                        key: field.clone(),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: dotted(&path, field),
                },
                Kind::InvalidType(actual, expected) => {
                    let (span, src) = match path.split_last() {
                        Some((key, section)) => {
                            locate_in_sources(&error, sources, section.first().map(String::as_str), key)
                        }
                        None => (None, None),
                    };
                    ConfigError::InvalidType {
                        key: path.join("."),
                        detail: format!("found {actual}"),
                        expected: expected.clone(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn dotted(path: &[String], field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{}.{field}", path.join("."))
    }
}

fn locate_in_sources(
    error: &figment::error::Error,
    sources: &[(String, String)],
    section: Option<&str>,
    key: &str,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    // Inline strings carry no file source; a single candidate is unambiguous.
    let source = match origin {
        Some(path) => sources.iter().find(|(p, _)| *p == path),
        None if sources.len() == 1 => sources.first(),
        None => None,
    };

    source
        .and_then(|(path, content)| {
            let offset = locate(content, section, key)?;
            Some((
                Some(SourceSpan::new(offset.into(), key.len())),
                Some(NamedSource::new(path, content.clone())),
            ))
        })
        .unwrap_or((None, None))
}

/// Byte offset of `key` inside `[section]`, or of the `[key]` header itself
/// when `section` is `None`. The search stops at the section's end.
pub fn locate(content: &str, section: Option<&str>, key: &str) -> Option<usize> {
    let mut current: Option<&str> = None;
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let body = line.trim();
        if let Some(header) = body.strip_prefix('[').and_then(|b| b.strip_suffix(']')) {
            let header = header.trim();
            if section.is_none() && header == key {
                return line.find(key).map(|at| offset + at);
            }
            current = Some(header);
        } else if current == section
            && let Some((name, _)) = body.split_once('=')
            && name.trim() == key
        {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

/// Prints each error to stderr through miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}
