// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge with fuzzy match suggestions.
//!
//! Turns Figment extraction failures and validation findings into
//! [`ConfigError`] diagnostics that point at the offending key in the TOML
//! source and suggest the closest valid key.

#![allow(unused_assignments)] // emitted by the miette derive

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score above which a known key is offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Hint attached to figment's own missing-field errors.
const MISSING_FIELD_HINT: &str = "add the key to waypoint.toml or set it via the environment";

/// One problem found while loading or validating the configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("`{key}` is not a recognised setting")]
    #[diagnostic(
        code(waypoint::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), known))
    )]
    UnknownKey {
        key: String,
        /// Closest known key, when one is close enough.
        suggestion: Option<String>,
        /// Keys accepted by the enclosing section.
        known: Vec<String>,
        #[label("unrecognised here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: {detail}")]
    #[diagnostic(code(waypoint::config::invalid_type), help("use a value of type {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    /// A setting with no default was never supplied.
    #[error("`{key}` is required")]
    #[diagnostic(code(waypoint::config::missing_key), help("{hint}"))]
    MissingKey { key: String, hint: String },

    #[error("invalid setting: {message}")]
    #[diagnostic(code(waypoint::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(waypoint::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, known: &[String]) -> String {
    let known = known.join(", ");
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Known keys here: {known}"),
        None => format!("known keys here: {known}"),
    }
}

/// Split a figment failure into one diagnostic per underlying error.
///
/// `toml_sources` pairs each file path with its content so unknown keys can
/// be underlined in place.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| convert(error, toml_sources))
        .collect()
}

fn convert(error: figment::Error, toml_sources: &[(String, String)]) -> ConfigError {
    use figment::error::Kind;

    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let (span, src) = find_source_span(&error, field, toml_sources);
            ConfigError::UnknownKey {
                key: field.clone(),
                suggestion: suggest_key(field, expected),
                known: expected.iter().map(|k| k.to_string()).collect(),
                span,
                src,
            }
        }
        Kind::MissingField(field) => ConfigError::MissingKey {
            key: dotted(&error.path, field),
            hint: MISSING_FIELD_HINT.to_string(),
        },
        Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
            key: error.path.join("."),
            detail: format!("found {actual}"),
            expected: expected.clone(),
        },
        _ => ConfigError::Other(error.to_string()),
    }
}

fn dotted(path: &[String], field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{}.{field}", path.join("."))
    }
}

/// Locate the offending key in whichever TOML file the error came from.
fn find_source_span(
    error: &figment::Error,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let from_file = match error.metadata.as_ref().and_then(|m| m.source.as_ref()) {
        Some(figment::Source::File(path)) => path.display().to_string(),
        _ => return (None, None),
    };
    let Some((name, content)) = toml_sources.iter().find(|(p, _)| *p == from_file) else {
        return (None, None);
    };

    find_key_offset(content, &error.path, field)
        .map(|offset| {
            (
                Some(SourceSpan::new(offset.into(), field.len())),
                Some(NamedSource::new(name, content.clone())),
            )
        })
        .unwrap_or((None, None))
}

/// Find the byte offset of `field` inside the `[section]` named by `path[0]`.
///
/// Top-level fields (empty `path`) are searched from the start of the file.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let search_start = match path.first() {
        None => 0,
        Some(section) => {
            let header = format!("[{section}]");
            content.find(&header)? + header.len()
        }
    };

    let mut line_start = search_start;
    for line in content[search_start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(after) = trimmed.strip_prefix(field) {
            if after.starts_with([' ', '\t', '=']) {
                return Some(line_start + (line.len() - trimmed.len()));
            }
        }
        line_start += line.len();
    }
    None
}

/// The known key most similar to `unknown`, if any clears the threshold.
pub fn suggest_key<S: AsRef<str>>(unknown: &str, known: &[S]) -> Option<String> {
    let mut best: Option<(f64, &str)> = None;
    for key in known.iter().map(AsRef::as_ref) {
        let score = strsim::jaro_winkler(unknown, key);
        if score > SUGGESTION_THRESHOLD && best.is_none_or(|(top, _)| score > top) {
            best = Some((score, key));
        }
    }
    best.map(|(_, key)| key.to_string())
}

/// Print every diagnostic to stderr with miette's graphical renderer.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut rendered = String::new();
        match handler.render_report(&mut rendered, error) {
            Ok(()) => eprint!("{rendered}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
    if errors.len() > 1 {
        eprintln!("{} configuration problems found", errors.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggest_credentails_path_for_credentials_path() {
        let valid = &["url", "credentials_path", "request_timeout_secs"];
        assert_eq!(
            suggest_key("credentails_path", valid),
            Some("credentials_path".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        let valid = &["host", "port", "tool_token"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn unknown_key_help_lists_known_keys() {
        let known = vec!["host".to_string(), "port".to_string()];
        assert_eq!(
            unknown_key_help(Some("port"), &known),
            "did you mean `port`? Known keys here: host, port"
        );
        assert_eq!(unknown_key_help(None, &known), "known keys here: host, port");
    }

    #[test]
    fn missing_field_keys_are_dotted() {
        assert_eq!(dotted(&[], "server"), "server");
        assert_eq!(dotted(&["database".to_string()], "url"), "database.url");
    }

    #[test]
    fn find_key_offset_in_section() {
        let content = "[server]\nhost = \"0.0.0.0\"\n\n[agent]\n  timout_secs = 5\n";
        let path = vec!["agent".to_string()];
        let offset = find_key_offset(content, &path, "timout_secs").unwrap();
        assert_eq!(&content[offset..offset + 11], "timout_secs");
    }

    #[test]
    fn find_key_offset_ignores_prefix_matches() {
        let content = "[agent]\nurl_extra = 1\nurl = \"x\"\n";
        let path = vec!["agent".to_string()];
        let offset = find_key_offset(content, &path, "url").unwrap();
        assert_eq!(&content[offset..offset + 5], "url =");
    }
}
