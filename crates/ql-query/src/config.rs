//! Command-line configuration parsed from environment variables.
//!
//! Every setting can be supplied through a `QL_QUERY_` environment variable
//! and overridden by the matching command-line flag.

use std::env;
use std::str::FromStr;

use quodlibet_query::{DEFAULT_STAR, QueryOptions};

use crate::error::CliError;

/// Log level enumeration matching tracing crate levels.
///
/// Defaults to `Warn` so filtered records are not buried in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Most verbose logging, including every lexed query and regex rewrite.
    Trace,
    /// Query interpretation fallbacks.
    Debug,
    /// Per-command summaries.
    Info,
    /// Warning messages for potentially problematic situations.
    #[default]
    Warn,
    /// Error messages for failures.
    Error,
}

impl FromStr for LogLevel {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(CliError::InvalidConfig(format!(
                "unknown log level '{s}', expected one of: trace, debug, info, warn, error"
            ))),
        }
    }
}

impl LogLevel {
    /// Convert to a tracing filter directive string.
    #[must_use]
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

const LOG_LEVEL_VAR: &str = "QL_QUERY_LOG_LEVEL";
const STAR_VAR: &str = "QL_QUERY_STAR";
const DIACRITICS_VAR: &str = "QL_QUERY_DIACRITICS";

/// Configuration for the `ql-query` binary.
///
/// # Environment Variables
///
/// - `QL_QUERY_LOG_LEVEL`: log level (trace, debug, info, warn, error)
/// - `QL_QUERY_STAR`: comma-separated star tags, e.g. `artist,album,title`
/// - `QL_QUERY_DIACRITICS`: whether free-text words ignore accents
///   (`true`/`false`, `1`/`0`, `yes`/`no`, `on`/`off`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: LogLevel,
    /// Tags searched by terms that name no tag.
    pub star: Vec<String>,
    /// Whether free-text words also match accented spellings.
    pub match_diacritics: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            star: DEFAULT_STAR.iter().map(ToString::to_string).collect(),
            match_diacritics: true,
        }
    }
}

impl CliConfig {
    /// Load configuration from the process environment.
    ///
    /// Falls back to defaults for missing values.
    ///
    /// # Errors
    ///
    /// Returns `CliError::InvalidConfig` if an environment variable contains
    /// an invalid value.
    pub fn from_env() -> Result<Self, CliError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns `CliError::InvalidConfig` if a variable holds an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CliError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let log_level = match lookup(LOG_LEVEL_VAR) {
            Some(val) => val.parse()?,
            None => defaults.log_level,
        };

        let star = match lookup(STAR_VAR) {
            Some(val) => parse_star(&val)?,
            None => defaults.star,
        };

        let match_diacritics = match lookup(DIACRITICS_VAR) {
            Some(val) => parse_flag(&val).ok_or_else(|| {
                CliError::InvalidConfig(format!(
                    "invalid {DIACRITICS_VAR} value '{val}', expected true or false"
                ))
            })?,
            None => defaults.match_diacritics,
        };

        Ok(Self {
            log_level,
            star,
            match_diacritics,
        })
    }

    /// Apply optional overrides to an existing configuration.
    ///
    /// This is intended for CLI overrides that should take precedence over
    /// environment-based defaults.
    #[must_use]
    pub fn apply_overrides(
        mut self,
        log_level: Option<LogLevel>,
        star: Option<Vec<String>>,
        match_diacritics: Option<bool>,
    ) -> Self {
        if let Some(level) = log_level {
            self.log_level = level;
        }

        if let Some(tags) = star {
            self.star = tags;
        }

        if let Some(enabled) = match_diacritics {
            self.match_diacritics = enabled;
        }

        self
    }

    /// Create a new configuration with the specified log level.
    #[must_use]
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Options handed to the query engine.
    #[must_use]
    pub fn query_options(&self) -> QueryOptions {
        QueryOptions::default()
            .with_star(self.star.iter().cloned())
            .with_match_diacritics(self.match_diacritics)
    }
}

/// Split a comma-separated tag list, rejecting lists with no tags.
///
/// # Errors
///
/// Returns `CliError::InvalidConfig` when no tag remains after trimming.
pub fn parse_star(value: &str) -> Result<Vec<String>, CliError> {
    let tags: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    if tags.is_empty() {
        return Err(CliError::InvalidConfig(format!(
            "star tag list '{value}' names no tags"
        )));
    }
    Ok(tags)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    reason = "tests require explicit panic messages for debugging failures"
)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[rstest]
    #[case("trace", LogLevel::Trace)]
    #[case("Debug", LogLevel::Debug)]
    #[case("INFO", LogLevel::Info)]
    #[case("warning", LogLevel::Warn)]
    #[case("error", LogLevel::Error)]
    fn log_level_parses_valid_values(#[case] text: &str, #[case] level: LogLevel) {
        assert_eq!(text.parse::<LogLevel>().ok(), Some(level));
        assert!(!level.as_filter_str().is_empty());
    }

    #[test]
    fn log_level_rejects_invalid_values() {
        let result = "loud".parse::<LogLevel>();
        assert!(result.unwrap_err().to_string().contains("unknown log level"));
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = CliConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.star, vec!["artist", "album", "title"]);
        assert!(config.match_diacritics);
    }

    #[test]
    fn environment_values_are_read() {
        let config = CliConfig::from_lookup(lookup_from(&[
            ("QL_QUERY_LOG_LEVEL", "debug"),
            ("QL_QUERY_STAR", " Genre , comment,, "),
            ("QL_QUERY_DIACRITICS", "off"),
        ]))
        .unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.star, vec!["genre", "comment"]);
        assert!(!config.match_diacritics);
    }

    #[rstest]
    #[case("QL_QUERY_LOG_LEVEL", "chatty")]
    #[case("QL_QUERY_STAR", " , ")]
    #[case("QL_QUERY_DIACRITICS", "maybe")]
    fn invalid_environment_values_are_rejected(#[case] key: &str, #[case] value: &str) {
        let err = CliConfig::from_lookup(lookup_from(&[(key, value)])).unwrap_err();
        assert!(err.to_string().starts_with("invalid configuration"));
    }

    #[test]
    fn apply_overrides_updates_selected_fields() {
        let config = CliConfig::default().apply_overrides(
            Some(LogLevel::Error),
            Some(vec!["genre".into()]),
            Some(false),
        );
        assert_eq!(config.log_level, LogLevel::Error);
        assert_eq!(config.star, vec!["genre"]);
        assert!(!config.match_diacritics);

        let config = CliConfig::default().apply_overrides(None, None, None);
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn query_options_mirror_the_configuration() {
        let config = CliConfig::default().apply_overrides(None, Some(vec!["genre".into()]), Some(false));
        let options = config.query_options();
        assert_eq!(options.star, vec!["genre".to_string()]);
        assert!(!options.match_diacritics);
    }
}
