//! Error types shared by the lexer, parser and diacritic rewriter.

use std::fmt;
use thiserror::Error;

/// Location and description of a lexing or parsing failure.
///
/// # Examples
/// ```
/// use quodlibet_query::SyntaxErrorInfo;
/// let info = SyntaxErrorInfo::new("expected '('", 3);
/// assert_eq!(info.position, 3);
/// assert_eq!(info.to_string(), "expected '(' at byte 3 (zero-based)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxErrorInfo {
    /// Human-readable description naming what was expected.
    pub message: String,
    /// Byte offset into the whitespace-stripped query string.
    pub position: usize,
}

impl SyntaxErrorInfo {
    /// Create a new error description.
    #[must_use]
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for SyntaxErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {} (zero-based)", self.message, self.position)
    }
}

/// Errors surfaced while turning a query string into a matcher tree.
///
/// # Examples
/// ```
/// use quodlibet_query::{QueryError, SyntaxErrorInfo};
/// let err = QueryError::Parse(SyntaxErrorInfo::new("expected tag", 0));
/// assert!(err.is_recoverable());
/// assert_eq!(err.to_string(), "expected tag at byte 0 (zero-based)");
/// ```
#[derive(Debug, Error)]
pub enum QueryError {
    /// Characters in the input could not be tokenized.
    #[error("{0}")]
    Lex(SyntaxErrorInfo),
    /// The token stream does not follow the grammar.
    #[error("{0}")]
    Parse(SyntaxErrorInfo),
    /// A regular expression in the query failed to compile.
    #[error("the regular expression /{pattern}/ is invalid: {source}")]
    Regex {
        /// Pattern source as handed to the regex engine.
        pattern: String,
        /// Underlying compile error.
        source: regex::Error,
    },
    /// The diacritic rewriter met a construct it cannot reproduce.
    #[error("unsupported regular expression feature: {0}")]
    Unsupported(String),
}

impl QueryError {
    /// Whether the query façade may retry with another interpretation.
    ///
    /// Grammar mismatches and bad regular expressions form one "bad query"
    /// family; lexing failures and unsupported rewrites do not.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Regex { .. })
    }
}

pub(crate) fn lex_error(message: impl Into<String>, position: usize) -> QueryError {
    QueryError::Lex(SyntaxErrorInfo::new(message, position))
}

pub(crate) fn parse_error(message: impl Into<String>, position: usize) -> QueryError {
    QueryError::Parse(SyntaxErrorInfo::new(message, position))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_syntax_error_with_position() {
        let info = SyntaxErrorInfo::new("expected ')'", 4);
        assert_eq!(info.to_string(), "expected ')' at byte 4 (zero-based)");
    }

    #[test]
    fn lex_errors_are_not_recoverable() {
        let err = lex_error("characters left over in string", 2);
        assert!(!err.is_recoverable());
        assert_eq!(
            err.to_string(),
            "characters left over in string at byte 2 (zero-based)"
        );
    }

    #[test]
    fn regex_errors_join_the_parse_family() {
        let err = QueryError::Regex {
            pattern: "(".into(),
            source: regex::Error::Syntax("bad".into()),
        };
        assert!(err.is_recoverable());
        assert!(err.to_string().starts_with("the regular expression /(/ is invalid"));
    }

    #[test]
    fn unsupported_errors_surface_as_is() {
        let err = QueryError::Unsupported("back-references".into());
        assert!(!err.is_recoverable());
        assert_eq!(
            err.to_string(),
            "unsupported regular expression feature: back-references"
        );
    }
}
