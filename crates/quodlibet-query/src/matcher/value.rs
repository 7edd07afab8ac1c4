//! Compiled regular-expression sets matched against a single tag value.

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::errors::QueryError;

/// Modifier letters accepted after a `/regex/` literal.
pub(crate) const VALID_FLAGS: &str = "cisld";

/// Options applied when compiling a query pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PatternFlags {
    pub case_insensitive: bool,
    pub dot_all: bool,
}

impl Default for PatternFlags {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            dot_all: false,
        }
    }
}

/// A compiled regular expression along with the query text it came from.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    source: String,
    flags: String,
}

impl Pattern {
    pub(crate) fn compile(
        source: &str,
        flags: &str,
        options: PatternFlags,
    ) -> Result<Self, QueryError> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(options.case_insensitive)
            .dot_matches_new_line(options.dot_all)
            .multi_line(true)
            .build()
            .map_err(|source_err| QueryError::Regex {
                pattern: source.to_string(),
                source: source_err,
            })?;
        Ok(Self {
            regex,
            source: source.to_string(),
            flags: flags.to_string(),
        })
    }

    /// Compile a bare word as a case-insensitive substring search.
    pub(crate) fn literal(word: &str) -> Result<Self, QueryError> {
        Self::compile(&regex::escape(word), "", PatternFlags::default())
    }

    /// The compiled regular expression.
    #[must_use]
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Pattern source after any diacritic expansion.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source.replace('/', "\\/"), self.flags)
    }
}

/// The `RegexpSet` production: a boolean combination of patterns.
#[derive(Debug, Clone)]
pub enum ValueMatcher {
    /// A single pattern searched anywhere in the value.
    Pattern(Pattern),
    /// Every child must match.
    Inter(Vec<ValueMatcher>),
    /// At least one child must match.
    Union(Vec<ValueMatcher>),
    /// The child must not match.
    Neg(Box<ValueMatcher>),
}

impl ValueMatcher {
    /// Intersect patterns, flattening nested intersections.
    ///
    /// A single child is returned unwrapped.
    #[must_use]
    pub fn inter(children: impl IntoIterator<Item = Self>) -> Self {
        let mut flat = Vec::new();
        for child in children {
            match child {
                Self::Inter(nested) => flat.extend(nested),
                other => flat.push(other),
            }
        }
        collapse(flat, Self::Inter)
    }

    /// Unite patterns, flattening nested unions.
    ///
    /// A single child is returned unwrapped.
    #[must_use]
    pub fn union(children: impl IntoIterator<Item = Self>) -> Self {
        let mut flat = Vec::new();
        for child in children {
            match child {
                Self::Union(nested) => flat.extend(nested),
                other => flat.push(other),
            }
        }
        collapse(flat, Self::Union)
    }

    /// Negate a matcher; double negation cancels out.
    #[must_use]
    pub fn neg(child: Self) -> Self {
        match child {
            Self::Neg(inner) => *inner,
            other => Self::Neg(Box::new(other)),
        }
    }

    /// Whether `value` satisfies the set.
    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Pattern(pattern) => pattern.regex.is_match(value),
            Self::Inter(children) => children.iter().all(|c| c.is_match(value)),
            Self::Union(children) => children.iter().any(|c| c.is_match(value)),
            Self::Neg(child) => !child.is_match(value),
        }
    }
}

fn collapse(mut flat: Vec<ValueMatcher>, wrap: fn(Vec<ValueMatcher>) -> ValueMatcher) -> ValueMatcher {
    if flat.len() == 1 {
        if let Some(only) = flat.pop() {
            return only;
        }
    }
    wrap(flat)
}

impl fmt::Display for ValueMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(pattern) => write!(f, "{pattern}"),
            Self::Inter(children) => write_list(f, '&', children),
            Self::Union(children) => write_list(f, '|', children),
            Self::Neg(child) => write!(f, "!{child}"),
        }
    }
}

pub(crate) fn write_list<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    op: char,
    children: &[T],
) -> fmt::Result {
    write!(f, "{op}(")?;
    for (index, child) in children.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{child}")?;
    }
    f.write_str(")")
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test patterns are known to compile")]
mod tests {
    use super::*;

    fn pattern(source: &str) -> ValueMatcher {
        ValueMatcher::Pattern(Pattern::compile(source, "", PatternFlags::default()).unwrap())
    }

    #[test]
    fn literal_patterns_escape_metacharacters() {
        let dots = ValueMatcher::Pattern(Pattern::literal("a.c").unwrap());
        assert!(dots.is_match("xA.Cx"));
        assert!(!dots.is_match("abc"));
    }

    #[test]
    fn default_flags_are_case_insensitive_and_multiline() {
        let anchored = pattern("^two$");
        assert!(anchored.is_match("one\nTWO\nthree"));
    }

    #[test]
    fn case_sensitive_flag_is_honoured() {
        let strict = Pattern::compile(
            "Bar",
            "c",
            PatternFlags {
                case_insensitive: false,
                dot_all: false,
            },
        )
        .unwrap();
        assert!(strict.regex().is_match("Bar"));
        assert!(!strict.regex().is_match("bar"));
        assert_eq!(strict.to_string(), "/Bar/c");
    }

    #[test]
    fn nested_sets_flatten() {
        let set = ValueMatcher::inter([
            pattern("a"),
            ValueMatcher::inter([pattern("b"), pattern("c")]),
        ]);
        assert!(matches!(&set, ValueMatcher::Inter(children) if children.len() == 3));
        assert!(set.is_match("cab"));
        assert!(!set.is_match("ab"));
    }

    #[test]
    fn single_children_collapse_and_double_negation_cancels() {
        assert!(matches!(
            ValueMatcher::union([pattern("a")]),
            ValueMatcher::Pattern(_)
        ));
        let twice = ValueMatcher::neg(ValueMatcher::neg(pattern("a")));
        assert!(matches!(twice, ValueMatcher::Pattern(_)));
    }

    #[test]
    fn renders_in_query_syntax() {
        let set = ValueMatcher::union([pattern("a/b"), ValueMatcher::neg(pattern("c"))]);
        assert_eq!(set.to_string(), r"|(/a\/b/, !/c/)");
    }

    #[test]
    fn invalid_patterns_report_regex_errors() {
        let err = Pattern::compile("(", "", PatternFlags::default()).unwrap_err();
        assert!(matches!(err, QueryError::Regex { ref pattern, .. } if pattern == "("));
    }
}
