//! Tag-scoped leaf of the matcher tree.

use std::fmt;

use crate::record::Record;

use super::value::ValueMatcher;

/// Separator placed between the components of a tied value.
const TIE_JOIN: &str = " - ";

/// Matches when any value of any named tag satisfies a [`ValueMatcher`].
#[derive(Debug, Clone)]
pub struct TagMatch {
    names: Vec<String>,
    value: ValueMatcher,
}

impl TagMatch {
    /// Create a leaf searching `names` with `value`.
    #[must_use]
    pub fn new(names: Vec<String>, value: ValueMatcher) -> Self {
        Self { names, value }
    }

    /// Tag names searched, already lower-cased by the parser.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The pattern set applied to each value.
    #[must_use]
    pub fn value(&self) -> &ValueMatcher {
        &self.value
    }

    /// Whether `record` has a matching value under any of the names.
    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        self.names.iter().any(|name| self.matches_name(record, name))
    }

    fn matches_name<R: Record + ?Sized>(&self, record: &R, name: &str) -> bool {
        if let Some(numeric) = name.strip_prefix("~#") {
            return record
                .numeric(numeric)
                .is_some_and(|value| self.value.is_match(&value.to_string()));
        }
        if let Some(components) = tie_components(name) {
            return self.matches_tie(record, &components);
        }
        // Only stored tags can be skipped; `~` names may be synthesized.
        if !name.starts_with('~') && !record.contains(name) {
            return false;
        }
        record
            .values_for(name)
            .iter()
            .any(|value| self.value.is_match(value))
    }

    fn matches_tie<R: Record + ?Sized>(&self, record: &R, components: &[&str]) -> bool {
        let values: Vec<Vec<String>> = components
            .iter()
            .map(|component| record.values_for(component))
            .collect();
        if values.iter().flatten().any(|value| self.value.is_match(value)) {
            return true;
        }
        let tied = values
            .iter()
            .filter(|v| !v.is_empty())
            .map(|v| v.join(", "))
            .collect::<Vec<_>>()
            .join(TIE_JOIN);
        !tied.is_empty() && self.value.is_match(&tied)
    }
}

/// Split a tied name such as `~artist~title` into its component tags.
///
/// Single synthesized names like `~people` are not ties.
fn tie_components(name: &str) -> Option<Vec<&str>> {
    let rest = name.strip_prefix('~')?;
    let parts: Vec<&str> = rest.split('~').filter(|part| !part.is_empty()).collect();
    (parts.len() > 1).then_some(parts)
}

impl fmt::Display for TagMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.names.join(","), self.value)
    }
}
