//! The record accessor protocol the matcher tree evaluates against.

use std::collections::BTreeMap;

/// A tagged record, such as a song, that queries are evaluated against.
///
/// Implementations decide how synthesized tags (`~people`, `~filename`) are
/// produced; the engine only asks for values by name and never mutates the
/// record.
///
/// # Examples
/// ```
/// use quodlibet_query::{MapRecord, Record};
/// let song = MapRecord::new()
///     .with("artist", "Nina Simone")
///     .with("~#rating", "0.75");
/// assert_eq!(song.values_for("artist"), vec!["Nina Simone".to_string()]);
/// assert_eq!(song.numeric("rating"), Some(0.75));
/// assert!(!song.contains("album"));
/// ```
pub trait Record {
    /// Text values stored under `tag`; empty when the tag is missing.
    fn values_for(&self, tag: &str) -> Vec<String>;

    /// Numeric value for `tag`, named without the `~#` prefix.
    fn numeric(&self, tag: &str) -> Option<f64>;

    /// Whether the record carries `tag` at all.
    fn contains(&self, tag: &str) -> bool {
        !self.values_for(tag).is_empty()
    }
}

impl<R: Record + ?Sized> Record for &R {
    fn values_for(&self, tag: &str) -> Vec<String> {
        (**self).values_for(tag)
    }

    fn numeric(&self, tag: &str) -> Option<f64> {
        (**self).numeric(tag)
    }

    fn contains(&self, tag: &str) -> bool {
        (**self).contains(tag)
    }
}

impl<R: Record + ?Sized> Record for Box<R> {
    fn values_for(&self, tag: &str) -> Vec<String> {
        (**self).values_for(tag)
    }

    fn numeric(&self, tag: &str) -> Option<f64> {
        (**self).numeric(tag)
    }

    fn contains(&self, tag: &str) -> bool {
        (**self).contains(tag)
    }
}

/// An in-memory record backed by an ordered map of multi-valued tags.
///
/// Numeric lookups try `tag` and then `~#tag`, parsing the first value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapRecord {
    tags: BTreeMap<String, Vec<String>>,
}

impl MapRecord {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` to `tag`, builder style.
    #[must_use]
    pub fn with(mut self, tag: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(tag, value);
        self
    }

    /// Append `value` to the values of `tag`.
    pub fn insert(&mut self, tag: impl Into<String>, value: impl Into<String>) {
        self.tags.entry(tag.into()).or_default().push(value.into());
    }

    /// Iterate over tag names and their values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.tags
            .iter()
            .map(|(tag, values)| (tag.as_str(), values.as_slice()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (tag, value) in iter {
            record.insert(tag, value);
        }
        record
    }
}

impl Record for MapRecord {
    fn values_for(&self, tag: &str) -> Vec<String> {
        self.tags.get(tag).cloned().unwrap_or_default()
    }

    fn numeric(&self, tag: &str) -> Option<f64> {
        self.tags
            .get(tag)
            .or_else(|| self.tags.get(&format!("~#{tag}")))
            .and_then(|values| values.first())
            .and_then(|value| value.trim().parse().ok())
    }

    fn contains(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }
}
