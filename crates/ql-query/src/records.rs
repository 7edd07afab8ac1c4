//! JSON-lines records fed to the `filter` command.

use std::collections::BTreeMap;

use quodlibet_query::Record;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    fn as_text(&self) -> String {
        match self {
            Self::Number(value) => value.to_string(),
            Self::Text(text) => text.clone(),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum TagValue {
    One(Scalar),
    Many(Vec<Scalar>),
}

impl TagValue {
    fn scalars(&self) -> &[Scalar] {
        match self {
            Self::One(scalar) => std::slice::from_ref(scalar),
            Self::Many(list) => list,
        }
    }
}

/// A record parsed from one JSON object.
///
/// Values may be strings, numbers, or arrays of those. Numeric tags use the
/// `~#name` convention, though a plain `name` holding a number works too.
///
/// # Examples
/// ```
/// use ql_query::records::JsonRecord;
/// use quodlibet_query::Record;
/// let record: JsonRecord =
///     serde_json::from_str(r#"{"artist": ["A", "B"], "~#rating": 0.5}"#)
///         .expect("record is valid JSON");
/// assert_eq!(record.values_for("artist"), vec!["A", "B"]);
/// assert_eq!(record.numeric("rating"), Some(0.5));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct JsonRecord {
    tags: BTreeMap<String, TagValue>,
}

impl Record for JsonRecord {
    fn values_for(&self, tag: &str) -> Vec<String> {
        self.tags
            .get(tag)
            .map(|value| value.scalars().iter().map(Scalar::as_text).collect())
            .unwrap_or_default()
    }

    fn numeric(&self, tag: &str) -> Option<f64> {
        self.tags
            .get(&format!("~#{tag}"))
            .or_else(|| self.tags.get(tag))
            .and_then(|value| value.scalars().first())
            .and_then(Scalar::as_number)
    }

    fn contains(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test fixtures are valid JSON")]
mod tests {
    use super::*;

    fn record(json: &str) -> JsonRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn strings_numbers_and_lists_become_values() {
        let song = record(r#"{"artist": "Nina", "genre": ["Jazz", "Soul"], "year": 1965}"#);
        assert_eq!(song.values_for("artist"), vec!["Nina"]);
        assert_eq!(song.values_for("genre"), vec!["Jazz", "Soul"]);
        assert_eq!(song.values_for("year"), vec!["1965"]);
        assert!(song.values_for("album").is_empty());
        assert!(song.contains("genre"));
    }

    #[test]
    fn numeric_lookups_prefer_the_prefixed_key() {
        let song = record(r#"{"~#playcount": 4, "playcount": "seven", "rating": "0.25"}"#);
        assert_eq!(song.numeric("playcount"), Some(4.0));
        assert_eq!(song.numeric("rating"), Some(0.25));
        assert_eq!(song.numeric("length"), None);
    }

    #[test]
    fn rejects_non_object_lines() {
        assert!(serde_json::from_str::<JsonRecord>("[1, 2]").is_err());
        assert!(serde_json::from_str::<JsonRecord>(r#"{"nested": {"a": 1}}"#).is_err());
    }
}
