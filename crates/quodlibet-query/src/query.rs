//! The query façade: classify a search string and filter records with it.

use std::fmt;
use std::str::FromStr;

use crate::errors::QueryError;
use crate::matcher::{Node, and_, not_, or_};
use crate::parse::{Parser, tokenize};
use crate::record::Record;

/// Tags searched by words and regular expressions that name no tag.
pub const DEFAULT_STAR: &[&str] = &["artist", "album", "title"];

/// Construction options for [`Query::with_options`].
///
/// # Examples
/// ```
/// use quodlibet_query::QueryOptions;
/// let options = QueryOptions::default()
///     .with_star(["genre", "comment"])
///     .with_match_diacritics(false);
/// assert_eq!(options.star, vec!["genre".to_string(), "comment".to_string()]);
/// assert!(!options.match_diacritics);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Star tags, in search order.
    pub star: Vec<String>,
    /// Whether free-text words also match accented spellings.
    pub match_diacritics: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            star: DEFAULT_STAR.iter().map(ToString::to_string).collect(),
            match_diacritics: true,
        }
    }
}

impl QueryOptions {
    /// Replace the star tags.
    #[must_use]
    pub fn with_star<I, S>(mut self, star: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.star = star.into_iter().map(Into::into).collect();
        self
    }

    /// Toggle diacritic-insensitive matching of free-text words.
    #[must_use]
    pub fn with_match_diacritics(mut self, enabled: bool) -> Self {
        self.match_diacritics = enabled;
        self
    }
}

/// How a search string was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    /// A well-formed structured query.
    Valid,
    /// Plain words searched in the star tags.
    Text,
    /// Neither interpretation parses.
    Invalid,
}

impl QueryType {
    /// Lower-case name of the interpretation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Text => "text",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compiled search string.
///
/// Construction tries, in order: the string as a query whose untagged terms
/// search the star tags; the string as whitespace-separated words that must
/// all occur in some star tag (only when it contains neither `#` nor `=`);
/// and finally the string as a strict structured query, whose error is
/// returned when that fails too.
///
/// # Examples
/// ```
/// use quodlibet_query::{MapRecord, Query, QueryType};
/// let song = MapRecord::new().with("artist", "Nina Simone").with("title", "Sinnerman");
///
/// let structured = Query::new("artist=nina").expect("query parses");
/// assert_eq!(structured.kind(), QueryType::Valid);
/// assert!(structured.search(&song));
///
/// let text = Query::new("simone sinner").expect("words parse");
/// assert_eq!(text.kind(), QueryType::Text);
/// assert!(text.search(&song));
/// ```
#[derive(Debug, Clone)]
pub struct Query {
    source: String,
    kind: QueryType,
    star: Vec<String>,
    matcher: Node,
}

impl Query {
    /// Compile `source` with the default [`QueryOptions`].
    ///
    /// # Errors
    /// Returns the [`QueryError`] of the last interpretation tried.
    pub fn new(source: &str) -> Result<Self, QueryError> {
        Self::with_options(source, &QueryOptions::default())
    }

    /// Compile `source` with explicit options.
    ///
    /// # Errors
    /// A lexing failure or an unsupported regular expression is returned at
    /// once; otherwise the error of the final structured parse is returned.
    pub fn with_options(source: &str, options: &QueryOptions) -> Result<Self, QueryError> {
        let star = options.star.clone();
        let build = |kind, matcher| Self {
            source: source.to_string(),
            kind,
            star: star.clone(),
            matcher,
        };

        let failure = match Parser::new(tokenize(source)?).start_star_query(&star) {
            Ok(matcher) => return Ok(build(QueryType::Valid, matcher)),
            Err(err) if err.is_recoverable() => err,
            Err(err) => return Err(err),
        };
        log::debug!("{source:?} is not a structured query: {failure}");

        if !source.contains(['#', '=']) {
            match text_query(source, &star, options.match_diacritics) {
                Ok(matcher) => return Ok(build(QueryType::Text, matcher)),
                Err(err) => log::debug!("{source:?} is not a text query: {err}"),
            }
        }

        let matcher = Parser::new(tokenize(source)?).start_query()?;
        Ok(build(QueryType::Valid, matcher))
    }

    /// The string the query was built from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// How the string was interpreted; never [`QueryType::Invalid`].
    #[must_use]
    pub fn kind(&self) -> QueryType {
        self.kind
    }

    /// Star tags used for untagged terms.
    #[must_use]
    pub fn star(&self) -> &[String] {
        &self.star
    }

    /// The compiled matcher tree.
    #[must_use]
    pub fn matcher(&self) -> &Node {
        &self.matcher
    }

    /// Whether `record` satisfies the query.
    pub fn search<R: Record + ?Sized>(&self, record: &R) -> bool {
        self.matcher.matches(record)
    }

    /// Keep the records that satisfy the query, in input order.
    pub fn filter<'r, R, I>(&self, records: I) -> Vec<&'r R>
    where
        R: Record + ?Sized + 'r,
        I: IntoIterator<Item = &'r R>,
    {
        if self.matcher.is_true() {
            return records.into_iter().collect();
        }
        records
            .into_iter()
            .filter(|record| self.matcher.matches(*record))
            .collect()
    }

    /// Records matching both queries.
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        Self::combined(self.star, and_(self.matcher, other.matcher))
    }

    /// Records matching either query.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self::combined(self.star, or_(self.matcher, other.matcher))
    }

    /// Records not matching the query.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::combined(self.star, not_(self.matcher))
    }

    fn combined(star: Vec<String>, matcher: Node) -> Self {
        Self {
            source: matcher.to_string(),
            kind: QueryType::Valid,
            star,
            matcher,
        }
    }

    /// Whether `source` compiles as a structured query.
    ///
    /// # Examples
    /// ```
    /// use quodlibet_query::Query;
    /// assert!(Query::is_valid("&(artist=a, !title=b)"));
    /// assert!(!Query::is_valid("two words"));
    /// ```
    #[must_use]
    pub fn is_valid(source: &str) -> bool {
        Self::get_type(source) == QueryType::Valid
    }

    /// Whether `source` compiles to a query matching every record.
    ///
    /// # Examples
    /// ```
    /// use quodlibet_query::Query;
    /// assert!(Query::match_all(""));
    /// assert!(!Query::match_all("foo=bar"));
    /// ```
    #[must_use]
    pub fn match_all(source: &str) -> bool {
        Self::new(source).is_ok_and(|query| query.matcher.is_true())
    }

    /// Whether `source` compiles under any interpretation.
    #[must_use]
    pub fn is_parsable(source: &str) -> bool {
        Self::new(source).is_ok()
    }

    /// Classify `source` without surfacing errors.
    ///
    /// # Examples
    /// ```
    /// use quodlibet_query::{Query, QueryType};
    /// assert_eq!(Query::get_type("#(rating > 0.5)"), QueryType::Valid);
    /// assert_eq!(Query::get_type("a b"), QueryType::Text);
    /// assert_eq!(Query::get_type("#(1<2)"), QueryType::Invalid);
    /// ```
    #[must_use]
    pub fn get_type(source: &str) -> QueryType {
        Self::new(source).map_or(QueryType::Invalid, |query| query.kind)
    }
}

/// Render plain words as `&(/w1/d, /w2/d, ...)` and parse that as a star query.
fn text_query(source: &str, star: &[String], diacritics: bool) -> Result<Node, QueryError> {
    let flags = if diacritics { "d" } else { "" };
    let terms: Vec<String> = source
        .split_whitespace()
        .map(|word| format!("/{}/{flags}", regex::escape(word).replace('/', "\\/")))
        .collect();
    let rewritten = format!("&({})", terms.join(", "));
    Parser::new(tokenize(&rewritten)?).start_star_query(star)
}

impl FromStr for Query {
    type Err = QueryError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Self::new(source)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests exercise query construction")]
mod tests {
    use super::*;
    use crate::record::MapRecord;
    use rstest::rstest;

    fn song(artist: &str, title: &str) -> MapRecord {
        MapRecord::new().with("artist", artist).with("title", title)
    }

    #[rstest]
    #[case("", QueryType::Valid)]
    #[case("artist=bar", QueryType::Valid)]
    #[case("&(foo, !bar)", QueryType::Valid)]
    #[case("/sinner/i", QueryType::Valid)]
    #[case("#(rating > 0.5)", QueryType::Valid)]
    #[case("a b", QueryType::Text)]
    #[case("nina", QueryType::Text)]
    #[case("(live)", QueryType::Text)]
    #[case("&(foo", QueryType::Text)]
    #[case("#(1<2)", QueryType::Invalid)]
    #[case("artist=", QueryType::Invalid)]
    #[case("AC/DC", QueryType::Invalid)]
    #[case("foo=/(/", QueryType::Invalid)]
    fn classifies_search_strings(#[case] source: &str, #[case] expected: QueryType) {
        assert_eq!(Query::get_type(source), expected, "{source}");
    }

    #[test]
    fn lex_errors_surface_without_fallback() {
        let err = Query::new("AC/DC").unwrap_err();
        assert!(matches!(err, QueryError::Lex(_)));
    }

    #[test]
    fn final_error_comes_from_the_structured_parse() {
        let err = Query::new("artist=").unwrap_err();
        assert!(err.to_string().contains("expected a word or regular expression"));
    }

    #[test]
    fn text_queries_need_every_word_in_some_star_tag() {
        let query = Query::new("nina sinner").unwrap();
        assert!(query.search(&song("Nina Simone", "Sinnerman")));
        assert!(!query.search(&song("Nina Simone", "Feeling Good")));
        assert!(!query.search(&MapRecord::new().with("genre", "nina sinner")));
    }

    #[test]
    fn text_queries_escape_regex_metacharacters() {
        let query = Query::new("a.c (live)").unwrap();
        assert_eq!(query.kind(), QueryType::Text);
        assert!(query.search(&song("A.C", "(Live) Set")));
        assert!(!query.search(&song("abc", "(Live) Set")));
    }

    #[test]
    fn text_queries_match_accents_unless_disabled() {
        let record = song("Björk", "Jóga");
        assert!(Query::new("bjork joga").unwrap().search(&record));
        let strict = QueryOptions::default().with_match_diacritics(false);
        let query = Query::with_options("bjork", &strict).unwrap();
        assert!(!query.search(&record));
    }

    #[test]
    fn custom_star_tags_are_searched() {
        let options = QueryOptions::default().with_star(["genre"]);
        let query = Query::with_options("jazz", &options).unwrap();
        assert_eq!(query.star(), ["genre".to_string()]);
        assert!(query.search(&MapRecord::new().with("genre", "Jazz")));
        assert!(!query.search(&song("Jazz", "Jazz")));
    }

    #[test]
    fn filter_keeps_matching_records_in_order() {
        let records = vec![
            song("Nina Simone", "Sinnerman"),
            song("Ella Fitzgerald", "Summertime"),
            song("Nina Simone", "Feeling Good"),
        ];
        let query = Query::new("artist=nina").unwrap();
        let kept = query.filter(&records);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept.first().map(|r| r.values_for("title")), Some(vec!["Sinnerman".to_string()]));
        assert_eq!(Query::new("").unwrap().filter(&records).len(), 3);
    }

    #[test]
    fn queries_compose_after_construction() {
        let nina = Query::new("artist=nina").unwrap();
        let live = Query::new("title=live").unwrap();
        let studio = nina.clone().intersect(live.clone().negate());
        assert_eq!(studio.source(), "&(artist=/nina/, !title=/live/)");
        assert!(studio.search(&song("Nina Simone", "Sinnerman")));
        assert!(!studio.search(&song("Nina Simone", "Sinnerman (Live)")));
        let either = nina.union(live);
        assert!(either.search(&song("Ella", "Live at Berlin")));
    }

    #[test]
    fn parses_from_str_and_displays_source() {
        let query: Query = "  artist = nina ".parse().unwrap();
        assert_eq!(query.to_string(), "  artist = nina ");
    }

    #[test]
    fn match_all_only_for_always_true_trees() {
        assert!(Query::match_all(""));
        assert!(Query::match_all("   "));
        assert!(Query::match_all("|(artist=a, )"));
        assert!(!Query::match_all("foo=bar"));
        assert!(!Query::match_all("AC/DC"));
    }

    #[test]
    fn is_parsable_never_panics() {
        for source in ["", "(", ")", "&(", "#(", "/", "!", "=", "a=|(", "#(a<b<)", "'"] {
            let _ = Query::is_parsable(source);
        }
        assert!(Query::is_parsable("a b"));
        assert!(!Query::is_parsable("#(1<2)"));
    }
}
