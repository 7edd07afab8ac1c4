//! Recursive-descent parser turning lexemes into a matcher tree.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::diacritic::{DiacriticTable, re_add_variants};
use crate::errors::{QueryError, parse_error};
use crate::matcher::{
    Node, Numcmp, Pattern, PatternFlags, RelOp, VALID_FLAGS, ValueMatcher, is_timestamp_tag,
};

use super::lexer::{Lexeme, TokenKind};
use super::literal::{NumericLiteral, Unit, parse_numeric};

/// Deepest nesting of `!`, `&(...)` and `|(...)` the parser descends into.
const MAX_DEPTH: usize = 256;

/// Parser state: the lexeme vector, a cursor into it and the star tags.
///
/// `star` is only set by [`Parser::start_star_query`]; while it is set, bare
/// regular expressions (and bare words inside a compound query) are matched
/// against those tags.
pub(crate) struct Parser<'s> {
    tokens: Vec<Lexeme>,
    cursor: usize,
    depth: usize,
    star: Option<&'s [String]>,
    now: f64,
    table: &'static DiacriticTable,
}

impl<'s> Parser<'s> {
    pub(crate) fn new(tokens: Vec<Lexeme>) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |elapsed| elapsed.as_secs_f64());
        Self {
            tokens,
            cursor: 0,
            depth: 0,
            star: None,
            now,
            table: DiacriticTable::snapshot(),
        }
    }

    /// Pin the clock used for age comparisons.
    #[cfg(test)]
    pub(crate) fn with_now(mut self, now: f64) -> Self {
        self.now = now;
        self
    }

    /// Parse a structured query that must consume every lexeme.
    pub(crate) fn start_query(mut self) -> Result<Node, QueryError> {
        let node = self.query(false)?;
        self.expect(TokenKind::Eof)?;
        Ok(node)
    }

    /// Parse a query in which untagged terms search `star`.
    pub(crate) fn start_star_query(mut self, star: &'s [String]) -> Result<Node, QueryError> {
        self.star = Some(star);
        let node = self.query(false)?;
        self.expect(TokenKind::Eof)?;
        Ok(node)
    }

    fn peek(&self) -> TokenKind {
        self.kind_at(self.cursor)
    }

    fn kind_at(&self, index: usize) -> TokenKind {
        self.tokens.get(index).map_or(TokenKind::Eof, |l| l.kind)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.cursor)
            .or_else(|| self.tokens.last())
            .map_or(0, |l| l.position)
    }

    fn unexpected(&self, wanted: &str) -> QueryError {
        parse_error(
            format!("expected {wanted}, found {}", self.peek().describe()),
            self.position(),
        )
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Lexeme, QueryError> {
        if self.peek() != kind {
            return Err(self.unexpected(kind.describe()));
        }
        self.bump(kind)
    }

    /// Consume the current lexeme, which the caller has checked is `kind`.
    fn bump(&mut self, kind: TokenKind) -> Result<Lexeme, QueryError> {
        let lexeme = self
            .tokens
            .get(self.cursor)
            .cloned()
            .ok_or_else(|| self.unexpected(kind.describe()))?;
        if lexeme.kind != TokenKind::Eof {
            self.cursor += 1;
        }
        Ok(lexeme)
    }

    fn accept(&mut self, kind: TokenKind) -> bool {
        let matched = self.peek() == kind;
        if matched && kind != TokenKind::Eof {
            self.cursor += 1;
        }
        matched
    }

    /// Run `production` one nesting level deeper, failing past [`MAX_DEPTH`].
    fn descend<T>(
        &mut self,
        production: impl FnOnce(&mut Self) -> Result<T, QueryError>,
    ) -> Result<T, QueryError> {
        if self.depth >= MAX_DEPTH {
            return Err(parse_error("query nested too deeply", self.position()));
        }
        self.depth += 1;
        let result = production(self);
        self.depth -= 1;
        result
    }

    fn query(&mut self, nested: bool) -> Result<Node, QueryError> {
        self.descend(|parser| parser.query_term(nested))
    }

    fn query_term(&mut self, nested: bool) -> Result<Node, QueryError> {
        match self.peek() {
            TokenKind::Union => {
                self.accept(TokenKind::Union);
                Ok(Node::union(self.query_list()?))
            }
            TokenKind::Intersect => {
                self.accept(TokenKind::Intersect);
                Ok(Node::inter(self.query_list()?))
            }
            TokenKind::Negation => {
                self.accept(TokenKind::Negation);
                Ok(Node::neg(self.query(true)?))
            }
            TokenKind::NumCmp => {
                self.accept(TokenKind::NumCmp);
                self.expect(TokenKind::OpenParen)?;
                let comparisons = self.numcmp_list()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(Node::inter(comparisons))
            }
            TokenKind::Tag if nested && self.star.is_some() && !self.starts_tag_list() => {
                self.star_term()
            }
            TokenKind::Tag => self.match_tag(),
            TokenKind::Regex if self.star.is_some() => self.star_term(),
            _ => Ok(Node::True),
        }
    }

    fn query_list(&mut self) -> Result<Vec<Node>, QueryError> {
        self.expect(TokenKind::OpenParen)?;
        let mut children = vec![self.query(true)?];
        while self.accept(TokenKind::Comma) {
            children.push(self.query(true)?);
        }
        self.expect(TokenKind::CloseParen)?;
        Ok(children)
    }

    /// Whether the lexemes at the cursor read `TAG (, TAG)* =`.
    fn starts_tag_list(&self) -> bool {
        let mut index = self.cursor;
        loop {
            if self.kind_at(index) != TokenKind::Tag {
                return false;
            }
            match self.kind_at(index + 1) {
                TokenKind::Equals => return true,
                TokenKind::Comma => index += 2,
                _ => return false,
            }
        }
    }

    fn star_term(&mut self) -> Result<Node, QueryError> {
        let value = match self.peek() {
            TokenKind::Regex => self.regexp()?,
            _ => {
                let word = self.expect(TokenKind::Tag)?;
                ValueMatcher::Pattern(Pattern::literal(&word.text)?)
            }
        };
        let names = self.star.map(<[String]>::to_vec).unwrap_or_default();
        Ok(Node::tag(names, value))
    }

    fn match_tag(&mut self) -> Result<Node, QueryError> {
        let names = self.tag_list()?;
        self.expect(TokenKind::Equals)?;
        let value = self.regexp_set()?;
        Ok(Node::tag(names, value))
    }

    fn tag_list(&mut self) -> Result<Vec<String>, QueryError> {
        let mut names = vec![tag_name(&self.expect(TokenKind::Tag)?)?];
        while self.accept(TokenKind::Comma) {
            names.push(tag_name(&self.expect(TokenKind::Tag)?)?);
        }
        Ok(names)
    }

    fn regexp_set(&mut self) -> Result<ValueMatcher, QueryError> {
        self.descend(Self::regexp_set_term)
    }

    fn regexp_set_term(&mut self) -> Result<ValueMatcher, QueryError> {
        match self.peek() {
            TokenKind::Union => {
                self.accept(TokenKind::Union);
                Ok(ValueMatcher::union(self.regexp_list()?))
            }
            TokenKind::Intersect => {
                self.accept(TokenKind::Intersect);
                Ok(ValueMatcher::inter(self.regexp_list()?))
            }
            TokenKind::Negation => {
                self.accept(TokenKind::Negation);
                Ok(ValueMatcher::neg(self.regexp_set()?))
            }
            TokenKind::Tag => {
                let word = self.bump(TokenKind::Tag)?;
                Ok(ValueMatcher::Pattern(Pattern::literal(&word.text)?))
            }
            TokenKind::Regex => self.regexp(),
            _ => Err(self.unexpected("a word or regular expression")),
        }
    }

    fn regexp_list(&mut self) -> Result<Vec<ValueMatcher>, QueryError> {
        self.expect(TokenKind::OpenParen)?;
        let mut children = vec![self.regexp_set()?];
        while self.accept(TokenKind::Comma) {
            children.push(self.regexp_set()?);
        }
        self.expect(TokenKind::CloseParen)?;
        Ok(children)
    }

    fn regexp(&mut self) -> Result<ValueMatcher, QueryError> {
        let body = self.expect(TokenKind::Regex)?;
        let flags = if self.peek() == TokenKind::ReFlags {
            self.bump(TokenKind::ReFlags)?
        } else {
            Lexeme {
                kind: TokenKind::ReFlags,
                text: String::new(),
                position: self.position(),
            }
        };

        let mut options = PatternFlags::default();
        let mut expand = false;
        for flag in flags.text.chars() {
            match flag {
                'c' => options.case_insensitive = false,
                'i' => options.case_insensitive = true,
                's' => options.dot_all = true,
                'd' => expand = true,
                'l' => {}
                other => {
                    return Err(parse_error(
                        format!("invalid regular expression flag '{other}', expected one of \"{VALID_FLAGS}\""),
                        flags.position,
                    ));
                }
            }
        }

        let source = if expand {
            re_add_variants(&body.text, self.table)?
        } else {
            body.text
        };
        Ok(ValueMatcher::Pattern(Pattern::compile(
            &source,
            &flags.text,
            options,
        )?))
    }

    fn numcmp_list(&mut self) -> Result<Vec<Node>, QueryError> {
        let mut comparisons = vec![self.numcmp()?];
        while self.accept(TokenKind::Comma) {
            comparisons.push(self.numcmp()?);
        }
        Ok(comparisons)
    }

    fn numcmp(&mut self) -> Result<Node, QueryError> {
        let first = self.expect(TokenKind::Tag)?;
        let op = self.relop()?;
        let second = self.expect(TokenKind::Tag)?;
        let comparison = self.comparison(&first, op, &second)?;
        if !matches!(self.peek(), TokenKind::RelOp | TokenKind::Equals) {
            return Ok(comparison);
        }
        let op = self.relop()?;
        let third = self.expect(TokenKind::Tag)?;
        let upper = self.comparison(&second, op, &third)?;
        Ok(Node::inter([comparison, upper]))
    }

    fn relop(&mut self) -> Result<RelOp, QueryError> {
        match self.peek() {
            TokenKind::Equals => {
                self.accept(TokenKind::Equals);
                Ok(RelOp::Eq)
            }
            TokenKind::RelOp => {
                let lexeme = self.bump(TokenKind::RelOp)?;
                RelOp::parse(&lexeme.text).ok_or_else(|| {
                    parse_error(
                        format!("unknown comparison operator '{}'", lexeme.text),
                        lexeme.position,
                    )
                })
            }
            _ => Err(self.unexpected(TokenKind::RelOp.describe())),
        }
    }

    fn comparison(&self, lhs: &Lexeme, op: RelOp, rhs: &Lexeme) -> Result<Node, QueryError> {
        let cmp = match (parse_numeric(&lhs.text), parse_numeric(&rhs.text)) {
            (Some(_), Some(_)) => {
                return Err(parse_error(
                    "numeric comparison needs a tag operand",
                    lhs.position,
                ));
            }
            (None, Some(literal)) => self.against(numeric_tag(lhs)?, op, literal),
            (Some(literal), None) => self.against(numeric_tag(rhs)?, op.mirrored(), literal),
            (None, None) => Numcmp::between_tags(numeric_tag(lhs)?, op, numeric_tag(rhs)?),
        };
        Ok(Node::Numcmp(cmp))
    }

    fn against(&self, tag: String, op: RelOp, literal: NumericLiteral) -> Numcmp {
        let age = literal.unit == Unit::Time && is_timestamp_tag(&tag);
        let cmp = Numcmp::against_literal(tag, op, literal.value);
        if age { cmp.as_age(self.now) } else { cmp }
    }
}

/// Validate and normalise a tag name lexeme.
fn tag_name(lexeme: &Lexeme) -> Result<String, QueryError> {
    if !lexeme.text.is_ascii() {
        return Err(parse_error(
            format!("tag name {:?} is not ASCII", lexeme.text),
            lexeme.position,
        ));
    }
    Ok(lexeme.text.to_ascii_lowercase())
}

/// Tag name of a comparison operand, without any `~#` prefix.
fn numeric_tag(lexeme: &Lexeme) -> Result<String, QueryError> {
    let name = tag_name(lexeme)?;
    Ok(name
        .strip_prefix("~#")
        .map_or_else(|| name.clone(), str::to_string))
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests exercise parser fallibility")]
mod tests {
    use super::*;
    use crate::parse::test_support::{parse_err, parse_ok, parser, star_ok};
    use crate::record::MapRecord;
    use rstest::rstest;

    fn song() -> MapRecord {
        MapRecord::new()
            .with("artist", "Nina Simone")
            .with("album", "Pastel Blues")
            .with("title", "Sinnerman")
            .with("genre", "Jazz")
            .with("~#rating", "0.8")
            .with("~#playcount", "12")
            .with("~#skipcount", "3")
            .with("~#length", "622")
    }

    #[rstest]
    #[case("", "")]
    #[case("artist=nina", "artist=/nina/")]
    #[case("Artist, TITLE = x", "artist,title=/x/")]
    #[case("artist=/a\\/b/c", r"artist=/a\/b/c")]
    #[case("artist=|(a, b)", "artist=|(/a/, /b/)")]
    #[case("artist=&(a, !b)", "artist=&(/a/, !/b/)")]
    #[case("&(artist=a, title=b)", "&(artist=/a/, title=/b/)")]
    #[case("|(artist=a, &(title=b, genre=c))", "|(artist=/a/, &(title=/b/, genre=/c/))")]
    #[case("!artist=a", "!artist=/a/")]
    #[case("!!artist=a", "artist=/a/")]
    #[case("&(artist=a, )", "artist=/a/")]
    #[case("|(artist=a, )", "")]
    #[case("#(rating > 0.5)", "#(rating > 0.5)")]
    #[case("#(0.5 < rating)", "#(rating > 0.5)")]
    #[case("#(playcount > skipcount)", "#(playcount > skipcount)")]
    #[case("#(rating = 1, playcount != 2)", "&(#(rating = 1), #(playcount != 2))")]
    #[case("#(1 < rating < 3)", "&(#(rating > 1), #(rating < 3))")]
    #[case("#(length > 3:00)", "#(length > 180)")]
    #[case("#(~#Rating <= 1)", "#(rating <= 1)")]
    #[case(r#"title="Sinnerman"c"#, "title=/^Sinnerman$/c")]
    #[case("artist=/a/is", "artist=/a/is")]
    fn parses_structured_queries(#[case] input: &str, #[case] rendered: &str) {
        assert_eq!(parse_ok(input).to_string(), rendered);
    }

    #[rstest]
    #[case("artist", "expected '='")]
    #[case("artist=", "expected a word or regular expression")]
    #[case("&(artist=a", "expected ')'")]
    #[case("|artist=a", "expected '('")]
    #[case("artist=a)", "expected end of query")]
    #[case("/foo/", "expected end of query")]
    #[case("artist=/x/q", "invalid regular expression flag 'q'")]
    #[case("ärtist=x", "is not ASCII")]
    #[case("#(1<2)", "numeric comparison needs a tag operand")]
    #[case("#(rating)", "expected a comparison operator")]
    #[case("#(rating > )", "expected a tag or word")]
    fn rejects_malformed_queries(#[case] input: &str, #[case] message: &str) {
        let err = parse_err(input);
        assert!(err.is_recoverable());
        assert!(err.to_string().contains(message), "{input}: {err}");
    }

    #[test]
    fn invalid_regexes_are_regex_errors() {
        let err = parse_err("artist=/(/");
        assert!(matches!(err, QueryError::Regex { .. }));
    }

    #[rstest]
    #[case(format!("{}artist=a", "!".repeat(MAX_DEPTH)))]
    #[case("&(".repeat(MAX_DEPTH + 1))]
    #[case(format!("artist={}a", "!".repeat(100_000)))]
    fn deep_nesting_is_a_parse_error(#[case] input: String) {
        let err = parse_err(&input);
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("query nested too deeply"), "{err}");
    }

    #[test]
    fn nesting_below_the_limit_parses() {
        let input = format!("{}artist=a", "!".repeat(MAX_DEPTH - 2));
        assert_eq!(parse_ok(&input).to_string(), "artist=/a/");
    }

    #[test]
    fn errors_report_the_offending_position() {
        let QueryError::Parse(info) = parse_err("&(artist=a) title") else {
            panic!("expected a parse error");
        };
        assert_eq!(info.position, 12);
    }

    #[rstest]
    #[case("artist=simone", true)]
    #[case("artist=SIMONE", true)]
    #[case("artist=/^simone/", false)]
    #[case("artist=/^Nina/c", true)]
    #[case("artist=/^nina/c", false)]
    #[case(r#"title="sinnerman""#, true)]
    #[case(r#"title="sinner""#, false)]
    #[case("artist,title=sinner", true)]
    #[case("genre=!rock", true)]
    #[case("&(genre=jazz, !artist=ella)", true)]
    #[case("|(genre=rock, album=blues)", true)]
    #[case("#(rating > 0.5)", true)]
    #[case("#(rating >= 0.9)", false)]
    #[case("#(playcount > skipcount)", true)]
    #[case("#(2 < playcount < 20)", true)]
    #[case("#(length < 10 minutes)", false)]
    #[case("#(bitrate > 0)", false)]
    #[case("~#playcount=12", true)]
    #[case(r#"title="Sinnerman"c"#, true)]
    #[case(r#"title="sinnerman"c"#, false)]
    #[case(r#"title="sinnerman"d"#, true)]
    #[case("artist=/^nina/l", true)]
    #[case("artist=/^nina/ic", false)]
    #[case("artist=/^NINA.SIMONE$/cisld", true)]
    fn evaluates_structured_queries(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(parse_ok(input).matches(&song()), expected, "{input}");
    }

    #[test]
    fn dot_all_flag_spans_lines() {
        let record = MapRecord::new().with("comment", "one\ntwo");
        assert!(!parse_ok("comment=/one.two/").matches(&record));
        assert!(parse_ok("comment=/one.two/s").matches(&record));
    }

    #[test]
    fn diacritic_flag_matches_accented_values() {
        let record = MapRecord::new().with("artist", "Björk");
        assert!(!parse_ok("artist=/bjork/").matches(&record));
        assert!(parse_ok("artist=/bjork/d").matches(&record));
    }

    #[test]
    fn quoted_literals_take_the_diacritic_flag() {
        let record = MapRecord::new().with("title", "Jóga");
        assert!(!parse_ok(r#"title="joga""#).matches(&record));
        assert!(parse_ok(r#"title="joga"d"#).matches(&record));
    }

    #[test]
    fn backreferences_under_diacritic_flag_are_unsupported() {
        let err = parse_err(r"artist=/(a)\1/d");
        assert!(matches!(err, QueryError::Unsupported(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn timestamp_tags_compare_ages_against_durations() {
        let now = 1_000_000.0;
        let record = MapRecord::new().with("~#added", "999000");
        let recent = parser("#(added < 1 day)").with_now(now).start_query().unwrap();
        assert!(recent.matches(&record));
        let stale = parser("#(added > 1 hour)").with_now(now).start_query().unwrap();
        assert!(!stale.matches(&record));
    }

    #[test]
    fn timestamps_compare_raw_against_plain_numbers() {
        let record = MapRecord::new().with("~#added", "999000");
        assert!(parse_ok("#(added > 5000)").matches(&record));
    }

    #[rstest]
    #[case("/sinner/", "artist,album,title=/sinner/")]
    #[case("&(nina, !ella)", "&(artist,album,title=/nina/, !artist,album,title=/ella/)")]
    #[case("|(/^nina/, genre=jazz)", "|(artist,album,title=/^nina/, genre=/jazz/)")]
    #[case("!/x/", "!artist,album,title=/x/")]
    #[case("artist=nina", "artist=/nina/")]
    fn star_terms_search_default_tags(#[case] input: &str, #[case] rendered: &str) {
        assert_eq!(star_ok(input).to_string(), rendered);
    }

    #[test]
    fn bare_top_level_words_are_not_star_queries() {
        let star = vec!["artist".to_string()];
        let err = parser("nina").start_star_query(&star).unwrap_err();
        assert!(err.to_string().contains("expected '='"));
    }

    #[test]
    fn tag_lists_win_over_star_terms_inside_compounds() {
        assert_eq!(
            star_ok("&(artist, title=x)").to_string(),
            "artist,title=/x/"
        );
    }
}
