//! Query lexer converting a search string into typed lexemes.

use crate::errors::{QueryError, lex_error};

use super::literal::decode_escapes;

/// Characters that end a bare tag run.
///
/// `#` only opens a numeric comparison at the start of a token, so numeric
/// tag names such as `~#playcount` lex as one tag.
const TAG_STOP: &[char] = &['=', ')', '|', '&', '/', '<', '>', '!', ','];

/// Classification of a [`Lexeme`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `!`
    Negation,
    /// `&`
    Intersect,
    /// `|`
    Union,
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `=`
    Equals,
    /// `,`
    Comma,
    /// `#`, introducing a numeric comparison list.
    NumCmp,
    /// A bare identifier or literal word.
    Tag,
    /// A regular expression body, from `/.../` or a quoted string.
    Regex,
    /// Modifier letters directly after a closing `/` or quote.
    ReFlags,
    /// One of `<`, `>`, `<=`, `>=`, `!=`.
    RelOp,
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Describe the token class for error messages.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Negation => "'!'",
            Self::Intersect => "'&'",
            Self::Union => "'|'",
            Self::OpenParen => "'('",
            Self::CloseParen => "')'",
            Self::Equals => "'='",
            Self::Comma => "','",
            Self::NumCmp => "'#'",
            Self::Tag => "a tag or word",
            Self::Regex => "a regular expression",
            Self::ReFlags => "regular expression flags",
            Self::RelOp => "a comparison operator",
            Self::Eof => "end of query",
        }
    }
}

/// A single token produced by [`tokenize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    /// Token class.
    pub kind: TokenKind,
    /// Token text; for quoted strings this is the anchored regex source.
    pub text: String,
    /// Byte offset into the whitespace-stripped input.
    pub position: usize,
}

impl Lexeme {
    fn new(kind: TokenKind, text: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }
}

/// Split a query string into lexemes, always ending with [`TokenKind::Eof`].
///
/// Surrounding whitespace is ignored and lexeme positions are relative to the
/// stripped string.
///
/// # Errors
/// Returns [`QueryError::Lex`] when a `/` opens a regular expression that is
/// never closed, the only input no lexing rule accepts.
///
/// # Examples
/// ```
/// use quodlibet_query::{tokenize, TokenKind};
/// let kinds: Vec<_> = tokenize("artist=/bar/c")
///     .expect("query lexes")
///     .into_iter()
///     .map(|lexeme| lexeme.kind)
///     .collect();
/// assert_eq!(
///     kinds,
///     vec![
///         TokenKind::Tag,
///         TokenKind::Equals,
///         TokenKind::Regex,
///         TokenKind::ReFlags,
///         TokenKind::Eof,
///     ]
/// );
/// ```
pub fn tokenize(input: &str) -> Result<Vec<Lexeme>, QueryError> {
    let source = input.trim();
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(&(offset, c)) = chars.get(pos) {
        match c {
            '/' => {
                let Some((next, body)) = scan_delimited(&chars, pos, '/') else {
                    return Err(lex_error("characters left over in string", offset));
                };
                tokens.push(Lexeme::new(
                    TokenKind::Regex,
                    body.replace("\\/", "/"),
                    offset,
                ));
                pos = scan_flags(&chars, next, &mut tokens);
            }
            '"' | '\'' => {
                if let Some((next, body)) = scan_delimited(&chars, pos, c) {
                    let literal = decode_escapes(&body);
                    tokens.push(Lexeme::new(
                        TokenKind::Regex,
                        format!("^{}$", regex::escape(&literal)),
                        offset,
                    ));
                    pos = scan_flags(&chars, next, &mut tokens);
                } else {
                    let (next, run) = scan_tag(&chars, pos);
                    tokens.push(Lexeme::new(TokenKind::Tag, run, offset));
                    pos = next;
                }
            }
            '<' | '>' | '!' => {
                let followed_by_eq = matches!(chars.get(pos + 1), Some((_, '=')));
                if followed_by_eq {
                    tokens.push(Lexeme::new(TokenKind::RelOp, format!("{c}="), offset));
                    pos += 2;
                } else if c == '!' {
                    tokens.push(Lexeme::new(TokenKind::Negation, "!", offset));
                    pos += 1;
                } else {
                    tokens.push(Lexeme::new(TokenKind::RelOp, c.to_string(), offset));
                    pos += 1;
                }
            }
            '=' | '|' | '(' | ')' | '&' | ',' | '#' => {
                tokens.push(Lexeme::new(single_char_kind(c), c.to_string(), offset));
                pos += 1;
            }
            c if c.is_whitespace() => pos += 1,
            _ => {
                let (next, run) = scan_tag(&chars, pos);
                tokens.push(Lexeme::new(TokenKind::Tag, run, offset));
                pos = next;
            }
        }
    }

    tokens.push(Lexeme::new(TokenKind::Eof, "", source.len()));
    log::trace!("lexed {} tokens from {source:?}", tokens.len());
    Ok(tokens)
}

fn single_char_kind(c: char) -> TokenKind {
    match c {
        '=' => TokenKind::Equals,
        '|' => TokenKind::Union,
        '(' => TokenKind::OpenParen,
        ')' => TokenKind::CloseParen,
        '&' => TokenKind::Intersect,
        ',' => TokenKind::Comma,
        _ => TokenKind::NumCmp,
    }
}

/// Scan `delim ... delim` starting at `start`, keeping escapes verbatim.
///
/// Returns the index after the closing delimiter and the raw body.
fn scan_delimited(chars: &[(usize, char)], start: usize, delim: char) -> Option<(usize, String)> {
    let mut body = String::new();
    let mut index = start + 1;
    loop {
        let &(_, c) = chars.get(index)?;
        if c == '\\' {
            let &(_, escaped) = chars.get(index + 1)?;
            body.push('\\');
            body.push(escaped);
            index += 2;
        } else if c == delim {
            return Some((index + 1, body));
        } else {
            body.push(c);
            index += 1;
        }
    }
}

/// Push a `ReFlags` lexeme for the ASCII letters directly at `start`, if any.
///
/// Returns the index after the run.
fn scan_flags(chars: &[(usize, char)], start: usize, tokens: &mut Vec<Lexeme>) -> usize {
    let mut run = String::new();
    let mut index = start;
    while let Some(&(_, c)) = chars.get(index) {
        if !c.is_ascii_alphabetic() {
            break;
        }
        run.push(c);
        index += 1;
    }
    if let Some(&(offset, _)) = chars.get(start).filter(|_| !run.is_empty()) {
        tokens.push(Lexeme::new(TokenKind::ReFlags, run, offset));
    }
    index
}

/// Consume a bare tag run and return it trimmed.
fn scan_tag(chars: &[(usize, char)], start: usize) -> (usize, String) {
    let mut run = String::new();
    let mut index = start;
    while let Some(&(_, c)) = chars.get(index) {
        if TAG_STOP.contains(&c) {
            break;
        }
        run.push(c);
        index += 1;
    }
    (index, run.trim().to_string())
}
