//! Query lexing and parsing.

mod lexer;
mod literal;
mod parser;
#[cfg(test)]
pub(crate) mod test_support;

use crate::errors::QueryError;
use crate::matcher::Node;

pub use lexer::{Lexeme, TokenKind, tokenize};

pub(crate) use parser::Parser;

/// Parse a structured query; untagged terms are rejected.
///
/// # Errors
/// Returns [`QueryError`] when the query does not lex or parse, or one of its
/// regular expressions does not compile.
///
/// # Examples
/// ```
/// use quodlibet_query::{MapRecord, parse_query};
/// let node = parse_query("&(artist=nina, !title=live)").expect("query parses");
/// assert!(node.matches(&MapRecord::new().with("artist", "Nina Simone")));
/// ```
pub fn parse_query(input: &str) -> Result<Node, QueryError> {
    Parser::new(tokenize(input)?).start_query()
}

/// Parse a query in which bare regular expressions, and bare words inside
/// `&(...)`, `|(...)` and after `!`, search the `star` tags.
///
/// # Errors
/// Returns [`QueryError`] under the same conditions as [`parse_query`].
pub fn parse_star_query(input: &str, star: &[String]) -> Result<Node, QueryError> {
    Parser::new(tokenize(input)?).start_star_query(star)
}
