//! Query language engine for tagged music records.
//!
//! A search string such as `&(artist=nina, #(rating > 0.5))` is lexed,
//! parsed by a recursive-descent parser and compiled into an immutable
//! matcher tree ([`Node`]) that can be evaluated against any [`Record`].
//! Strings that are not structured queries fall back to a free-text search
//! of the default "star" tags; see [`Query`] for the full interpretation
//! order. Regular expressions carrying the `d` flag are rewritten by
//! [`re_add_variants`] so ASCII letters also match their accented forms.
//!
//! The crate logs through the [`log`] facade and never installs a logger.

mod diacritic;
mod errors;
mod matcher;
mod parse;
mod query;
mod record;

pub use diacritic::{DiacriticTable, diacritic_for_letters, re_add_variants};
pub use errors::{QueryError, SyntaxErrorInfo};
pub use matcher::{Node, Numcmp, Operand, Pattern, RelOp, TagMatch, ValueMatcher, and_, not_, or_};
pub use parse::{Lexeme, TokenKind, parse_query, parse_star_query, tokenize};
pub use query::{DEFAULT_STAR, Query, QueryOptions, QueryType};
pub use record::{MapRecord, Record};
