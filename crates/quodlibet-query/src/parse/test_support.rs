//! Test helpers for asserting parser outcomes.
use super::lexer::tokenize;
use super::parser::Parser;
use crate::errors::QueryError;
use crate::matcher::Node;

pub(crate) const STAR: &[&str] = &["artist", "album", "title"];

pub(crate) fn parser<'s>(input: &str) -> Parser<'s> {
    match tokenize(input) {
        Ok(tokens) => Parser::new(tokens),
        Err(err) => panic!("query should lex: {err}"),
    }
}

pub(crate) fn parse_ok(input: &str) -> Node {
    match parser(input).start_query() {
        Ok(node) => node,
        Err(err) => panic!("query should parse: {err}"),
    }
}

pub(crate) fn parse_err(input: &str) -> QueryError {
    let tokens = match tokenize(input) {
        Ok(tokens) => tokens,
        Err(err) => return err,
    };
    match Parser::new(tokens).start_query() {
        Ok(node) => panic!("query parsing should fail, got {node}"),
        Err(err) => err,
    }
}

pub(crate) fn star_ok(input: &str) -> Node {
    let star: Vec<String> = STAR.iter().map(ToString::to_string).collect();
    match parser(input).start_star_query(&star) {
        Ok(node) => node,
        Err(err) => panic!("star query should parse: {err}"),
    }
}
