//! Rewrite a regular expression so ASCII letters also match accented forms.

use std::collections::BTreeSet;

use regex_syntax::ast::parse::Parser;
use regex_syntax::ast::print::Printer;
use regex_syntax::ast::{
    self, Ast, ClassBracketed, ClassSet, ClassSetItem, ClassSetUnion, Concat, Flags, Group,
    GroupKind, Literal, LiteralKind, Repetition, RepetitionKind, RepetitionOp, Span,
};

use crate::errors::QueryError;

use super::table::DiacriticTable;

/// Expand every literal ASCII letter of `pattern` into a class of its variants.
///
/// The pattern is parsed into a syntax tree; literals become `[c...]`
/// classes, bracketed classes gain the variants of their literals and of the
/// letters covered by their ranges, and the tree is printed back. Each
/// widened letter or non-negated class may also be followed by any run of
/// the combining marks its letters take, so decomposed text matches too.
/// Everything else is reproduced unchanged.
///
/// # Errors
/// Returns [`QueryError::Unsupported`] for back-references and look-around,
/// and [`QueryError::Regex`] for any other syntax error.
///
/// # Examples
/// ```
/// use quodlibet_query::{DiacriticTable, re_add_variants};
/// let expanded = re_add_variants("caf(e|x)", DiacriticTable::snapshot())
///     .expect("pattern is supported");
/// let regex = regex::Regex::new(&expanded).expect("rewritten pattern compiles");
/// assert!(regex.is_match("café"));
/// ```
pub fn re_add_variants(pattern: &str, table: &DiacriticTable) -> Result<String, QueryError> {
    let mut tree = Parser::new()
        .parse(pattern)
        .map_err(|err| syntax_error(pattern, &err))?;
    rewrite(&mut tree, table);
    let mut out = String::with_capacity(pattern.len() * 4);
    Printer::new()
        .print(&tree, &mut out)
        .map_err(|_| QueryError::Unsupported(format!("cannot reprint /{pattern}/")))?;
    log::trace!("expanded diacritics of /{pattern}/ to /{out}/");
    Ok(out)
}

fn syntax_error(pattern: &str, err: &ast::Error) -> QueryError {
    match err.kind() {
        ast::ErrorKind::UnsupportedBackreference => {
            QueryError::Unsupported("back-references".into())
        }
        ast::ErrorKind::UnsupportedLookAround => QueryError::Unsupported("look-around".into()),
        _ => QueryError::Regex {
            pattern: pattern.to_string(),
            source: regex::Error::Syntax(err.to_string()),
        },
    }
}

fn rewrite(tree: &mut Ast, table: &DiacriticTable) {
    match tree {
        Ast::Literal(literal) => {
            if let Some(class) = literal_class(literal, table) {
                let marks = marks_of([literal.c], table);
                let span = literal.span;
                *tree = with_marks(span, Ast::class_bracketed(class), &marks);
            }
        }
        Ast::ClassBracketed(class) => {
            let mut letters = BTreeSet::new();
            rewrite_set(&mut class.kind, table, &mut letters);
            if !class.negated {
                let marks = marks_of(letters, table);
                let span = class.span;
                let widened = Ast::ClassBracketed(class.clone());
                *tree = with_marks(span, widened, &marks);
            }
        }
        Ast::Repetition(repetition) => rewrite(&mut repetition.ast, table),
        Ast::Group(group) => rewrite(&mut group.ast, table),
        Ast::Alternation(alternation) => {
            for branch in &mut alternation.asts {
                rewrite(branch, table);
            }
        }
        Ast::Concat(concat) => {
            for part in &mut concat.asts {
                rewrite(part, table);
            }
        }
        _ => {}
    }
}

fn verbatim(span: Span, c: char) -> ClassSetItem {
    ClassSetItem::Literal(Literal {
        span,
        kind: LiteralKind::Verbatim,
        c,
    })
}

fn class_of(span: Span, items: Vec<ClassSetItem>) -> ClassBracketed {
    ClassBracketed {
        span,
        negated: false,
        kind: ClassSet::Item(ClassSetItem::Union(ClassSetUnion { span, items })),
    }
}

fn marks_of(letters: impl IntoIterator<Item = char>, table: &DiacriticTable) -> BTreeSet<char> {
    letters
        .into_iter()
        .flat_map(|letter| table.marks_for(letter).iter().copied())
        .collect()
}

/// `(?:<letters>[<marks>]*)`, or `letters` alone when there are no marks.
fn with_marks(span: Span, letters: Ast, marks: &BTreeSet<char>) -> Ast {
    if marks.is_empty() {
        return letters;
    }
    let items = marks.iter().map(|&mark| verbatim(span, mark)).collect();
    let trailing = Ast::repetition(Repetition {
        span,
        op: RepetitionOp {
            span,
            kind: RepetitionKind::ZeroOrMore,
        },
        greedy: true,
        ast: Box::new(Ast::class_bracketed(class_of(span, items))),
    });
    Ast::group(Group {
        span,
        kind: GroupKind::NonCapturing(Flags {
            span,
            items: Vec::new(),
        }),
        ast: Box::new(Ast::concat(Concat {
            span,
            asts: vec![letters, trailing],
        })),
    })
}

fn letter_variants(letter: char, span: Span, table: &DiacriticTable) -> Vec<ClassSetItem> {
    if !letter.is_ascii_alphabetic() {
        return Vec::new();
    }
    table
        .variants(letter)
        .iter()
        .map(|&variant| verbatim(span, variant))
        .collect()
}

fn literal_class(literal: &Literal, table: &DiacriticTable) -> Option<ClassBracketed> {
    let variants = letter_variants(literal.c, literal.span, table);
    if variants.is_empty() {
        return None;
    }
    let mut items = vec![ClassSetItem::Literal(literal.clone())];
    items.extend(variants);
    Some(class_of(literal.span, items))
}

/// Widen the items of `set`, collecting the ASCII letters it covers.
fn rewrite_set(set: &mut ClassSet, table: &DiacriticTable, letters: &mut BTreeSet<char>) {
    match set {
        ClassSet::Item(item) => rewrite_item(item, table, letters),
        ClassSet::BinaryOp(op) => {
            rewrite_set(&mut op.lhs, table, letters);
            rewrite_set(&mut op.rhs, table, letters);
        }
    }
}

fn rewrite_item(item: &mut ClassSetItem, table: &DiacriticTable, letters: &mut BTreeSet<char>) {
    match item {
        ClassSetItem::Literal(literal) => {
            if literal.c.is_ascii_alphabetic() {
                letters.insert(literal.c);
            }
            let extra = letter_variants(literal.c, literal.span, table);
            if !extra.is_empty() {
                let span = literal.span;
                let mut items = vec![ClassSetItem::Literal(literal.clone())];
                items.extend(extra);
                *item = ClassSetItem::Union(ClassSetUnion { span, items });
            }
        }
        ClassSetItem::Range(range) => {
            let low = range.start.c.max('A');
            let high = range.end.c.min('z');
            letters.extend((low..=high).filter(char::is_ascii_alphabetic));
            let extra: Vec<ClassSetItem> = (low..=high)
                .flat_map(|letter| letter_variants(letter, range.span, table))
                .collect();
            if !extra.is_empty() {
                let span = range.span;
                let mut items = vec![ClassSetItem::Range(range.clone())];
                items.extend(extra);
                *item = ClassSetItem::Union(ClassSetUnion { span, items });
            }
        }
        ClassSetItem::Bracketed(inner) => {
            let mut covered = BTreeSet::new();
            rewrite_set(&mut inner.kind, table, &mut covered);
            if !inner.negated {
                letters.extend(covered);
            }
        }
        ClassSetItem::Union(union) => {
            for nested in &mut union.items {
                rewrite_item(nested, table, letters);
            }
        }
        _ => {}
    }
}
