//! The executable matcher tree produced by the parser.
//!
//! Nodes are immutable once built. The constructors ([`Node::inter`],
//! [`Node::union`], [`Node::neg`]) apply the algebraic simplifications
//! eagerly, so a tree never holds a `True` below an intersection, a nested
//! intersection, or a double negation. "Matches nothing" is represented by
//! an empty union ([`Node::never`]).

mod numcmp;
mod tag;
mod value;

use std::fmt;

use crate::record::Record;

pub use numcmp::{Numcmp, Operand, RelOp};
pub use tag::TagMatch;
pub use value::{Pattern, ValueMatcher};

pub(crate) use numcmp::is_timestamp_tag;
pub(crate) use value::{PatternFlags, VALID_FLAGS, write_list};

/// A node of the compiled query.
#[derive(Debug, Clone)]
pub enum Node {
    /// Matches every record.
    True,
    /// Logical NOT.
    Neg(Box<Node>),
    /// Logical AND over at least two children.
    Inter(Vec<Node>),
    /// Logical OR; empty means "matches nothing".
    Union(Vec<Node>),
    /// Tag-scoped pattern match.
    Tag(TagMatch),
    /// Numeric comparison.
    Numcmp(Numcmp),
}

impl Node {
    /// The node that matches no record.
    #[must_use]
    pub const fn never() -> Self {
        Self::Union(Vec::new())
    }

    /// Whether this node is the always-true node.
    #[must_use]
    pub const fn is_true(&self) -> bool {
        matches!(self, Self::True)
    }

    /// Whether this node is the never-matching node.
    #[must_use]
    pub fn is_never(&self) -> bool {
        matches!(self, Self::Union(children) if children.is_empty())
    }

    /// Intersect `children`.
    ///
    /// Nested intersections are flattened and `True` children dropped. A
    /// never-matching child makes the result never match. One remaining child
    /// is returned as is and none at all yields `True`.
    ///
    /// # Examples
    /// ```
    /// use quodlibet_query::Node;
    /// assert!(Node::inter([Node::True, Node::True]).is_true());
    /// assert!(Node::inter([Node::True, Node::never()]).is_never());
    /// ```
    #[must_use]
    pub fn inter(children: impl IntoIterator<Item = Self>) -> Self {
        let mut flat = Vec::new();
        for child in children {
            match child {
                Self::True => {}
                Self::Inter(nested) => flat.extend(nested),
                never if never.is_never() => return Self::never(),
                other => flat.push(other),
            }
        }
        collapse(flat, Self::True, Self::Inter)
    }

    /// Unite `children`; the mirror image of [`Node::inter`].
    ///
    /// # Examples
    /// ```
    /// use quodlibet_query::Node;
    /// assert!(Node::union([Node::never(), Node::True]).is_true());
    /// assert!(Node::union([Node::never(), Node::never()]).is_never());
    /// ```
    #[must_use]
    pub fn union(children: impl IntoIterator<Item = Self>) -> Self {
        let mut flat = Vec::new();
        for child in children {
            match child {
                Self::True => return Self::True,
                Self::Union(nested) => flat.extend(nested),
                other => flat.push(other),
            }
        }
        collapse(flat, Self::never(), Self::Union)
    }

    /// Negate `child`, cancelling double negations.
    #[must_use]
    pub fn neg(child: Self) -> Self {
        match child {
            Self::True => Self::never(),
            never if never.is_never() => Self::True,
            Self::Neg(inner) => *inner,
            other => Self::Neg(Box::new(other)),
        }
    }

    /// Leaf matching `value` against the named tags.
    #[must_use]
    pub fn tag(names: Vec<String>, value: ValueMatcher) -> Self {
        Self::Tag(TagMatch::new(names, value))
    }

    /// Evaluate the tree against `record`.
    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        match self {
            Self::True => true,
            Self::Neg(child) => !child.matches(record),
            Self::Inter(children) => children.iter().all(|c| c.matches(record)),
            Self::Union(children) => children.iter().any(|c| c.matches(record)),
            Self::Tag(leaf) => leaf.matches(record),
            Self::Numcmp(cmp) => cmp.matches(record),
        }
    }
}

fn collapse(mut flat: Vec<Node>, empty: Node, wrap: fn(Vec<Node>) -> Node) -> Node {
    match flat.len() {
        0 => empty,
        1 => flat.pop().unwrap_or(empty),
        _ => wrap(flat),
    }
}

/// `a AND b`, simplified.
#[must_use]
pub fn and_(a: Node, b: Node) -> Node {
    Node::inter([a, b])
}

/// `a OR b`, simplified.
#[must_use]
pub fn or_(a: Node, b: Node) -> Node {
    Node::union([a, b])
}

/// `NOT a`, simplified.
#[must_use]
pub fn not_(a: Node) -> Node {
    Node::neg(a)
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => Ok(()),
            Self::Neg(child) => write!(f, "!{child}"),
            Self::Inter(children) => write_list(f, '&', children),
            Self::Union(children) => write_list(f, '|', children),
            Self::Tag(leaf) => write!(f, "{leaf}"),
            Self::Numcmp(cmp) => write!(f, "{cmp}"),
        }
    }
}
