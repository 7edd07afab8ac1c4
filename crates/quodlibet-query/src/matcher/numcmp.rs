//! Numeric comparisons produced by `#(...)` queries.

use std::cmp::Ordering;
use std::fmt;

use crate::record::Record;

/// Tags holding Unix timestamps; compared as ages against time literals.
const TIMESTAMP_TAGS: &[&str] = &["added", "mtime", "lastplayed", "laststarted"];

pub(crate) fn is_timestamp_tag(tag: &str) -> bool {
    TIMESTAMP_TAGS.contains(&tag)
}

/// Relational operator of a numeric comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `=`
    Eq,
    /// `!=`
    Ne,
}

impl RelOp {
    /// Parse an operator from its query spelling.
    ///
    /// # Examples
    /// ```
    /// use quodlibet_query::RelOp;
    /// assert_eq!(RelOp::parse(">="), Some(RelOp::Ge));
    /// assert_eq!(RelOp::parse("=>"), None);
    /// ```
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let op = match text {
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "=" => Self::Eq,
            "!=" => Self::Ne,
            _ => return None,
        };
        Some(op)
    }

    /// The operator that holds after swapping the operands.
    #[must_use]
    pub const fn mirrored(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
            Self::Eq => Self::Eq,
            Self::Ne => Self::Ne,
        }
    }

    /// Query spelling of the operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "=",
            Self::Ne => "!=",
        }
    }

    /// Compare `lhs` against `rhs`; comparisons involving NaN never hold.
    #[must_use]
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        let Some(ordering) = lhs.partial_cmp(&rhs) else {
            return false;
        };
        match self {
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A number in base units (seconds, bytes, or plain).
    Literal(f64),
    /// Another numeric tag of the same record.
    Tag(String),
}

/// Compares a record's numeric tag against a literal or another tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Numcmp {
    tag: String,
    op: RelOp,
    rhs: Operand,
    age_at: Option<f64>,
}

impl Numcmp {
    /// Compare `tag` against a literal value.
    #[must_use]
    pub fn against_literal(tag: impl Into<String>, op: RelOp, value: f64) -> Self {
        Self {
            tag: tag.into(),
            op,
            rhs: Operand::Literal(value),
            age_at: None,
        }
    }

    /// Compare `tag` against `other` on the same record.
    #[must_use]
    pub fn between_tags(tag: impl Into<String>, op: RelOp, other: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            op,
            rhs: Operand::Tag(other.into()),
            age_at: None,
        }
    }

    /// Compare the age `now - value` instead of the raw timestamp.
    #[must_use]
    pub fn as_age(mut self, now: f64) -> Self {
        self.age_at = Some(now);
        self
    }

    /// Name of the compared tag, without the `~#` prefix.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The relational operator.
    #[must_use]
    pub fn op(&self) -> RelOp {
        self.op
    }

    /// The right-hand operand.
    #[must_use]
    pub fn rhs(&self) -> &Operand {
        &self.rhs
    }

    /// Whether the comparison holds; records missing a tag never match.
    #[expect(clippy::float_arithmetic, reason = "ages are differences of timestamps")]
    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        let Some(raw) = record.numeric(&self.tag) else {
            return false;
        };
        let subject = self.age_at.map_or(raw, |now| now - raw);
        let rhs = match &self.rhs {
            Operand::Literal(value) => *value,
            Operand::Tag(other) => match record.numeric(other) {
                Some(value) => value,
                None => return false,
            },
        };
        self.op.apply(subject, rhs)
    }
}

impl fmt::Display for Numcmp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#({} {} ", self.tag, self.op.as_str())?;
        match &self.rhs {
            Operand::Literal(value) if self.age_at.is_some() => write!(f, "{value} seconds)"),
            Operand::Literal(value) => write!(f, "{value})"),
            Operand::Tag(other) => write!(f, "{other})"),
        }
    }
}
