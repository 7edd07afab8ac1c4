//! Literal helpers used by the lexer and the numeric comparison parser.

/// Decode backslash escapes in a quoted query literal.
///
/// Unknown escapes keep their backslash, matching how the query language
/// has always treated them.
pub(crate) fn decode_escapes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            None => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('a') => out.push('\u{7}'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('\n') => {}
            Some(quoted @ ('\\' | '\'' | '"')) => out.push(quoted),
            Some(marker @ ('x' | 'u')) => {
                let width = if marker == 'x' { 2 } else { 4 };
                let mut digits = String::new();
                while digits.len() < width {
                    match chars.next_if(char::is_ascii_hexdigit) {
                        Some(d) => digits.push(d),
                        None => break,
                    }
                }
                let decoded = (digits.len() == width)
                    .then(|| u32::from_str_radix(&digits, 16).ok())
                    .flatten()
                    .and_then(char::from_u32);
                match decoded {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push('\\');
                        out.push(marker);
                        out.push_str(&digits);
                    }
                }
            }
            Some(first @ '0'..='7') => {
                let mut digits = String::from(first);
                while digits.len() < 3 {
                    match chars.next_if(|d| matches!(d, '0'..='7')) {
                        Some(d) => digits.push(d),
                        None => break,
                    }
                }
                let decoded = u32::from_str_radix(&digits, 8)
                    .ok()
                    .and_then(char::from_u32);
                match decoded {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push('\\');
                        out.push_str(&digits);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

/// Dimension of a numeric literal, used to decide on age comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Unit {
    Plain,
    Time,
    Size,
}

/// A number parsed from a numeric comparison operand, in base units
/// (seconds or bytes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct NumericLiteral {
    pub value: f64,
    pub unit: Unit,
}

const MINUTE: f64 = 60.0;
const HOUR: f64 = 60.0 * MINUTE;
const DAY: f64 = 24.0 * HOUR;
const WEEK: f64 = 7.0 * DAY;
const MONTH: f64 = 30.0 * DAY;
const YEAR: f64 = 365.0 * DAY;
const KIB: f64 = 1024.0;
const MIB: f64 = KIB * KIB;
const GIB: f64 = KIB * MIB;
const TIB: f64 = KIB * GIB;

fn unit_scale(unit: &str) -> Option<(f64, Unit)> {
    let scale = match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => (1.0, Unit::Time),
        "min" | "mins" | "minute" | "minutes" => (MINUTE, Unit::Time),
        "h" | "hour" | "hours" => (HOUR, Unit::Time),
        "d" | "day" | "days" => (DAY, Unit::Time),
        "w" | "week" | "weeks" => (WEEK, Unit::Time),
        "month" | "months" => (MONTH, Unit::Time),
        "y" | "year" | "years" => (YEAR, Unit::Time),
        "b" | "byte" | "bytes" => (1.0, Unit::Size),
        "k" | "kb" => (KIB, Unit::Size),
        "m" | "mb" => (MIB, Unit::Size),
        "g" | "gb" => (GIB, Unit::Size),
        "t" | "tb" => (TIB, Unit::Size),
        _ => return None,
    };
    Some(scale)
}

fn parse_plain(text: &str) -> Option<f64> {
    let starts_numeric = text
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-'));
    if !starts_numeric {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[expect(clippy::float_arithmetic, reason = "clock fields accumulate in base 60")]
fn parse_clock(text: &str) -> Option<f64> {
    let parts: Vec<&str> = text.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }
    parts.iter().try_fold(0.0, |acc, part| {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        part.parse::<f64>().ok().map(|v| acc * 60.0 + v)
    })
}

/// Interpret a comparison operand as a number, or `None` when it names a tag.
///
/// Accepted forms: `0.5`, `-3`, `1e3`, `3:20`, `1:02:03`, `3 days`, `2MB`.
#[expect(clippy::float_arithmetic, reason = "unit suffixes scale the number")]
pub(crate) fn parse_numeric(text: &str) -> Option<NumericLiteral> {
    let text = text.trim();
    if let Some(value) = parse_plain(text) {
        return Some(NumericLiteral {
            value,
            unit: Unit::Plain,
        });
    }
    if let Some(value) = parse_clock(text) {
        return Some(NumericLiteral {
            value,
            unit: Unit::Time,
        });
    }
    let split = text.find(|c: char| c.is_ascii_alphabetic())?;
    let (number, unit) = text.split_at(split);
    let value = parse_plain(number.trim())?;
    let (scale, unit) = unit_scale(&unit.trim().to_ascii_lowercase())?;
    Some(NumericLiteral {
        value: value * scale,
        unit,
    })
}
