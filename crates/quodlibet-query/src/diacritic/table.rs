//! Combining-mark table mapping diacritics to the ASCII letters they attach to.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Baked scan result: combining-mark sequence and the letters it completes.
const SNAPSHOT: &[(&str, &str)] = &[
    ("\u{300}", "AEINOUWYaeinouwy"),
    ("\u{301}", "ACEGIKLMNOPRSUWYZacegiklmnoprsuwyz"),
    ("\u{301}\u{307}", "Ss"),
    ("\u{302}", "ACEGHIJOSUWYZaceghijosuwyz"),
    ("\u{302}\u{300}", "AEOaeo"),
    ("\u{302}\u{301}", "AEOaeo"),
    ("\u{302}\u{303}", "AEOaeo"),
    ("\u{302}\u{309}", "AEOaeo"),
    ("\u{303}", "AEINOUVYaeinouvy"),
    ("\u{303}\u{301}", "OUou"),
    ("\u{303}\u{304}", "Oo"),
    ("\u{303}\u{308}", "Oo"),
    ("\u{304}", "AEGIOUYaegiouy"),
    ("\u{304}\u{300}", "EOeo"),
    ("\u{304}\u{301}", "EOeo"),
    ("\u{304}\u{308}", "Uu"),
    ("\u{306}", "AEGIOUaegiou"),
    ("\u{306}\u{300}", "Aa"),
    ("\u{306}\u{301}", "Aa"),
    ("\u{306}\u{303}", "Aa"),
    ("\u{306}\u{309}", "Aa"),
    ("\u{307}", "ABCDEFGHIMNOPRSTWXYZabcdefghmnoprstwxyz"),
    ("\u{307}\u{304}", "AOao"),
    ("\u{308}", "AEHIOUWXYaehiotuwxy"),
    ("\u{308}\u{300}", "Uu"),
    ("\u{308}\u{301}", "IUiu"),
    ("\u{308}\u{304}", "AOUaou"),
    ("\u{308}\u{30c}", "Uu"),
    ("\u{309}", "AEIOUYaeiouy"),
    ("\u{30a}", "AUauwy"),
    ("\u{30a}\u{301}", "Aa"),
    ("\u{30b}", "OUou"),
    ("\u{30c}", "ACDEGHIKLNORSTUZacdeghijklnorstuz"),
    ("\u{30c}\u{307}", "Ss"),
    ("\u{30f}", "AEIORUaeioru"),
    ("\u{311}", "AEIORUaeioru"),
    ("\u{31b}", "OUou"),
    ("\u{31b}\u{300}", "OUou"),
    ("\u{31b}\u{301}", "OUou"),
    ("\u{31b}\u{303}", "OUou"),
    ("\u{31b}\u{309}", "OUou"),
    ("\u{31b}\u{323}", "OUou"),
    ("\u{323}", "ABDEHIKLMNORSTUVWYZabdehiklmnorstuvwyz"),
    ("\u{323}\u{302}", "AEOaeo"),
    ("\u{323}\u{304}", "LRlr"),
    ("\u{323}\u{306}", "Aa"),
    ("\u{323}\u{307}", "Ss"),
    ("\u{324}", "Uu"),
    ("\u{325}", "Aa"),
    ("\u{326}", "STst"),
    ("\u{327}", "CDEGHKLNRSTcdeghklnrst"),
    ("\u{327}\u{301}", "Cc"),
    ("\u{327}\u{306}", "Ee"),
    ("\u{328}", "AEIOUaeiou"),
    ("\u{328}\u{304}", "Oo"),
    ("\u{32d}", "DELNTUdelntu"),
    ("\u{32e}", "Hh"),
    ("\u{330}", "EIUeiu"),
    ("\u{331}", "BDKLNRTZbdhklnrtz"),
];

/// Diacritic variants of the ASCII letters.
///
/// `marks` maps every combining-mark sequence found in a Unicode scan to the
/// base letters it can follow. Two per-letter views are derived from it:
/// `variants`, the precomposed characters (NFC of letter plus marks), and
/// `combining`, the individual marks that may follow the letter in
/// decomposed text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiacriticTable {
    marks: BTreeMap<String, BTreeSet<char>>,
    variants: BTreeMap<char, Vec<char>>,
    combining: BTreeMap<char, Vec<char>>,
}

impl DiacriticTable {
    /// Build a table from a mark-sequence map.
    #[must_use]
    pub fn from_marks(marks: BTreeMap<String, BTreeSet<char>>) -> Self {
        let mut variants: BTreeMap<char, Vec<char>> = BTreeMap::new();
        let mut combining: BTreeMap<char, Vec<char>> = BTreeMap::new();
        for (sequence, letters) in &marks {
            for &letter in letters {
                combining.entry(letter).or_default().extend(sequence.chars());
                let composed: String = format!("{letter}{sequence}").nfc().collect();
                let mut chars = composed.chars();
                if let (Some(single), None) = (chars.next(), chars.next()) {
                    if single != letter {
                        variants.entry(letter).or_default().push(single);
                    }
                }
            }
        }
        for list in variants.values_mut().chain(combining.values_mut()) {
            list.sort_unstable();
            list.dedup();
        }
        Self {
            marks,
            variants,
            combining,
        }
    }

    /// The process-wide table built from the baked snapshot.
    ///
    /// Built on first use and never mutated afterwards.
    pub fn snapshot() -> &'static Self {
        static TABLE: OnceLock<DiacriticTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            let marks = SNAPSHOT
                .iter()
                .map(|(sequence, letters)| ((*sequence).to_string(), letters.chars().collect()))
                .collect();
            Self::from_marks(marks)
        })
    }

    /// Rebuild the table by scanning every Unicode scalar value.
    ///
    /// A character contributes when its NFKD form is an ASCII letter followed
    /// by one or more combining marks. This walks the whole code space, so it
    /// is meant for maintenance checks, not for query construction.
    #[must_use]
    pub fn regenerate() -> Self {
        let mut marks: BTreeMap<String, BTreeSet<char>> = BTreeMap::new();
        for c in (0..=u32::from(char::MAX)).filter_map(char::from_u32) {
            let mut decomposed = std::iter::once(c).nfkd();
            let Some(base) = decomposed.next() else {
                continue;
            };
            if !base.is_ascii_alphabetic() {
                continue;
            }
            let sequence: String = decomposed.collect();
            if sequence.is_empty() || !sequence.chars().all(is_combining_mark) {
                continue;
            }
            marks.entry(sequence).or_default().insert(base);
        }
        Self::from_marks(marks)
    }

    /// Whether the baked snapshot still agrees with a live scan.
    #[must_use]
    pub fn is_current() -> bool {
        *Self::snapshot() == Self::regenerate()
    }

    /// Mark sequences and the letters they complete.
    #[must_use]
    pub fn marks(&self) -> &BTreeMap<String, BTreeSet<char>> {
        &self.marks
    }

    /// Precomposed variants of `letter`, empty for anything without variants.
    #[must_use]
    pub fn variants(&self, letter: char) -> &[char] {
        self.variants
            .get(&letter)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Combining marks that can follow `letter` in decomposed text.
    #[must_use]
    pub fn marks_for(&self, letter: char) -> &[char] {
        self.combining
            .get(&letter)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// The mark-sequence table as plain strings, from the snapshot or a live scan.
///
/// # Examples
/// ```
/// use quodlibet_query::diacritic_for_letters;
/// let table = diacritic_for_letters(false);
/// assert!(table["\u{301}"].contains('e'));
/// ```
#[must_use]
pub fn diacritic_for_letters(regenerate: bool) -> BTreeMap<String, String> {
    let fresh;
    let table = if regenerate {
        fresh = DiacriticTable::regenerate();
        &fresh
    } else {
        DiacriticTable::snapshot()
    };
    table
        .marks()
        .iter()
        .map(|(sequence, letters)| (sequence.clone(), letters.iter().collect()))
        .collect()
}
