//! Diacritic-insensitive matching support for the `d` regex flag.

mod rewrite;
mod table;

pub use rewrite::re_add_variants;
pub use table::{DiacriticTable, diacritic_for_letters};
