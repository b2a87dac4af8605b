//! Name folding for duplicate detection.
//!
//! Every alias of every language entry is folded to a case- and
//! accent-insensitive form. Two records share a name when their folded
//! sets intersect.

use hashbrown::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::PlaceRecord;

/// Fold a display name into its comparable form.
///
/// Decomposes (NFKD), drops combining marks, recomposes (NFC) so scripts
/// like Hangul survive, lowercases, and turns punctuation runs into single
/// spaces. "Lampeter-Strasburg" and "lampeter strasburg" fold identically.
pub fn fold(name: &str) -> String {
    let stripped: String = name
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .nfc()
        .collect::<String>()
        .to_lowercase();

    let spaced: String = stripped
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Folded names of a record across all languages and aliases
pub fn name_tokens(record: &PlaceRecord) -> HashSet<String> {
    record
        .name
        .iter()
        .flat_map(|names| names.values())
        .flat_map(|value| value.aliases())
        .map(|alias| fold(alias))
        .filter(|folded| !folded.is_empty())
        .collect()
}

/// Whether two token sets share at least one name
pub fn names_match(a: &HashSet<String>, b: &HashSet<String>) -> bool {
    !a.is_disjoint(b)
}
