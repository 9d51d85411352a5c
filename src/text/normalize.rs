//! Canonicalizes text before it is handed to the embedding model.
//!
//! Lexical overlap and length ratio deliberately work on the raw text; only
//! the semantic comparison sees the normalized form.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Hebrew points and cantillation marks.
const DIACRITICS_START: char = '\u{0591}';
const DIACRITICS_END: char = '\u{05C7}';

/// Hebrew maqaf (word-joining hyphen).
const MAQAF: char = '\u{05BE}';

const PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '(', ')', '"', '\'', '-', MAQAF];

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    pub strip_diacritics: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self { strip_diacritics: true }
    }
}

/// Normalize with diacritic stripping enabled.
pub fn normalize(text: &str) -> String {
    normalize_with(text, NormalizeOptions::default())
}

pub fn normalize_with(text: &str, options: NormalizeOptions) -> String {
    let composed: String = text.nfc().collect();

    let stripped: String = composed
        .chars()
        .filter(|&c| !(options.strip_diacritics && is_diacritic(c)))
        .filter(|c| !PUNCTUATION.contains(c))
        .collect();

    RE_WHITESPACE
        .replace_all(&stripped, " ")
        .to_lowercase()
        .trim()
        .to_string()
}

fn is_diacritic(c: char) -> bool {
    (DIACRITICS_START..=DIACRITICS_END).contains(&c)
}
