use once_cell::sync::Lazy;
use regex::Regex;

const SENTENCE_MARKER: &str = "\u{0}";

/// Terminal punctuation followed by whitespace or end of input.
static RE_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"([.?!])(\s|$)").unwrap());

/// Split a paragraph into its sentences, in order.
///
/// A sentence ends at `.`, `?` or `!` when followed by whitespace or the end
/// of the paragraph; the punctuation stays with its sentence. Text without
/// terminal punctuation is a single sentence. The same rule serves every
/// script.
pub fn split_sentences(paragraph: &str) -> Vec<String> {
    let marked = RE_SENTENCE_END.replace_all(paragraph, format!("${{1}}{}${{2}}", SENTENCE_MARKER));

    marked
        .split(SENTENCE_MARKER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
