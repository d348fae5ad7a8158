//! Character-count token heuristic.
//!
//! Budgets chosen by users are calibrated against this estimate, so it stays
//! at four characters per token instead of a real tokenizer. Length is
//! counted in UTF-16 code units, the way browser text lengths are measured.

const CHARS_PER_TOKEN: usize = 4;

/// Estimate the number of tokens in a string, rounding up.
pub fn estimate_tokens(text: &str) -> usize {
    let char_count = text.encode_utf16().count();
    (char_count + CHARS_PER_TOKEN - 1) / CHARS_PER_TOKEN
}
