//! Literal text-window extraction around a matched word, used to build
//! before/after detail text in recommendations. Pure string indexing,
//! independent of the scorer.

/// Default window of characters kept on each side of the match.
pub const DEFAULT_CONTEXT_LEN: usize = 50;

/// Return up to `context_len` characters of surrounding text on each side of
/// the first case-insensitive occurrence of `word` in `text`, with `...`
/// markers where the window was cut. Falls back to the bare word when it does
/// not occur. Char-based indexing, so multi-byte input never splits.
pub fn extract_context(text: &str, word: &str, context_len: usize) -> String {
    let text_chars: Vec<char> = text.chars().collect();
    let haystack = lower_ascii(&text_chars);
    let needle: Vec<char> = word.chars().map(|c| c.to_ascii_lowercase()).collect();

    let Some(index) = find_chars(&haystack, &needle) else {
        return word.to_string();
    };

    let start = index.saturating_sub(context_len);
    let end = (index + needle.len() + context_len).min(text_chars.len());

    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.extend(&text_chars[start..end]);
    if end < text_chars.len() {
        out.push_str("...");
    }
    out
}

fn lower_ascii(chars: &[char]) -> Vec<char> {
    chars.iter().map(|c| c.to_ascii_lowercase()).collect()
}

/// First position of `needle` inside `haystack`, or None. Naive scan is fine
/// at email sizes.
fn find_chars(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}
