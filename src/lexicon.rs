use once_cell::sync::Lazy;

static LEXICON: Lazy<Vec<String>> = Lazy::new(|| {
    let raw = include_str!("../spam_lexicon.json");
    serde_json::from_str::<Vec<String>>(raw).expect("valid spam lexicon")
});

/// The full curated trigger list, lower-case. Loaded once, read-only; safe
/// for unlimited concurrent readers.
pub fn spam_trigger_words() -> &'static [String] {
    &LEXICON
}

/// Distinct lexicon entries found in the subject or body (case-insensitive
/// substring match), in lexicon order. Each distinct hit compounds the score,
/// so the caller cares about the full list, not just the first.
pub fn find_spam_words(subject: &str, body: &str) -> Vec<&'static str> {
    let subject = subject.to_lowercase();
    let body = body.to_lowercase();
    LEXICON
        .iter()
        .filter(|w| subject.contains(w.as_str()) || body.contains(w.as_str()))
        .map(|w| w.as_str())
        .collect()
}
