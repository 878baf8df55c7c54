//! Technical feature extraction: objective, structural facts about one
//! subject/body pair. Pure and total — any string input, including empty,
//! yields a valid (possibly all-zero) feature set.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("url regex"));

// Bare domains count too ("spam.com spam.com spam.com" is a classic blast
// pattern even without a scheme).
static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:www\.)?([a-zA-Z0-9-]+\.[a-zA-Z]{2,})").expect("domain regex")
});

static IMG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<img[^>]*>").expect("img regex"));

static UNSUBSCRIBE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)unsubscribe|opt-out|opt out").expect("unsubscribe regex"));

// Street-address shape: `<digits> <words>, <words>, <2-letter code> <5-digit code>`.
// A heuristic, not a validator; real addresses that miss the shape score as absent.
static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\d+\s+[\w\s]+,\s*[\w\s]+,\s*[A-Za-z]{2}\s+\d{5}").expect("address regex")
});

// 3+ consecutive uppercase letters: catches FREE and NOW without flagging
// short acronyms like "ID".
static ALL_CAPS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{3,}\b").expect("caps regex"));

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b").expect("phone regex"));

/// Domains must repeat more than this often to be flagged. Deliberately much
/// harsher than the ordinary link-count check: repeated domains signal
/// templated blasts.
pub const REPEATED_DOMAIN_THRESHOLD: usize = 3;

/// Structural facts derived from the raw text. Recomputed per request and
/// never persisted; immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalFeatures {
    pub word_count: usize,
    pub link_count: usize,
    pub image_count: usize,
    pub has_unsubscribe_link: bool,
    pub has_physical_address: bool,
    /// Domains occurring more than `REPEATED_DOMAIN_THRESHOLD` times, with
    /// their occurrence counts. Ordered map for a stable wire shape.
    pub repeated_url_domains: BTreeMap<String, usize>,
    /// Body tokens of 3+ letters that are entirely uppercase, in order.
    pub all_caps_words: Vec<String>,
    /// Total `!` across subject and body.
    pub exclamation_count: usize,
    pub phone_number_count: usize,
}

/// Extract all features for one email. Deterministic, no side effects.
pub fn extract_features(subject: &str, body: &str) -> TechnicalFeatures {
    TechnicalFeatures {
        word_count: body.split_whitespace().count(),
        link_count: URL_RE.find_iter(body).count(),
        image_count: IMG_RE.find_iter(body).count(),
        has_unsubscribe_link: UNSUBSCRIBE_RE.is_match(body),
        has_physical_address: ADDRESS_RE.is_match(body),
        repeated_url_domains: repeated_domains(body),
        all_caps_words: ALL_CAPS_RE
            .find_iter(body)
            .map(|m| m.as_str().to_string())
            .collect(),
        exclamation_count: count_char(subject, '!') + count_char(body, '!'),
        phone_number_count: PHONE_RE.find_iter(body).count(),
    }
}

/// Tally every URL-shaped mention by domain (scheme and `www.` stripped,
/// lower-cased) and keep only domains past the repeat threshold.
fn repeated_domains(body: &str) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for caps in DOMAIN_RE.captures_iter(body) {
        if let Some(domain) = caps.get(1) {
            *counts.entry(domain.as_str().to_lowercase()).or_insert(0) += 1;
        }
    }
    counts.retain(|_, count| *count > REPEATED_DOMAIN_THRESHOLD);
    counts
}

fn count_char(text: &str, needle: char) -> usize {
    text.chars().filter(|c| *c == needle).count()
}
