//! Runtime-calibrated scoring point table with hot-reload from
//! config/scoring.json.
//!
//! JSON shape (all fields optional, missing ones keep their defaults):
//! {
//!   "subject_spam_word": 30,
//!   "per_spam_word": 15,
//!   "repeated_domain": 35
//! }
//!
//! On each `current()` call we check the file's modified time and reload if
//! changed. The defaults are the canonical calibration; the file exists so
//! operators can retune without a rebuild.

use serde::Deserialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::RwLock,
    time::SystemTime,
};

/// Additive penalty points per signal. Summed, then clamped to [0,100].
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Subject contains the literal word "spam".
    pub subject_spam_word: u32,
    /// Subject longer than 60 characters.
    pub subject_length: u32,
    /// Capital-letter ratio in the subject above 0.5.
    pub subject_caps: u32,
    /// A run of 2+ special characters (@!#$%) in the subject.
    pub subject_punctuation: u32,
    /// 3 or more exclamation marks across subject and body.
    pub exclamations: u32,
    /// More than 2 all-caps words in the body.
    pub all_caps_words: u32,
    /// Each distinct lexicon hit. Unbounded; many hits compound.
    pub per_spam_word: u32,
    /// Any domain repeated past the threshold. Applies once per analysis.
    pub repeated_domain: u32,
    /// Missing unsubscribe link in a bulk/marketing message.
    pub missing_unsubscribe_bulk: u32,
    /// Missing unsubscribe link in a personal one-to-one message.
    pub missing_unsubscribe_personal: u32,
    /// More than 5 links in the body.
    pub too_many_links: u32,
    /// One or more phone numbers present.
    pub phone_number: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            subject_spam_word: 30,
            subject_length: 5,
            subject_caps: 25,
            subject_punctuation: 20,
            exclamations: 15,
            all_caps_words: 12,
            per_spam_word: 15,
            repeated_domain: 35,
            missing_unsubscribe_bulk: 25,
            missing_unsubscribe_personal: 10,
            too_many_links: 18,
            phone_number: 8,
        }
    }
}

/// Hot-reload wrapper: reloads when the config file mtime changes.
#[derive(Debug)]
pub struct HotReloadScoring {
    path: PathBuf,
    inner: RwLock<State>,
}

#[derive(Debug)]
struct State {
    weights: ScoringWeights,
    last_modified: Option<SystemTime>,
}

impl HotReloadScoring {
    /// Create with a path (defaults to "config/scoring.json" if `None`).
    pub fn new(path: Option<&Path>) -> Self {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("config/scoring.json"));
        Self {
            path,
            inner: RwLock::new(State {
                weights: ScoringWeights::default(),
                last_modified: None,
            }),
        }
    }

    /// Get the latest point table, reloading if the config file changed.
    pub fn current(&self) -> ScoringWeights {
        // Fast path: check metadata without grabbing the write lock yet.
        let needs_reload = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(mtime) => {
                let guard = self.inner.read().unwrap();
                guard.last_modified != Some(mtime)
            }
            // If the file isn't there, we keep defaults; no reload.
            Err(_) => false,
        };

        if !needs_reload {
            return self.inner.read().unwrap().weights;
        }

        // Slow path: reload with the write lock. Double-check in case of races.
        let mut guard = self.inner.write().unwrap();
        if let Ok(meta) = fs::metadata(&self.path) {
            if let Ok(mtime) = meta.modified() {
                if guard.last_modified != Some(mtime) {
                    if let Ok(w) = load_scoring_file(&self.path) {
                        guard.weights = w;
                        guard.last_modified = Some(mtime);
                    }
                }
            }
        }
        guard.weights
    }
}

/// Load the point table directly (no caching). Public for tests/tools.
pub fn load_scoring_file(path: &Path) -> io::Result<ScoringWeights> {
    let bytes = fs::read(path)?;
    let w: ScoringWeights = serde_json::from_slice(&bytes)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::{io::Write, thread, time::Duration};

    /// Create a unique temporary directory in std::env::temp_dir().
    fn unique_tmp_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        dir.push(format!("scoring_test_{}", nanos));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn defaults_are_the_canonical_table() {
        let w = ScoringWeights::default();
        assert_eq!(w.subject_spam_word, 30);
        assert_eq!(w.per_spam_word, 15);
        assert_eq!(w.repeated_domain, 35);
        assert_eq!(w.missing_unsubscribe_bulk, 25);
        assert_eq!(w.missing_unsubscribe_personal, 10);
    }

    #[test]
    fn partial_overrides_keep_remaining_defaults() {
        let w: ScoringWeights = serde_json::from_str(r#"{"per_spam_word": 8}"#).unwrap();
        assert_eq!(w.per_spam_word, 8);
        assert_eq!(w.repeated_domain, 35);
    }

    #[test]
    fn loads_and_hot_reloads() {
        let tmpdir = unique_tmp_dir();
        let path = tmpdir.join("scoring.json");

        // Write initial
        {
            let mut f = fs::File::create(&path).unwrap();
            write!(f, r#"{{"subject_spam_word":40,"per_spam_word":20}}"#).unwrap();
            f.sync_all().unwrap();
        }

        let hot = HotReloadScoring::new(Some(&path));
        let w1 = hot.current();
        assert_eq!(w1.subject_spam_word, 40);
        assert_eq!(w1.per_spam_word, 20);
        assert_eq!(w1.repeated_domain, 35);

        // Ensure different mtime (Windows granularity can be coarse).
        thread::sleep(Duration::from_millis(1100));

        // Update file
        {
            let mut f = fs::File::create(&path).unwrap();
            write!(f, r#"{{"subject_spam_word":10}}"#).unwrap();
            f.sync_all().unwrap();
        }

        let w2 = hot.current();
        assert_eq!(w2.subject_spam_word, 10);
        assert_eq!(w2.per_spam_word, 15);

        // Cleanup (best-effort)
        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir_all(&tmpdir);
    }

    #[test]
    fn missing_file_keeps_defaults() {
        let hot = HotReloadScoring::new(Some(Path::new("__scoring_should_not_exist__.json")));
        let w = hot.current();
        assert_eq!(w.subject_spam_word, 30);
    }
}
