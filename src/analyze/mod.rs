// src/analyze/mod.rs
//! Analysis pipeline entry: orchestrates the generative-or-fallback choice and
//! stamps identity and timing onto the canonical result.

pub mod ai_adapter;
pub mod context;
pub mod features;
pub mod scorer;
pub mod weights;

use std::sync::OnceLock;
use std::time::Instant;

use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::report::{clamp_score, Analysis, AnalysisResult, Verdict};

// Re-export convenient types.
pub use crate::analyze::ai_adapter::{AiAnalysis, AiClient, DynAiClient};
pub use crate::analyze::features::{extract_features, TechnicalFeatures};
pub use crate::analyze::weights::{HotReloadScoring, ScoringWeights};

/// Global hot-reloaded point table.
static HOT_SCORING: OnceLock<HotReloadScoring> = OnceLock::new();

fn current_weights() -> ScoringWeights {
    HOT_SCORING
        .get_or_init(|| HotReloadScoring::new(None))
        .current()
}

/// The single entry point the surrounding system calls. Holds no state across
/// requests beyond the optional backend client; concurrent calls are fully
/// independent.
pub struct EmailAnalyzer {
    ai: Option<DynAiClient>,
}

impl EmailAnalyzer {
    /// Wire up from `config/ai.json` + environment. Missing or disabled
    /// config means every request takes the rule-based path.
    pub fn from_config() -> Self {
        Self {
            ai: ai_adapter::build_ai_client(),
        }
    }

    /// Rule-based only, no backend attempts. Used by tests and cost-capped
    /// deployments.
    pub fn rule_based_only() -> Self {
        Self { ai: None }
    }

    /// Inject a specific client (stubs in tests, pre-built providers).
    pub fn with_client(client: DynAiClient) -> Self {
        Self { ai: Some(client) }
    }

    /// Analyze one email. Attempts the generative backend when configured;
    /// any backend failure silently falls back to the rule-based scorer.
    /// Either way the result carries a fresh id, an RFC 3339 timestamp,
    /// wall-clock timing, and locally computed technical details.
    pub async fn analyze_email(&self, subject: &str, body: &str) -> AnalysisResult {
        let started = Instant::now();

        let analysis = match &self.ai {
            Some(client) => match client.analyze(subject, body).await {
                Ok(ai) => {
                    crate::metrics::record_analysis("generative");
                    normalize_generative(ai, subject, body)
                }
                Err(error) => {
                    warn!(
                        target: "analyze",
                        provider = client.provider_name(),
                        %error,
                        "generative backend failed; falling back to rule-based scorer"
                    );
                    crate::metrics::record_analysis("fallback");
                    scorer::score_email(subject, body, &current_weights())
                }
            },
            None => {
                crate::metrics::record_analysis("rule_based");
                scorer::score_email(subject, body, &current_weights())
            }
        };

        let id = new_check_id();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        // Never log raw email text; only the anonymized input hash.
        info!(
            target: "analyze",
            id = %id,
            input = %anon_hash(subject, body),
            spam_score = analysis.spam_score,
            verdict = ?analysis.verdict,
            elapsed_ms,
            "analysis complete"
        );
        analysis.finalize(id, elapsed_ms, iso_now())
    }
}

/// Canonicalize a generative analysis: clamp the score, re-derive the verdict
/// from it, and compute technical details locally. The backend is never
/// trusted for derived scores or structural facts.
fn normalize_generative(ai: AiAnalysis, subject: &str, body: &str) -> Analysis {
    let spam_score = clamp_score(ai.spam_score);
    Analysis {
        spam_score,
        verdict: Verdict::from_spam_score(spam_score),
        subject_line_issues: ai.subject_line_issues,
        spam_indicators: ai.spam_indicators,
        positives: ai.positives,
        recommendations: ai.recommendations,
        technical_details: features::extract_features(subject, body),
        suggested_rewrite: ai.suggested_rewrite,
    }
}

/// Unique per call: millisecond timestamp plus a short random suffix.
fn new_check_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("check_{}_{}", Utc::now().timestamp_millis(), &suffix[..9])
}

fn iso_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Short stable hash for log lines (the input itself is never logged).
pub(crate) fn anon_hash(subject: &str, body: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(subject.as_bytes());
    hasher.update(b"\n");
    hasher.update(body.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
