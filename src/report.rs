//! report.rs — Result structures for the email risk verdict, findings, and
//! explainability.
//!
//! This is the wire shape consumed by the HTTP layer and rendered in the UI,
//! and also the shape the generative backend is prompted to produce. Every
//! categorical field is a closed enum so the verdict partition and the
//! severity/impact levels are checked exhaustively at compile time.

use serde::{Deserialize, Serialize};

use crate::analyze::features::TechnicalFeatures;

/// Four-bucket risk verdict derived from the spam score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    InboxReady,
    NeedsImprovement,
    HighRisk,
    SpamLikely,
}

impl Verdict {
    /// Deterministic, non-overlapping partition of [0,100].
    /// Boundary scores (20, 50, 75) land in the higher-risk bucket.
    pub fn from_spam_score(score: u32) -> Self {
        match score {
            0..=19 => Verdict::InboxReady,
            20..=49 => Verdict::NeedsImprovement,
            50..=74 => Verdict::HighRisk,
            _ => Verdict::SpamLikely,
        }
    }
}

/// Indicator severity, most to least urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

/// Where in the email an indicator was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorCategory {
    Content,
    Formatting,
    Links,
    Subject,
    Technical,
}

/// Estimated deliverability impact of a finding or recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Low,
}

/// What went wrong with the subject line specifically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectIssueKind {
    SpamWord,
    ExcessiveCaps,
    ExcessivePunctuation,
    Length,
    Misleading,
}

/// A problem detected in the subject line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectIssue {
    #[serde(rename = "type")]
    pub kind: SubjectIssueKind,
    pub issue: String,
    pub recommendation: String,
}

/// A spam signal detected anywhere in the email, with explanation and fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpamIndicator {
    #[serde(rename = "type")]
    pub severity: Severity,
    pub category: IndicatorCategory,
    pub issue: String,
    pub explanation: String,
    pub recommendation: String,
    pub impact: Impact,
}

/// An independently checked, positively-worded signal. Not merely the
/// absence of a negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Positive {
    pub aspect: String,
    pub description: String,
}

/// A prioritized, actionable fix. Lower priority = more urgent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: u32,
    pub action: String,
    pub impact: Impact,
    pub details: String,
}

/// Analysis body before the orchestrator stamps identity and timing.
/// Produced by both the rule-based scorer and the (normalized) generative
/// path, so results are structurally identical regardless of which ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub spam_score: u32,
    pub verdict: Verdict,
    pub subject_line_issues: Vec<SubjectIssue>,
    pub spam_indicators: Vec<SpamIndicator>,
    pub positives: Vec<Positive>,
    pub recommendations: Vec<Recommendation>,
    pub technical_details: TechnicalFeatures,
    pub suggested_rewrite: Option<String>,
}

impl Analysis {
    /// Stamp identity and timing, deriving the dependent scores.
    ///
    /// Invariants enforced here for every path:
    /// `deliverability = clamp(100 - spam, 0, 100)` and
    /// `inbox_rate = clamp(deliverability - 10, 0, 100)`.
    pub fn finalize(self, id: String, processing_time_ms: u64, timestamp: String) -> AnalysisResult {
        let spam_score = clamp_score(self.spam_score);
        let deliverability_score = deliverability_score(spam_score);
        AnalysisResult {
            id,
            spam_score,
            deliverability_score,
            estimated_inbox_rate: estimated_inbox_rate(deliverability_score),
            verdict: self.verdict,
            subject_line_issues: self.subject_line_issues,
            spam_indicators: self.spam_indicators,
            positives: self.positives,
            recommendations: self.recommendations,
            technical_details: self.technical_details,
            suggested_rewrite: self.suggested_rewrite,
            processing_time_ms,
            timestamp,
        }
    }
}

/// Complete analysis result. Created fresh per request, never mutated after
/// construction; the caller owns it outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: String,
    pub spam_score: u32,
    pub deliverability_score: u32,
    pub estimated_inbox_rate: u32,
    pub verdict: Verdict,
    pub subject_line_issues: Vec<SubjectIssue>,
    pub spam_indicators: Vec<SpamIndicator>,
    pub positives: Vec<Positive>,
    pub recommendations: Vec<Recommendation>,
    pub technical_details: TechnicalFeatures,
    pub suggested_rewrite: Option<String>,
    pub processing_time_ms: u64,
    pub timestamp: String,
}

/// Upstream contributions are summed then clamped, never allowed past 100.
pub fn clamp_score(raw: u32) -> u32 {
    raw.min(100)
}

pub fn deliverability_score(spam_score: u32) -> u32 {
    100u32.saturating_sub(spam_score)
}

pub fn estimated_inbox_rate(deliverability_score: u32) -> u32 {
    deliverability_score.saturating_sub(10)
}
