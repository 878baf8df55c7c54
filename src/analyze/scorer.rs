//! Rule-based deliverability scorer: the deterministic analysis path used
//! whenever no generative backend is configured or the backend fails.
//!
//! Additive point accumulation over the extracted features and the lexicon,
//! clamped to [0,100], with categorized findings, positives, and adaptive
//! recommendations carrying literal before/after text from the input.
//! Synchronous, total: any string input, including empty, yields a valid
//! result.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::analyze::context::{extract_context, DEFAULT_CONTEXT_LEN};
use crate::analyze::features::{self, TechnicalFeatures};
use crate::analyze::weights::ScoringWeights;
use crate::lexicon;
use crate::report::{
    clamp_score, Analysis, Impact, IndicatorCategory, Positive, Recommendation, Severity,
    SpamIndicator, SubjectIssue, SubjectIssueKind, Verdict,
};

static SPAM_IN_SUBJECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)spam").expect("spam-word regex"));

static SPECIAL_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[@!#$%]{2,}").expect("special-run regex"));

// Conversational openers that mark one-to-one correspondence. Checked against
// the first ~200 characters only; greetings buried deep in a blast don't count.
static PERSONAL_OPENER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)hi |hey |hello |thanks|thank you|i hope|regards|following up|circling back")
        .expect("opener regex")
});

/// Classify one-to-one correspondence vs bulk/marketing mail. Personal mail
/// is exempt from the CAN-SPAM-style footer expectations: no physical-address
/// nag, reduced missing-unsubscribe penalty. Mentioning "unsubscribe" at all
/// implies bulk intent regardless of tone.
pub fn is_personal_email(body: &str, word_count: usize) -> bool {
    let opening: String = body.chars().take(200).collect();
    PERSONAL_OPENER_RE.is_match(&opening)
        && word_count < 150
        && !body.to_lowercase().contains("unsubscribe")
}

/// Score one email. Internally extracts features and consults the lexicon.
pub fn score_email(subject: &str, body: &str, weights: &ScoringWeights) -> Analysis {
    let technical = features::extract_features(subject, body);
    let spam_words = lexicon::find_spam_words(subject, body);
    let personal = is_personal_email(body, technical.word_count);

    let mut spam_score: u32 = 0;
    let mut subject_line_issues: Vec<SubjectIssue> = Vec::new();
    let mut spam_indicators: Vec<SpamIndicator> = Vec::new();
    let mut positives: Vec<Positive> = Vec::new();

    // --- Subject line ---

    // Ironic but real signal; catches test/junk subjects.
    if SPAM_IN_SUBJECT_RE.is_match(subject) {
        subject_line_issues.push(SubjectIssue {
            kind: SubjectIssueKind::SpamWord,
            issue: "Subject contains \"SPAM\"".into(),
            recommendation: "Never use the word \"spam\" in your subject line".into(),
        });
        spam_score += weights.subject_spam_word;
    }

    let subject_len = subject.chars().count();
    if subject_len > 60 {
        subject_line_issues.push(SubjectIssue {
            kind: SubjectIssueKind::Length,
            issue: "Subject line is too long".into(),
            recommendation: "Keep subject lines under 60 characters for better open rates".into(),
        });
        spam_score += weights.subject_length;
    }

    let caps_count = subject.chars().filter(char::is_ascii_uppercase).count();
    let caps_ratio = if subject_len > 0 {
        caps_count as f32 / subject_len as f32
    } else {
        0.0
    };
    if caps_ratio > 0.5 && subject_len > 3 {
        subject_line_issues.push(SubjectIssue {
            kind: SubjectIssueKind::ExcessiveCaps,
            issue: "Too many capital letters in subject".into(),
            recommendation: "Use normal capitalization - all caps looks like spam".into(),
        });
        spam_score += weights.subject_caps;
    }

    let special_runs: Vec<&str> = SPECIAL_RUN_RE
        .find_iter(subject)
        .map(|m| m.as_str())
        .collect();
    if !special_runs.is_empty() {
        subject_line_issues.push(SubjectIssue {
            kind: SubjectIssueKind::ExcessivePunctuation,
            issue: format!("Excessive special characters: {}", special_runs.join(", ")),
            recommendation: "Remove excessive punctuation marks".into(),
        });
        spam_score += weights.subject_punctuation;
    }

    // --- Formatting ---

    if technical.exclamation_count >= 3 {
        spam_indicators.push(SpamIndicator {
            severity: Severity::Warning,
            category: IndicatorCategory::Formatting,
            issue: format!(
                "Excessive exclamation marks ({} found)",
                technical.exclamation_count
            ),
            explanation: "Multiple exclamation marks are a common spam indicator".into(),
            recommendation: "Use at most one exclamation mark".into(),
            impact: Impact::Medium,
        });
        spam_score += weights.exclamations;
    }

    if technical.all_caps_words.len() > 2 {
        spam_indicators.push(SpamIndicator {
            severity: Severity::Warning,
            category: IndicatorCategory::Formatting,
            issue: format!(
                "Multiple all-caps words ({} found)",
                technical.all_caps_words.len()
            ),
            explanation: "Excessive capitalization is unprofessional and spam-like".into(),
            recommendation: "Use normal sentence case".into(),
            impact: Impact::Medium,
        });
        spam_score += weights.all_caps_words;
    }

    // --- Content ---

    if !spam_words.is_empty() {
        let shown = spam_words
            .iter()
            .take(3)
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        let issue = if spam_words.len() > 3 {
            format!(
                "Contains spam trigger words: {} and {} more",
                shown,
                spam_words.len() - 3
            )
        } else {
            format!("Contains spam trigger words: {}", shown)
        };
        spam_indicators.push(SpamIndicator {
            severity: Severity::Critical,
            category: IndicatorCategory::Content,
            issue,
            explanation: "These words are commonly associated with spam emails".into(),
            recommendation: "Replace or remove these phrases with more natural language".into(),
            impact: Impact::High,
        });
        // Unbounded on purpose: many hits compound.
        spam_score += weights.per_spam_word * spam_words.len() as u32;
    }

    if !technical.repeated_url_domains.is_empty() {
        let listed = technical
            .repeated_url_domains
            .iter()
            .map(|(domain, count)| format!("{} ({}x)", domain, count))
            .collect::<Vec<_>>()
            .join(", ");
        spam_indicators.push(SpamIndicator {
            severity: Severity::Critical,
            category: IndicatorCategory::Content,
            issue: format!("Repeated URLs detected: {}", listed),
            explanation: "Repeating the same URL multiple times is a classic spam tactic".into(),
            recommendation: "Mention your URL once or twice maximum".into(),
            impact: Impact::High,
        });
        // The single largest penalty; applies once no matter how many domains qualify.
        spam_score += weights.repeated_domain;
    }

    // --- Technical ---

    if technical.has_unsubscribe_link {
        positives.push(Positive {
            aspect: "Unsubscribe link present".into(),
            description: "Required for commercial emails and improves deliverability".into(),
        });
    } else {
        spam_indicators.push(SpamIndicator {
            severity: if personal {
                Severity::Warning
            } else {
                Severity::Critical
            },
            category: IndicatorCategory::Technical,
            issue: if personal {
                "No unsubscribe link (required for mass emails)".into()
            } else {
                "No unsubscribe link found".into()
            },
            explanation: if personal {
                "If sending to multiple recipients, the CAN-SPAM Act requires an unsubscribe link. Not needed for personal replies.".into()
            } else {
                "Required by the CAN-SPAM Act for all commercial/marketing emails".into()
            },
            recommendation: if personal {
                "For mass emails: add an unsubscribe link. For personal emails: you're fine.".into()
            } else {
                "Add a clear unsubscribe link at the bottom of the email".into()
            },
            impact: if personal { Impact::Medium } else { Impact::High },
        });
        spam_score += if personal {
            weights.missing_unsubscribe_personal
        } else {
            weights.missing_unsubscribe_bulk
        };
    }

    if technical.link_count > 5 {
        spam_indicators.push(SpamIndicator {
            severity: Severity::Warning,
            category: IndicatorCategory::Links,
            issue: "Too many links in email".into(),
            explanation: "Excessive links are a common spam indicator".into(),
            recommendation: "Reduce to 2-3 essential links".into(),
            impact: Impact::Medium,
        });
        spam_score += weights.too_many_links;
    }

    if technical.phone_number_count > 0 {
        spam_indicators.push(SpamIndicator {
            severity: Severity::Warning,
            category: IndicatorCategory::Content,
            issue: "Contains phone number".into(),
            explanation: "Phone numbers in emails can be a spam indicator".into(),
            recommendation: "Consider removing or using a contact form instead".into(),
            impact: Impact::Low,
        });
        spam_score += weights.phone_number;
    }

    let spam_score = clamp_score(spam_score);

    // --- Positives: each one is an independently checked signal ---

    if spam_words.is_empty() {
        positives.push(Positive {
            aspect: "Clean, professional language".into(),
            description: "No spam trigger words detected - great conversational tone!".into(),
        });
    }
    if subject_len > 0 && subject_len <= 60 && caps_ratio < 0.3 {
        positives.push(Positive {
            aspect: "Well-crafted subject line".into(),
            description: "Good length and natural capitalization".into(),
        });
    }
    // Zero links earns nothing here: linkless is neutral, not necessarily good.
    if technical.link_count > 0 && technical.link_count <= 3 {
        positives.push(Positive {
            aspect: "Appropriate link usage".into(),
            description: format!(
                "{} link{} - not excessive",
                technical.link_count,
                if technical.link_count > 1 { "s" } else { "" }
            ),
        });
    }
    if technical.exclamation_count <= 1 {
        positives.push(Positive {
            aspect: "Professional tone".into(),
            description: "Minimal use of exclamation marks and emphasis".into(),
        });
    }
    if personal && spam_words.is_empty() {
        positives.push(Positive {
            aspect: "Personal, authentic voice".into(),
            description: "Reads like a genuine one-on-one conversation".into(),
        });
    }
    if technical.word_count > 30 && technical.word_count < 200 {
        positives.push(Positive {
            aspect: "Good length".into(),
            description: "Concise but substantial - ideal for email".into(),
        });
    }

    let recommendations = build_recommendations(
        subject,
        body,
        &technical,
        &spam_words,
        &subject_line_issues,
        &positives,
        personal,
        caps_ratio,
    );

    Analysis {
        spam_score,
        verdict: Verdict::from_spam_score(spam_score),
        subject_line_issues,
        spam_indicators,
        positives,
        recommendations,
        technical_details: technical,
        // Rewrites come only from the generative path.
        suggested_rewrite: None,
    }
}

/// Synthesize recommendations for the issues actually present. Never generic
/// filler; each carries literal text lifted from the input.
#[allow(clippy::too_many_arguments)]
fn build_recommendations(
    subject: &str,
    body: &str,
    technical: &TechnicalFeatures,
    spam_words: &[&str],
    subject_line_issues: &[SubjectIssue],
    positives: &[Positive],
    personal: bool,
    subject_caps_ratio: f32,
) -> Vec<Recommendation> {
    let mut recommendations: Vec<Recommendation> = Vec::new();

    if !spam_words.is_empty() {
        let examples = spam_words
            .iter()
            .take(3)
            .map(|word| {
                format!(
                    "\"{}\" -> Remove or reword this phrase",
                    extract_context(body, word, DEFAULT_CONTEXT_LEN)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        recommendations.push(Recommendation {
            priority: 1,
            action: "Remove spam trigger words".into(),
            impact: Impact::High,
            details: format!("Found: {}.\n\n{}", spam_words.join(", "), examples),
        });
    }

    if !technical.repeated_url_domains.is_empty() {
        let listed = technical
            .repeated_url_domains
            .iter()
            .map(|(domain, count)| format!("\"{}\" {} times", domain, count))
            .collect::<Vec<_>>()
            .join(", ");
        recommendations.push(Recommendation {
            priority: 1,
            action: "Remove repeated URLs".into(),
            impact: Impact::High,
            details: format!(
                "You repeated {}.\n\nSpam filters HATE this. Mention your URL once, maybe twice max.\n\nExample: \"Check out SpamRun.com\" (once) instead of listing it 5 times.",
                listed
            ),
        });
    }

    if technical.all_caps_words.len() > 2 {
        let rewrites = technical
            .all_caps_words
            .iter()
            .take(3)
            .map(|w| format!("\"{}\" -> \"{}\"", w, sentence_case(w)))
            .collect::<Vec<_>>()
            .join("\n");
        recommendations.push(Recommendation {
            priority: 2,
            action: "Fix all-caps words".into(),
            impact: Impact::High,
            details: format!(
                "Found {} all-caps words: {}\n\nChange to normal case:\n{}",
                technical.all_caps_words.len(),
                technical
                    .all_caps_words
                    .iter()
                    .take(5)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
                rewrites
            ),
        });
    }

    // CAN-SPAM footer elements. Personal replies are exempt outright; no
    // recommendation at all rather than an alarming one.
    if !technical.has_unsubscribe_link || !technical.has_physical_address {
        if !personal {
            let mut missing: Vec<&str> = Vec::new();
            if !technical.has_unsubscribe_link {
                missing.push("unsubscribe link");
            }
            if !technical.has_physical_address {
                missing.push("physical address");
            }
            let missing_items = missing.join(" and ");
            recommendations.push(Recommendation {
                priority: 7,
                action: format!("Add {} (CAN-SPAM required)", missing_items),
                impact: Impact::High,
                details: format!(
                    "Required by the CAN-SPAM Act for commercial emails: {}.\n\nAdd at the bottom:\n\"Unsubscribe | Company Name, 123 Main St, City, ST 12345\"\n\nNot required for personal replies or transactional emails.",
                    missing_items
                ),
            });
        }
    }

    if !subject_line_issues.is_empty() {
        let issue_list = subject_line_issues
            .iter()
            .map(|i| i.issue.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let mut better_subject = subject.to_string();
        if subject_caps_ratio > 0.5 {
            better_subject = sentence_case(&better_subject);
        }
        if subject.chars().count() > 60 {
            better_subject = better_subject.chars().take(57).collect::<String>() + "...";
        }
        recommendations.push(Recommendation {
            priority: 3,
            action: "Optimize subject line".into(),
            impact: Impact::Medium,
            details: format!(
                "Current: \"{}\"\nIssues: {}\n\nTry: \"{}\"",
                subject, issue_list, better_subject
            ),
        });
    }

    if technical.exclamation_count >= 3 || technical.all_caps_words.len() > 2 {
        let mut examples: Vec<String> = Vec::new();
        if technical.exclamation_count >= 3 {
            examples.push(format!(
                "Remove {} exclamation marks",
                technical.exclamation_count - 1
            ));
        }
        if technical.all_caps_words.len() > 2 {
            examples.push(format!(
                "Change \"{}\" to normal case",
                technical
                    .all_caps_words
                    .iter()
                    .take(2)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        recommendations.push(Recommendation {
            priority: 4,
            action: "Reduce emphasis formatting".into(),
            impact: Impact::Medium,
            details: examples.join("\n"),
        });
    }

    // Affirmation when the tone is fine and only technical bits remain.
    if spam_words.is_empty() && technical.has_unsubscribe_link && !positives.is_empty() {
        recommendations.push(Recommendation {
            priority: 5,
            action: "Your tone is great!".into(),
            impact: Impact::Low,
            details: "Keep the conversational style. Focus on technical requirements only.".into(),
        });
    }

    // Stable sort keeps insertion order within a priority tier.
    recommendations.sort_by_key(|r| r.priority);
    recommendations
}

/// First letter upper-case, everything after lower-case.
fn sentence_case(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => {
            first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::weights::ScoringWeights;

    fn score(subject: &str, body: &str) -> Analysis {
        score_email(subject, body, &ScoringWeights::default())
    }

    #[test]
    fn personal_requires_opener_short_body_and_no_unsubscribe_mention() {
        assert!(is_personal_email("Hi Sam, quick update on the project.", 6));
        assert!(!is_personal_email("Grab our deals before they expire.", 6));
        // Mentioning unsubscribe implies bulk intent despite the tone.
        assert!(!is_personal_email("Hi Sam, click unsubscribe below.", 5));
        // Long bodies read as bulk regardless of greeting.
        assert!(!is_personal_email("Hi Sam, here is the newsletter.", 400));
    }

    #[test]
    fn personal_email_gets_the_reduced_unsubscribe_penalty() {
        let personal = score("Checking in", "Hi Sam, just checking in on the numbers.");
        let bulk = score("Checking in", "Our latest catalog is out for the season.");
        assert_eq!(personal.spam_score, 10);
        assert_eq!(bulk.spam_score, 25);
    }

    #[test]
    fn distinct_lexicon_hits_compound() {
        let one = score("Update", "Hi Sam, the free tier is live now, let me know.");
        let two = score("Update", "Hi Sam, the free tier is live, earn credits too.");
        assert_eq!(one.spam_score, 10 + 15);
        // "free", "earn", "credit" all land.
        assert_eq!(two.spam_score, 10 + 45);
        assert!(two.spam_score >= one.spam_score);
    }

    #[test]
    fn subject_spam_word_and_punctuation_stack() {
        let a = score("SPAM!@!!", "hi, just checking in");
        // spam word +30, special run +20, three exclamations +15,
        // missing unsubscribe on a non-personal body +25.
        assert_eq!(a.spam_score, 90);
        assert_eq!(a.verdict, Verdict::SpamLikely);
        assert!(a
            .subject_line_issues
            .iter()
            .any(|i| i.kind == SubjectIssueKind::SpamWord));
        assert!(a
            .subject_line_issues
            .iter()
            .any(|i| i.kind == SubjectIssueKind::ExcessivePunctuation));
    }

    #[test]
    fn repeated_domain_penalty_applies_once() {
        let body = "http://promo.biz http://promo.biz http://promo.biz http://promo.biz \
                    http://promo.biz a b c d e";
        let a = score("Offer inside", body);
        let indicator = a
            .spam_indicators
            .iter()
            .find(|i| i.issue.starts_with("Repeated URLs detected"))
            .expect("repeated-domain indicator");
        assert_eq!(indicator.severity, Severity::Critical);
        assert!(indicator.issue.contains("promo.biz (5x)"));
        let rec = a
            .recommendations
            .iter()
            .find(|r| r.action == "Remove repeated URLs")
            .expect("repeated-domain recommendation");
        assert!(rec.details.contains("\"promo.biz\" 5 times"));
        // repeated domain +35, missing unsubscribe +25.
        assert_eq!(a.spam_score, 60);
    }

    #[test]
    fn clean_personal_email_scores_inbox_ready() {
        let a = score(
            "Quick question about the proposal",
            "Hi Sam, thanks for meeting yesterday. Can you send the updated numbers? Thanks, Alex",
        );
        assert!(a.spam_score < 20);
        assert_eq!(a.verdict, Verdict::InboxReady);
        assert!(a
            .positives
            .iter()
            .any(|p| p.aspect == "Clean, professional language"));
        assert!(a
            .positives
            .iter()
            .any(|p| p.aspect == "Personal, authentic voice"));
    }

    #[test]
    fn zero_links_is_neutral_not_positive() {
        let a = score("Checking in", "Hi Sam, just checking in on the numbers.");
        assert!(!a
            .positives
            .iter()
            .any(|p| p.aspect == "Appropriate link usage"));
    }

    #[test]
    fn great_tone_recommendation_when_nothing_is_wrong() {
        let a = score(
            "Monthly notes",
            "Hi Sam, thanks for the update. You can opt out of these notes anytime. Best, Alex",
        );
        assert_eq!(a.spam_score, 0);
        assert_eq!(a.recommendations.len(), 1);
        assert_eq!(a.recommendations[0].action, "Your tone is great!");
    }

    #[test]
    fn lexicon_only_penalty_yields_exactly_the_spam_word_recommendation() {
        let a = score(
            "Monthly notes",
            "Hi Sam, thanks again. The first month is free if you want it. You can opt out anytime.",
        );
        assert_eq!(a.spam_score, 15);
        assert_eq!(a.recommendations.len(), 1);
        assert_eq!(a.recommendations[0].action, "Remove spam trigger words");
        assert!(a.recommendations[0].details.contains("free"));
    }

    #[test]
    fn caps_heavy_subject_gets_a_downcased_rewrite() {
        let a = score("HELLO THERE", "Hi Sam, just checking in on the numbers.");
        assert!(a
            .subject_line_issues
            .iter()
            .any(|i| i.kind == SubjectIssueKind::ExcessiveCaps));
        let rec = a
            .recommendations
            .iter()
            .find(|r| r.action == "Optimize subject line")
            .expect("subject recommendation");
        assert!(rec.details.contains("Try: \"Hello there\""));
    }

    #[test]
    fn overlong_subject_rewrite_is_truncated_with_ellipsis() {
        let subject = "a".repeat(70);
        let a = score(&subject, "Hi Sam, just checking in on the numbers.");
        let rec = a
            .recommendations
            .iter()
            .find(|r| r.action == "Optimize subject line")
            .expect("subject recommendation");
        assert!(rec.details.contains(&format!("Try: \"{}...\"", "a".repeat(57))));
    }

    #[test]
    fn personal_email_skips_the_can_spam_recommendation() {
        let a = score("Checking in", "Hi Sam, just checking in on the numbers.");
        assert!(!a
            .recommendations
            .iter()
            .any(|r| r.action.contains("CAN-SPAM")));
        // Bulk mail with the same gaps gets the nag.
        let b = score("Checking in", "Our latest catalog is out for the season.");
        let rec = b
            .recommendations
            .iter()
            .find(|r| r.action.contains("CAN-SPAM"))
            .expect("bulk CAN-SPAM recommendation");
        assert_eq!(rec.priority, 7);
        assert!(rec.action.contains("unsubscribe link and physical address"));
    }

    #[test]
    fn recommendations_are_sorted_ascending_by_priority() {
        let body = "FREE CASH NOW!!! Visit http://promo.biz http://promo.biz http://promo.biz \
                    http://promo.biz http://promo.biz or call 555-123-4567 today!";
        let a = score("ACT NOW!!!", body);
        let priorities: Vec<u32> = a.recommendations.iter().map(|r| r.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort_unstable();
        assert_eq!(priorities, sorted);
        assert!(a.recommendations.len() >= 3);
    }

    #[test]
    fn totality_on_degenerate_input() {
        let empty = score("", "");
        assert_eq!(empty.spam_score, 25); // missing unsubscribe, bulk by default
        assert_eq!(empty.verdict, Verdict::NeedsImprovement);

        let long_body = "word ".repeat(12_000);
        let long = score("", &long_body);
        assert!(long.spam_score <= 100);
    }
}
