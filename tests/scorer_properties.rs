// tests/scorer_properties.rs
//
// Property coverage for the rule-based path: score bounds, derived-score
// invariants, verdict partition, determinism, monotonicity, totality.

use spamrun_analyzer::analyze::scorer::score_email;
use spamrun_analyzer::analyze::weights::ScoringWeights;
use spamrun_analyzer::report::Verdict;
use spamrun_analyzer::EmailAnalyzer;

fn assorted_inputs() -> Vec<(String, String)> {
    vec![
        ("".into(), "".into()),
        ("hello".into(), "just a note".into()),
        (
            "FREE CASH NOW!!!".into(),
            "ACT NOW!!! earn cash, free credit, viagra, click here http://promo.biz \
             http://promo.biz http://promo.biz http://promo.biz http://promo.biz \
             call 555-123-4567"
                .into(),
        ),
        ("a".repeat(500), "b!".repeat(4_000)),
        ("\u{0}\u{1}\u{2}".into(), "\u{fffd}\u{0}binary\u{7}garbage".into()),
        ("Subject".into(), "word ".repeat(12_000)),
    ]
}

#[tokio::test]
async fn scores_stay_in_bounds_and_derive_correctly() {
    let analyzer = EmailAnalyzer::rule_based_only();
    for (subject, body) in assorted_inputs() {
        let r = analyzer.analyze_email(&subject, &body).await;
        assert!(r.spam_score <= 100);
        assert!(r.deliverability_score <= 100);
        assert!(r.estimated_inbox_rate <= 100);
        assert_eq!(r.deliverability_score, 100 - r.spam_score);
        assert_eq!(
            r.estimated_inbox_rate,
            r.deliverability_score.saturating_sub(10)
        );
        assert_eq!(r.verdict, Verdict::from_spam_score(r.spam_score));
    }
}

#[test]
fn rule_based_path_is_deterministic() {
    let weights = ScoringWeights::default();
    for (subject, body) in assorted_inputs() {
        let first = score_email(&subject, &body, &weights);
        let second = score_email(&subject, &body, &weights);
        assert_eq!(first, second, "subject {subject:?} scored differently");
    }
}

#[test]
fn adding_a_lexicon_hit_never_decreases_the_score() {
    let weights = ScoringWeights::default();
    let base_body = "Our newsletter covers free tools for your team.";
    let base = score_email("Weekly update", base_body, &weights);
    assert!(base.spam_score > 0);

    // Repeating an already-present word keeps the distinct-hit count.
    let repeated = format!("{base_body} Everything stays free forever.");
    let r = score_email("Weekly update", &repeated, &weights);
    assert!(r.spam_score >= base.spam_score);

    // A fresh lexicon word strictly compounds.
    let extended = format!("{base_body} You could earn extras too.");
    let e = score_email("Weekly update", &extended, &weights);
    assert!(e.spam_score > base.spam_score);
}

#[test]
fn totality_on_extreme_inputs() {
    let weights = ScoringWeights::default();
    // 10k+ words, no panic, still clamped.
    let huge = "lorem ipsum dolor ".repeat(8_000);
    let r = score_email("", &huge, &weights);
    assert!(r.spam_score <= 100);

    // Multi-byte garbage, long subject.
    let r = score_email(&"é".repeat(10_000), "héllo wörld \u{1F4E7}", &weights);
    assert!(r.spam_score <= 100);
}

#[test]
fn verdict_partition_has_no_gaps_or_overlaps() {
    for score in 0..=100u32 {
        let v = Verdict::from_spam_score(score);
        let expected = if score < 20 {
            Verdict::InboxReady
        } else if score < 50 {
            Verdict::NeedsImprovement
        } else if score < 75 {
            Verdict::HighRisk
        } else {
            Verdict::SpamLikely
        };
        assert_eq!(v, expected, "score {score}");
    }
}
