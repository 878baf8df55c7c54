//! Generative backend adapter: provider abstraction over the Anthropic
//! Messages API, plus the untrusted-response validation layer.
//!
//! The adapter never retries and never falls back on its own. Any failure --
//! missing credential, transport error, non-JSON response, schema mismatch --
//! propagates to the orchestrator, which switches to the rule-based scorer.

use std::fs;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::report::{
    clamp_score, Positive, Recommendation, SpamIndicator, SubjectIssue,
};

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Validated analysis returned by a generative provider. Technical details
/// are deliberately absent: those are always computed locally.
#[derive(Debug, Clone, PartialEq)]
pub struct AiAnalysis {
    pub spam_score: u32,
    pub subject_line_issues: Vec<SubjectIssue>,
    pub spam_indicators: Vec<SpamIndicator>,
    pub positives: Vec<Positive>,
    pub recommendations: Vec<Recommendation>,
    pub suggested_rewrite: Option<String>,
}

/// Trait object used by the orchestrator (and tests).
pub trait AiClient: Send + Sync {
    /// Analyze one email through the backend. Errors are terminal for this
    /// attempt; the caller decides what to do next.
    fn analyze<'a>(
        &'a self,
        subject: &'a str,
        body: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<AiAnalysis>> + Send + 'a>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynAiClient = Arc<dyn AiClient>;

/// Build-time config loaded from `config/ai.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// "claude" is the only provider currently wired up.
    pub provider: Option<String>,
    /// "ENV" means: read from ANTHROPIC_API_KEY.
    pub api_key: Option<String>,
    /// Model override; defaults to claude-3-5-sonnet-20241022.
    pub model: Option<String>,
    /// Caller-supplied request timeout; the core imposes none of its own.
    pub timeout_secs: Option<u64>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: None,
            api_key: None,
            model: None,
            timeout_secs: Some(30),
        }
    }
}

/// Load config from `config/ai.json`. If reading/parsing fails, returns
/// `AiConfig::default()` (disabled), which keeps the analyzer on the
/// rule-based path.
pub fn load_ai_config() -> AiConfig {
    let path = Path::new("config/ai.json");
    match fs::read_to_string(path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
        Err(_) => AiConfig::default(),
    }
}

/// Reads config from disk and builds a client, if one is configured at all.
pub fn build_ai_client() -> Option<DynAiClient> {
    build_client_from_config(&load_ai_config())
}

/// Factory: build a client according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock client.
/// * Else if the config is disabled or no credential resolves, returns `None`
///   and the orchestrator never leaves the rule-based path.
pub fn build_client_from_config(config: &AiConfig) -> Option<DynAiClient> {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Some(Arc::new(MockClient::default()));
    }

    if !config.enabled {
        return None;
    }

    match config.provider.as_deref() {
        Some("claude") => {
            let api_key = resolve_api_key(config)?;
            Some(Arc::new(ClaudeClient::new(
                api_key,
                config.model.clone(),
                config.timeout_secs,
            )))
        }
        _ => None,
    }
}

fn resolve_api_key(config: &AiConfig) -> Option<String> {
    match config.api_key.as_deref() {
        Some(raw) if raw.trim().eq_ignore_ascii_case("env") => {
            std::env::var("ANTHROPIC_API_KEY").ok().filter(|k| !k.is_empty())
        }
        Some(raw) if !raw.trim().is_empty() => Some(raw.trim().to_string()),
        _ => None,
    }
}

// ------------------------------------------------------------
// Claude provider (Anthropic Messages API)
// ------------------------------------------------------------

const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct ClaudeClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl ClaudeClient {
    pub fn new(api_key: String, model_override: Option<String>, timeout_secs: Option<u64>) -> Self {
        let mut builder = reqwest::Client::builder()
            .user_agent("spamrun-analyzer/0.1")
            .connect_timeout(Duration::from_secs(4));
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().expect("reqwest client");
        let model = model_override.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Self {
            http,
            api_key,
            model,
        }
    }

    async fn fetch(&self, subject: &str, body: &str) -> anyhow::Result<AiAnalysis> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: String,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            max_tokens: u32,
            temperature: f32,
            messages: Vec<Msg<'a>>,
        }
        #[derive(Deserialize)]
        struct Resp {
            content: Vec<Block>,
        }
        #[derive(Deserialize)]
        struct Block {
            #[serde(rename = "type")]
            kind: String,
            #[serde(default)]
            text: String,
        }

        let req = Req {
            model: &self.model,
            max_tokens: 4096,
            temperature: 0.3,
            messages: vec![Msg {
                role: "user",
                content: build_prompt(subject, body),
            }],
        };

        let resp = self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req)
            .send()
            .await
            .context("anthropic request failed")?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("anthropic returned status {status}"));
        }

        let parsed: Resp = resp.json().await.context("invalid anthropic response body")?;
        let text = parsed
            .content
            .iter()
            .find(|b| b.kind == "text")
            .map(|b| b.text.as_str())
            .ok_or_else(|| anyhow!("anthropic response had no text block"))?;

        parse_ai_payload(text)
    }
}

impl AiClient for ClaudeClient {
    fn analyze<'a>(
        &'a self,
        subject: &'a str,
        body: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<AiAnalysis>> + Send + 'a>> {
        Box::pin(self.fetch(subject, body))
    }
    fn provider_name(&self) -> &'static str {
        "claude"
    }
}

/// Deterministic mock for tests/local runs: a mild but non-trivial report.
#[derive(Default)]
pub struct MockClient;

impl AiClient for MockClient {
    fn analyze<'a>(
        &'a self,
        _subject: &'a str,
        _body: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<AiAnalysis>> + Send + 'a>> {
        Box::pin(async {
            Ok(AiAnalysis {
                spam_score: 10,
                subject_line_issues: Vec::new(),
                spam_indicators: Vec::new(),
                positives: vec![Positive {
                    aspect: "Neutral mock verdict".into(),
                    description: "Fixed response used in AI_TEST_MODE=mock".into(),
                }],
                recommendations: Vec::new(),
                suggested_rewrite: None,
            })
        })
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Prompt
// ------------------------------------------------------------

/// Aggressive calibration: the scorer's point table is tuned to agree with
/// this framing, so results don't diverge wildly across paths.
fn build_prompt(subject: &str, body: &str) -> String {
    format!(
        r#"You are a STRICT email deliverability expert. You catch spam patterns that others miss.

Subject: {subject}

Body:
{body}

RED FLAGS TO WATCH FOR:
- All-caps subject lines or excessive punctuation (!!!, @@@)
- Repeated URLs or text (like "spam.com spam.com spam.com")
- The word "SPAM" in subject/body (ironic but still a flag!)
- Excessive exclamation marks
- Missing unsubscribe links in marketing emails
- Too many links
- Overly promotional language

Be AGGRESSIVE in scoring. A subject like "SPAM!@!!" should be 70+ spam score.
Repeated URLs are a MASSIVE red flag (add 30+ points).

Provide analysis in this JSON format:
{{
  "spamScore": <number 0-100>,
  "subjectLineIssues": [
    {{
      "type": "spam_word" | "excessive_caps" | "excessive_punctuation" | "length" | "misleading",
      "issue": "description",
      "recommendation": "how to fix"
    }}
  ],
  "spamIndicators": [
    {{
      "type": "critical" | "warning" | "info",
      "category": "content" | "formatting" | "links" | "subject" | "technical",
      "issue": "what's wrong",
      "explanation": "why it's a problem",
      "recommendation": "how to fix it",
      "impact": "high" | "medium" | "low"
    }}
  ],
  "positives": [
    {{
      "aspect": "what's good",
      "description": "why it helps"
    }}
  ],
  "recommendations": [
    {{
      "priority": <number 1-10>,
      "action": "SPECIFIC action to take (e.g., 'Add unsubscribe link', not vague terms)",
      "impact": "high" | "medium" | "low",
      "details": "specific guidance with examples - show before/after if major issues found"
    }}
  ],
  "suggestedRewrite": "If spam score > 50, provide a complete rewritten version that fixes all issues while keeping the core message. Make it conversational, professional, and deliverable. If score < 50, leave this field empty."
}}

Be harsh but fair. Real spam should score 70+."#
    )
}

// ------------------------------------------------------------
// Untrusted-response validation
// ------------------------------------------------------------

/// Wire shape the model is asked to emit. Treated as untrusted input: every
/// sequence defaults to empty, only the score itself is mandatory.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AiPayload {
    spam_score: f64,
    #[serde(default)]
    subject_line_issues: Vec<SubjectIssue>,
    #[serde(default)]
    spam_indicators: Vec<SpamIndicator>,
    #[serde(default)]
    positives: Vec<Positive>,
    #[serde(default)]
    recommendations: Vec<Recommendation>,
    #[serde(default)]
    suggested_rewrite: Option<String>,
}

/// Extract the first JSON object from free-form response text and validate it
/// into `AiAnalysis`. Fractional scores are rounded, then clamped to [0,100].
/// The rewrite is kept only above score 50; below that it is noise.
pub fn parse_ai_payload(text: &str) -> anyhow::Result<AiAnalysis> {
    let start = text.find('{').ok_or_else(|| anyhow!("no JSON object in response"))?;
    let end = text.rfind('}').ok_or_else(|| anyhow!("no JSON object in response"))?;
    if end < start {
        return Err(anyhow!("no JSON object in response"));
    }

    let payload: AiPayload =
        serde_json::from_str(&text[start..=end]).context("response JSON did not match schema")?;

    let spam_score = clamp_score(payload.spam_score.round().max(0.0) as u32);
    let mut recommendations = payload.recommendations;
    recommendations.sort_by_key(|r| r.priority);

    let suggested_rewrite = payload
        .suggested_rewrite
        .filter(|s| !s.trim().is_empty())
        .filter(|_| spam_score > 50);

    Ok(AiAnalysis {
        spam_score,
        subject_line_issues: payload.subject_line_issues,
        spam_indicators: payload.spam_indicators,
        positives: payload.positives,
        recommendations,
        suggested_rewrite,
    })
}
