//! AI content classification for scraped job pages.
//!
//! Given extracted page text, the classifier asks a text-completion backend
//! to interpret it and reduces the reply to a structured [`Verdict`]: is
//! this a bot-challenge page, an expired posting, a genuine software job,
//! and if so what company/title/salary/stack/location/work-mode. Calls are
//! rate-limited behind a module-wide cooldown shared by every caller, and a
//! minimum-content pre-filter short-circuits interstitial pages before any
//! backend cost is paid.
//!
//! Failure philosophy: a missing or malformed backend reply returns `None`
//! and the caller falls back to card-derived fields with conservative flags.
//! A dropped classification must never drop a real posting.

mod backend;

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

pub use backend::{ClassifyBackend, ClassifierError, HttpBackend};

/// Job category taxonomy. Closed set; free-text backend output is folded
/// into the nearest bucket or `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobCategory {
    Backend,
    Frontend,
    FullStack,
    Mobile,
    Data,
    MachineLearning,
    DevOps,
    Security,
    Embedded,
    QualityAssurance,
    GameDev,
    NonSoftware,
    Unknown,
}

impl JobCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Frontend => "frontend",
            Self::FullStack => "fullstack",
            Self::Mobile => "mobile",
            Self::Data => "data",
            Self::MachineLearning => "machine_learning",
            Self::DevOps => "devops",
            Self::Security => "security",
            Self::Embedded => "embedded",
            Self::QualityAssurance => "qa",
            Self::GameDev => "gamedev",
            Self::NonSoftware => "non_software",
            Self::Unknown => "unknown",
        }
    }

    /// Fold free text into the taxonomy.
    pub fn from_text(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.is_empty() {
            return Self::Unknown;
        }
        if lower.contains("non-software") || lower.contains("not software") {
            return Self::NonSoftware;
        }
        if lower.contains("full") {
            return Self::FullStack;
        }
        if lower.contains("front") {
            return Self::Frontend;
        }
        if lower.contains("back") {
            return Self::Backend;
        }
        if lower.contains("mobile") || lower.contains("ios") || lower.contains("android") {
            return Self::Mobile;
        }
        if lower.contains("machine") || lower.contains("ml ") || lower == "ml" {
            return Self::MachineLearning;
        }
        if lower.contains("data") {
            return Self::Data;
        }
        if lower.contains("devops")
            || lower.contains("sre")
            || lower.contains("platform")
            || lower.contains("infrastructure")
        {
            return Self::DevOps;
        }
        if lower.contains("security") {
            return Self::Security;
        }
        if lower.contains("embedded") || lower.contains("firmware") {
            return Self::Embedded;
        }
        if lower.contains("qa") || lower.contains("quality") || lower.contains("test") {
            return Self::QualityAssurance;
        }
        if lower.contains("game") {
            return Self::GameDev;
        }
        Self::Unknown
    }
}

/// Industry taxonomy, same folding approach as [`JobCategory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Industry {
    Technology,
    Finance,
    Healthcare,
    ECommerce,
    Education,
    Government,
    Defense,
    Gambling,
    Crypto,
    Staffing,
    Media,
    Other,
}

impl Industry {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technology => "technology",
            Self::Finance => "finance",
            Self::Healthcare => "healthcare",
            Self::ECommerce => "ecommerce",
            Self::Education => "education",
            Self::Government => "government",
            Self::Defense => "defense",
            Self::Gambling => "gambling",
            Self::Crypto => "crypto",
            Self::Staffing => "staffing",
            Self::Media => "media",
            Self::Other => "other",
        }
    }

    pub fn from_text(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.is_empty() {
            return Self::Other;
        }
        if lower.contains("staffing") || lower.contains("recruit") || lower.contains("agency") {
            return Self::Staffing;
        }
        if lower.contains("defense") || lower.contains("military") || lower.contains("aerospace") {
            return Self::Defense;
        }
        if lower.contains("gambl") || lower.contains("casino") || lower.contains("betting") {
            return Self::Gambling;
        }
        if lower.contains("crypto") || lower.contains("blockchain") || lower.contains("web3") {
            return Self::Crypto;
        }
        if lower.contains("health") || lower.contains("medic") || lower.contains("pharma") {
            return Self::Healthcare;
        }
        if lower.contains("fintech") || lower.contains("finance") || lower.contains("bank") {
            return Self::Finance;
        }
        if lower.contains("commerce") || lower.contains("retail") {
            return Self::ECommerce;
        }
        if lower.contains("edu") {
            return Self::Education;
        }
        if lower.contains("government") || lower.contains("public sector") {
            return Self::Government;
        }
        if lower.contains("media")
            || lower.contains("advertis")
            || lower.contains("marketing")
            || lower.contains("adtech")
        {
            return Self::Media;
        }
        if lower.contains("tech") || lower.contains("software") || lower.contains("saas") {
            return Self::Technology;
        }
        Self::Other
    }
}

/// Structured interpretation of a job page.
#[derive(Debug, Clone)]
pub struct Verdict {
    /// Looks like a bot-challenge/verification interstitial, not content.
    pub is_verification_page: bool,
    /// Posting is closed or no longer accepting applications.
    pub is_expired: bool,
    pub is_software_job: bool,
    pub company: String,
    pub title: String,
    pub salary: Option<String>,
    pub tech_stack: Vec<String>,
    pub location: Option<String>,
    pub is_remote: bool,
    pub is_hybrid: bool,
    pub is_onsite: bool,
    pub is_startup: bool,
    pub job_type: JobCategory,
    pub industry: Industry,
}

/// Raw backend reply shape. Every field is optional so a model that omits
/// half the keys still produces a usable verdict.
#[derive(Debug, Default, Deserialize)]
struct RawVerdict {
    #[serde(default)]
    is_verification_page: bool,
    #[serde(default)]
    is_expired: bool,
    #[serde(default, alias = "is_software_engineering_job")]
    is_software_job: bool,
    #[serde(default)]
    company: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    salary: Option<String>,
    #[serde(default)]
    tech_stack: Vec<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    work_type: Option<String>,
    #[serde(default)]
    is_startup: bool,
    #[serde(default)]
    job_type: Option<String>,
    #[serde(default)]
    industry: Option<String>,
}

const REMOTE_CUES: &[&str] = &["remote", "work from home", "wfh", "anywhere", "distributed"];
const HYBRID_CUES: &[&str] = &["hybrid", "days in office", "days on-site", "partially remote"];
const ONSITE_CUES: &[&str] = &[
    "on-site", "onsite", "on site", "in-person", "in person", "in office", "office-based",
];

/// Derive work-mode flags from the backend's free-text work-type plus the
/// location line. Hybrid and onsite cues veto a remote classification, so
/// "hybrid remote, 2 days in office" counts as hybrid, not remote.
fn derive_work_mode(work_type: Option<&str>, location: Option<&str>) -> (bool, bool, bool) {
    let mut haystack = String::new();
    if let Some(work_type) = work_type {
        haystack.push_str(&work_type.to_lowercase());
        haystack.push(' ');
    }
    if let Some(location) = location {
        haystack.push_str(&location.to_lowercase());
    }

    if HYBRID_CUES.iter().any(|cue| haystack.contains(cue)) {
        return (false, true, false);
    }
    if ONSITE_CUES.iter().any(|cue| haystack.contains(cue)) {
        return (false, false, true);
    }
    if REMOTE_CUES.iter().any(|cue| haystack.contains(cue)) {
        return (true, false, false);
    }
    (false, false, false)
}

/// Pull the first JSON object out of a model reply, tolerating markdown
/// fences and prose around it.
fn extract_json_object(reply: &str) -> Option<&str> {
    let cleaned = reply.trim();
    let cleaned = cleaned
        .strip_prefix("```json")
        .or_else(|| cleaned.strip_prefix("```"))
        .unwrap_or(cleaned);
    let cleaned = cleaned.strip_suffix("```").unwrap_or(cleaned);

    let start = cleaned.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in cleaned[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&cleaned[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Classifier settings, filled from the `[classifier]` config section.
#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    /// Minimum spacing between backend calls.
    pub min_interval: Duration,
    /// Page text shorter than this is treated as a non-content page.
    pub min_content_len: usize,
    /// Page text is truncated to this many bytes before prompting.
    pub max_content_chars: usize,
    pub blocked_industries: Vec<Industry>,
    pub blocked_categories: Vec<JobCategory>,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(6000),
            min_content_len: 400,
            max_content_chars: 12_000,
            blocked_industries: Vec::new(),
            blocked_categories: Vec::new(),
        }
    }
}

/// Rate-limited classification service shared by every driver.
pub struct Classifier {
    backend: Arc<dyn ClassifyBackend>,
    settings: ClassifierSettings,
    last_call: Mutex<Option<Instant>>,
}

impl Classifier {
    pub fn new(backend: Arc<dyn ClassifyBackend>, settings: ClassifierSettings) -> Self {
        Self {
            backend,
            settings,
            last_call: Mutex::new(None),
        }
    }

    /// Whether text falls under the minimum-content pre-filter. Drivers use
    /// this to skip a candidate before even asking for classification.
    pub fn is_content_too_short(&self, text: &str) -> bool {
        text.trim().len() < self.settings.min_content_len
    }

    /// Classify extracted page text.
    ///
    /// Short text short-circuits to a verification-page verdict without
    /// touching the backend or the cooldown. Backend failure or a reply
    /// with no parseable JSON returns None; callers fall back to card data.
    pub async fn classify(
        &self,
        page_text: &str,
        fallback_company: &str,
        fallback_title: &str,
        url: &str,
    ) -> Option<Verdict> {
        if self.is_content_too_short(page_text) {
            debug!(
                url,
                len = page_text.trim().len(),
                "content below threshold, skipping backend"
            );
            return Some(Verdict {
                is_verification_page: true,
                is_expired: false,
                is_software_job: false,
                company: fallback_company.to_string(),
                title: fallback_title.to_string(),
                salary: None,
                tech_stack: Vec::new(),
                location: None,
                is_remote: false,
                is_hybrid: false,
                is_onsite: false,
                is_startup: false,
                job_type: JobCategory::Unknown,
                industry: Industry::Other,
            });
        }

        self.await_cooldown().await;

        let prompt = self.build_prompt(page_text, url);
        let reply = match self.backend.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(url, error = %e, "classification backend call failed");
                return None;
            }
        };

        let json = match extract_json_object(&reply) {
            Some(json) => json,
            None => {
                warn!(url, "no JSON object in classifier reply");
                return None;
            }
        };
        let raw: RawVerdict = match serde_json::from_str(json) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(url, error = %e, "classifier reply did not deserialize");
                return None;
            }
        };

        Some(self.interpret(raw, fallback_company, fallback_title))
    }

    /// Whether a verdict fails the suitability policy. Returns the human
    /// reason when it does.
    pub fn unsuitability(&self, verdict: &Verdict) -> Option<String> {
        if !verdict.is_software_job || verdict.job_type == JobCategory::NonSoftware {
            return Some("not a software job".into());
        }
        if self.settings.blocked_categories.contains(&verdict.job_type) {
            return Some(format!("blocked category {}", verdict.job_type.as_str()));
        }
        if self.settings.blocked_industries.contains(&verdict.industry) {
            return Some(format!("blocked industry {}", verdict.industry.as_str()));
        }
        None
    }

    /// Clear the cooldown stamp. Called when the scheduler stops so a later
    /// start begins fresh.
    pub async fn release(&self) {
        *self.last_call.lock().await = None;
    }

    /// Serialize callers behind the shared minimum-interval cooldown.
    ///
    /// The lock is held across the sleep so two concurrent callers cannot
    /// both observe an expired stamp and fire together. Drivers run
    /// sequentially today, but the external API's rate limit must survive a
    /// concurrent scheduler too.
    async fn await_cooldown(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.settings.min_interval {
                tokio::time::sleep(self.settings.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn build_prompt(&self, page_text: &str, url: &str) -> String {
        let content = truncate_content(page_text, self.settings.max_content_chars);
        format!(
            r#"You are analyzing the text content of a web page that is expected to be a job posting.
Page URL: {url}

Reply with ONLY a JSON object, no prose, with these keys:
  "is_verification_page": bool  (true if this is a CAPTCHA/anti-bot/login interstitial, not a job posting)
  "is_expired": bool            (true if the posting says it is closed or no longer accepting applications)
  "is_software_job": bool       (true if this is a software engineering position)
  "company": string
  "title": string
  "salary": string or null      (exact salary text if shown)
  "tech_stack": array of strings (languages/frameworks/tools mentioned, most important first)
  "location": string or null
  "work_type": string or null   (e.g. "remote", "hybrid, 2 days in office", "onsite")
  "is_startup": bool
  "job_type": string            (e.g. "backend", "frontend", "fullstack", "mobile", "data", "devops", "non-software")
  "industry": string            (e.g. "technology", "finance", "healthcare", "staffing")

Page text:
{content}"#
        )
    }

    fn interpret(&self, raw: RawVerdict, fallback_company: &str, fallback_title: &str) -> Verdict {
        let company = if raw.company.trim().is_empty() {
            fallback_company.to_string()
        } else {
            raw.company.trim().to_string()
        };
        let title = if raw.title.trim().is_empty() {
            fallback_title.to_string()
        } else {
            raw.title.trim().to_string()
        };

        let (is_remote, is_hybrid, is_onsite) =
            derive_work_mode(raw.work_type.as_deref(), raw.location.as_deref());

        let tech_stack: Vec<String> = raw
            .tech_stack
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty() && t.len() <= 40)
            .take(15)
            .collect();

        Verdict {
            is_verification_page: raw.is_verification_page,
            is_expired: raw.is_expired,
            is_software_job: raw.is_software_job,
            company,
            title,
            salary: raw.salary.filter(|s| !s.trim().is_empty()),
            tech_stack,
            location: raw.location.filter(|s| !s.trim().is_empty()),
            is_remote,
            is_hybrid,
            is_onsite,
            is_startup: raw.is_startup,
            job_type: JobCategory::from_text(raw.job_type.as_deref().unwrap_or("")),
            industry: Industry::from_text(raw.industry.as_deref().unwrap_or("")),
        }
    }
}

/// Truncate to a byte budget on a valid UTF-8 boundary.
fn truncate_content(text: &str, max_chars: usize) -> &str {
    if text.len() <= max_chars {
        return text;
    }
    let mut end = max_chars;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedBackend {
        reply: String,
        calls: AtomicUsize,
        call_times: std::sync::Mutex<Vec<Instant>>,
    }

    impl FixedBackend {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
                call_times: std::sync::Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ClassifyBackend for FixedBackend {
        async fn complete(&self, _prompt: &str) -> Result<String, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.call_times.lock().unwrap().push(Instant::now());
            Ok(self.reply.clone())
        }
    }

    fn classifier_with(reply: &str, settings: ClassifierSettings) -> (Classifier, Arc<FixedBackend>) {
        let backend = FixedBackend::new(reply);
        (Classifier::new(backend.clone(), settings), backend)
    }

    fn fast_settings() -> ClassifierSettings {
        ClassifierSettings {
            min_interval: Duration::from_millis(10),
            min_content_len: 10,
            ..Default::default()
        }
    }

    const GOOD_REPLY: &str = r#"{
        "is_verification_page": false,
        "is_expired": false,
        "is_software_job": true,
        "company": "Acme",
        "title": "Rust Engineer",
        "salary": "$180k",
        "tech_stack": ["rust", "postgres", ""],
        "location": "Remote, USA",
        "work_type": "remote",
        "is_startup": true,
        "job_type": "backend",
        "industry": "technology"
    }"#;

    #[tokio::test]
    async fn test_classify_happy_path() {
        let (classifier, backend) = classifier_with(GOOD_REPLY, fast_settings());
        let verdict = classifier
            .classify("long enough page text about a rust job", "Card Co", "Card Title", "https://x")
            .await
            .expect("should classify");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert!(verdict.is_software_job);
        assert_eq!(verdict.company, "Acme");
        assert!(verdict.is_remote);
        assert!(!verdict.is_hybrid);
        assert_eq!(verdict.tech_stack, vec!["rust", "postgres"]);
        assert_eq!(verdict.job_type, JobCategory::Backend);
        assert_eq!(verdict.industry, Industry::Technology);
    }

    #[tokio::test]
    async fn test_short_content_skips_backend() {
        let (classifier, backend) = classifier_with(GOOD_REPLY, fast_settings());
        let verdict = classifier
            .classify("tiny", "Card Co", "Card Title", "https://x")
            .await
            .expect("short-circuit verdict");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert!(verdict.is_verification_page);
        assert_eq!(verdict.company, "Card Co");
        assert_eq!(verdict.title, "Card Title");
    }

    #[tokio::test]
    async fn test_fallback_merge_on_empty_fields() {
        let reply = r#"{"is_software_job": true, "company": "  ", "title": ""}"#;
        let (classifier, _) = classifier_with(reply, fast_settings());
        let verdict = classifier
            .classify("long enough page text here", "Card Co", "Card Title", "https://x")
            .await
            .unwrap();
        assert_eq!(verdict.company, "Card Co");
        assert_eq!(verdict.title, "Card Title");
        // Unknown flags stay conservative.
        assert!(!verdict.is_expired);
        assert!(!verdict.is_verification_page);
    }

    #[tokio::test]
    async fn test_fenced_reply_parses() {
        let reply = format!("Here you go:\n```json\n{GOOD_REPLY}\n```");
        let (classifier, _) = classifier_with(&reply, fast_settings());
        let verdict = classifier
            .classify("long enough page text here", "c", "t", "https://x")
            .await;
        assert!(verdict.is_some());
    }

    #[tokio::test]
    async fn test_garbage_reply_returns_none() {
        let (classifier, _) = classifier_with("I cannot help with that.", fast_settings());
        let verdict = classifier
            .classify("long enough page text here", "c", "t", "https://x")
            .await;
        assert!(verdict.is_none());
    }

    #[tokio::test]
    async fn test_cooldown_spaces_backend_calls() {
        let settings = ClassifierSettings {
            min_interval: Duration::from_millis(80),
            min_content_len: 5,
            ..Default::default()
        };
        let (classifier, backend) = classifier_with(GOOD_REPLY, settings);

        classifier.classify("first long text", "c", "t", "u").await;
        classifier.classify("second long text", "c", "t", "u").await;

        let times = backend.call_times.lock().unwrap();
        assert_eq!(times.len(), 2);
        assert!(times[1].duration_since(times[0]) >= Duration::from_millis(80));
    }

    #[test]
    fn test_work_mode_precedence() {
        // Hybrid vetoes remote.
        assert_eq!(
            derive_work_mode(Some("hybrid remote"), None),
            (false, true, false)
        );
        // Onsite vetoes remote.
        assert_eq!(
            derive_work_mode(Some("remote"), Some("in office, Austin TX")),
            (false, false, true)
        );
        assert_eq!(derive_work_mode(Some("fully remote"), None), (true, false, false));
        assert_eq!(derive_work_mode(None, None), (false, false, false));
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(extract_json_object(r#"{"a": 1}"#), Some(r#"{"a": 1}"#));
        assert_eq!(
            extract_json_object("prefix {\"a\": {\"b\": 2}} suffix"),
            Some("{\"a\": {\"b\": 2}}")
        );
        // Braces inside strings do not fool the scanner.
        assert_eq!(
            extract_json_object(r#"{"a": "brace } in string"}"#),
            Some(r#"{"a": "brace } in string"}"#)
        );
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[test]
    fn test_category_folding() {
        assert_eq!(JobCategory::from_text("Backend Engineering"), JobCategory::Backend);
        assert_eq!(JobCategory::from_text("full-stack"), JobCategory::FullStack);
        assert_eq!(JobCategory::from_text("not software (sales)"), JobCategory::NonSoftware);
        assert_eq!(JobCategory::from_text("gibberish"), JobCategory::Unknown);
    }

    #[test]
    fn test_industry_folding() {
        assert_eq!(Industry::from_text("fintech"), Industry::Finance);
        assert_eq!(Industry::from_text("Staffing & Recruiting"), Industry::Staffing);
        assert_eq!(Industry::from_text("iGaming / casino"), Industry::Gambling);
        assert_eq!(Industry::from_text("unknowable"), Industry::Other);
    }

    #[test]
    fn test_unsuitability_policy() {
        let (classifier, _) = classifier_with(
            GOOD_REPLY,
            ClassifierSettings {
                blocked_industries: vec![Industry::Staffing],
                ..fast_settings()
            },
        );
        let mut verdict = Verdict {
            is_verification_page: false,
            is_expired: false,
            is_software_job: true,
            company: "x".into(),
            title: "y".into(),
            salary: None,
            tech_stack: vec![],
            location: None,
            is_remote: true,
            is_hybrid: false,
            is_onsite: false,
            is_startup: false,
            job_type: JobCategory::Backend,
            industry: Industry::Technology,
        };
        assert!(classifier.unsuitability(&verdict).is_none());

        verdict.industry = Industry::Staffing;
        assert!(classifier.unsuitability(&verdict).is_some());

        verdict.industry = Industry::Technology;
        verdict.is_software_job = false;
        assert!(classifier.unsuitability(&verdict).is_some());
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        let text = "añb".repeat(10);
        let truncated = truncate_content(&text, 5);
        assert!(truncated.len() <= 5);
        assert!(text.starts_with(truncated));
    }
}
