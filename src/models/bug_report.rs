//! Bug reports emitted by drivers on unrecoverable per-job failures.
//!
//! The store dedupes on (platform, error_type, message) so a selector that
//! breaks on every card produces one report, not hundreds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Platform;

/// Failure taxonomy for reporting and triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Navigation timeout or unreachable page.
    Navigation,
    /// Expected element or text missing from a page.
    Extraction,
    /// Bot challenge that evasion could not clear.
    Challenge,
    /// Classifier backend unavailable or returned garbage.
    Classifier,
    /// Browser launch or session-level failure.
    Session,
    /// Anything else caught at the driver's top level.
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigation => "navigation",
            Self::Extraction => "extraction",
            Self::Challenge => "challenge",
            Self::Classifier => "classifier",
            Self::Session => "session",
            Self::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugReport {
    pub platform: Platform,
    pub error_type: ErrorCategory,
    pub message: String,
    pub stack: Option<String>,
    pub url: Option<String>,
    pub job_title: Option<String>,
    pub job_company: Option<String>,
    pub reported_at: DateTime<Utc>,
}

impl BugReport {
    pub fn new(platform: Platform, error_type: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            platform,
            error_type,
            message: message.into(),
            stack: None,
            url: None,
            job_title: None,
            job_company: None,
            reported_at: Utc::now(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_job(mut self, company: impl Into<String>, title: impl Into<String>) -> Self {
        self.job_company = Some(company.into());
        self.job_title = Some(title.into());
        self
    }

    /// Key the store dedupes on.
    pub fn dedup_key(&self) -> (Platform, ErrorCategory, String) {
        (self.platform, self.error_type, self.message.clone())
    }
}
