//! Job posting model and the platform enumeration.
//!
//! Postings are uniquely identified by their application URL and by the
//! (company, title) pair; the store enforces both, so inserting the same
//! posting twice is a detectable no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A job board this system knows how to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    LinkedIn,
    Indeed,
    Glassdoor,
    ZipRecruiter,
    Dice,
}

impl Platform {
    /// All known platforms in default scheduling order.
    pub const ALL: [Platform; 5] = [
        Platform::LinkedIn,
        Platform::Indeed,
        Platform::Glassdoor,
        Platform::ZipRecruiter,
        Platform::Dice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LinkedIn => "linkedin",
            Self::Indeed => "indeed",
            Self::Glassdoor => "glassdoor",
            Self::ZipRecruiter => "ziprecruiter",
            Self::Dice => "dice",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "linkedin" => Some(Self::LinkedIn),
            "indeed" => Some(Self::Indeed),
            "glassdoor" => Some(Self::Glassdoor),
            "ziprecruiter" => Some(Self::ZipRecruiter),
            "dice" => Some(Self::Dice),
            _ => None,
        }
    }

    /// Human-facing name for notifications and CLI output.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::LinkedIn => "LinkedIn",
            Self::Indeed => "Indeed",
            Self::Glassdoor => "Glassdoor",
            Self::ZipRecruiter => "ZipRecruiter",
            Self::Dice => "Dice",
        }
    }

    /// Base domain used to default cookie domains and detect on-platform URLs.
    pub fn base_domain(&self) -> &'static str {
        match self {
            Self::LinkedIn => "linkedin.com",
            Self::Indeed => "indeed.com",
            Self::Glassdoor => "glassdoor.com",
            Self::ZipRecruiter => "ziprecruiter.com",
            Self::Dice => "dice.com",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::from_str(s).ok_or_else(|| format!("unknown platform: {s}"))
    }
}

/// A discovered job posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    /// Store row ID.
    pub id: i64,
    pub company: String,
    pub title: String,
    /// Canonical application URL (the real external apply target, not the
    /// board's listing URL, whenever the driver could resolve one).
    pub url: String,
    pub platform: Platform,
    pub discovered_at: DateTime<Utc>,
    /// Free-text salary as shown on the posting, if any.
    pub salary: Option<String>,
    /// Ordered technology tags from classification.
    pub tech_stack: Vec<String>,
    pub location: Option<String>,
    pub remote: bool,
    pub startup: bool,
    pub applied: bool,
    /// Who marked the posting applied ("Bot" for automated suppression).
    pub applied_by: Option<String>,
    /// Synthetic annotation attached when a filtered posting is recorded
    /// anyway to keep it from resurfacing in a self-regenerating feed.
    pub note: Option<String>,
}

impl JobPosting {
    pub fn new(platform: Platform, company: String, title: String, url: String) -> Self {
        Self {
            id: 0, // Set by store
            company,
            title,
            url,
            platform,
            discovered_at: Utc::now(),
            salary: None,
            tech_stack: Vec::new(),
            location: None,
            remote: false,
            startup: false,
            applied: false,
            applied_by: None,
            note: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_round_trip() {
        for platform in Platform::ALL {
            assert_eq!(Platform::from_str(platform.as_str()), Some(platform));
        }
        assert_eq!(Platform::from_str("LinkedIn"), Some(Platform::LinkedIn));
        assert_eq!(Platform::from_str("myspace"), None);
    }

    #[test]
    fn test_platform_parse_for_cli() {
        let parsed: Platform = "dice".parse().unwrap();
        assert_eq!(parsed, Platform::Dice);
        assert!("unknown".parse::<Platform>().is_err());
    }

    #[test]
    fn test_new_posting_defaults() {
        let posting = JobPosting::new(
            Platform::Indeed,
            "Acme".into(),
            "Backend Engineer".into(),
            "https://jobs.acme.com/123".into(),
        );
        assert_eq!(posting.id, 0);
        assert!(!posting.applied);
        assert!(posting.applied_by.is_none());
        assert!(posting.tech_stack.is_empty());
    }
}
