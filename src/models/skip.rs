//! Skip reasons produced by the pre-check and post-classification filters.

use std::fmt;

/// Why a candidate posting was not surfaced as actionable.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Posted-time text exceeded the staleness threshold.
    Stale { posted: String },
    /// In-platform simplified apply flow, excluded by policy.
    DirectApply,
    /// Already persisted by URL or (company, title).
    Duplicate,
    IgnoredKeyword { keyword: String },
    IgnoredDomain { domain: String },
    SalaryBelowFloor { normalized_annual: f64 },
    NonUsa { location: String },
    /// Detail text below the minimum-content threshold; treated as an
    /// unsolved interstitial rather than a real posting.
    LowContent,
    BotChallenge,
    Expired,
    /// Classifier judged the posting unsuitable (non-software category or a
    /// blocked industry).
    Unsuitable { detail: String },
}

impl SkipReason {
    /// Short machine-facing label for logs and notifications.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stale { .. } => "stale",
            Self::DirectApply => "direct_apply",
            Self::Duplicate => "duplicate",
            Self::IgnoredKeyword { .. } => "ignored_keyword",
            Self::IgnoredDomain { .. } => "ignored_domain",
            Self::SalaryBelowFloor { .. } => "salary_below_floor",
            Self::NonUsa { .. } => "non_usa",
            Self::LowContent => "low_content",
            Self::BotChallenge => "bot_challenge",
            Self::Expired => "expired",
            Self::Unsuitable { .. } => "unsuitable",
        }
    }

    /// Whether the posting should still be persisted and auto-marked as
    /// applied by "Bot". Feed-style platforms regenerate dismissed cards, so
    /// recording these skips is the only way to keep them from being
    /// re-processed every cycle.
    pub fn record_and_suppress(&self) -> bool {
        matches!(
            self,
            Self::IgnoredKeyword { .. } | Self::IgnoredDomain { .. } | Self::Unsuitable { .. }
        )
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stale { posted } => write!(f, "stale ({posted})"),
            Self::DirectApply => write!(f, "direct-apply variant"),
            Self::Duplicate => write!(f, "duplicate"),
            Self::IgnoredKeyword { keyword } => write!(f, "ignored keyword \"{keyword}\""),
            Self::IgnoredDomain { domain } => write!(f, "ignored domain \"{domain}\""),
            Self::SalaryBelowFloor { normalized_annual } => {
                write!(f, "salary below floor (~${normalized_annual:.0}/yr)")
            }
            Self::NonUsa { location } => write!(f, "outside USA ({location})"),
            Self::LowContent => write!(f, "page content too short"),
            Self::BotChallenge => write!(f, "bot challenge"),
            Self::Expired => write!(f, "posting expired"),
            Self::Unsuitable { detail } => write!(f, "unsuitable ({detail})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suppression_policy_covers_exactly_three_reasons() {
        assert!(SkipReason::IgnoredKeyword {
            keyword: "senior".into()
        }
        .record_and_suppress());
        assert!(SkipReason::IgnoredDomain {
            domain: "lensa.com".into()
        }
        .record_and_suppress());
        assert!(SkipReason::Unsuitable {
            detail: "staffing".into()
        }
        .record_and_suppress());

        assert!(!SkipReason::Duplicate.record_and_suppress());
        assert!(!SkipReason::Stale {
            posted: "3 weeks ago".into()
        }
        .record_and_suppress());
        assert!(!SkipReason::LowContent.record_and_suppress());
    }
}
