//! Data models for JobScout.

mod bug_report;
mod cookie_set;
mod posting;
mod settings;
mod skip;

pub use bug_report::{BugReport, ErrorCategory};
pub use cookie_set::{CookieRecord, CookieSet};
pub use posting::{JobPosting, Platform};
pub use settings::{FilterSettings, SalaryFloor};
pub use skip::SkipReason;
