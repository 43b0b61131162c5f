//! Persistence contract consumed by the scraping engine.
//!
//! Real storage belongs to the desktop shell and is reached only through
//! the `JobStore` trait; nothing in the engine assumes a concrete backend.
//! `MemoryStore` is the in-process reference implementation used by the CLI
//! and the test suite.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    BugReport, CookieRecord, CookieSet, FilterSettings, JobPosting, Platform, SalaryFloor,
};

mod memory;

pub use memory::MemoryStore;

/// Recognized settings keys. List-valued settings are stored as JSON arrays
/// in the value string.
pub mod keys {
    pub const ENABLED_PLATFORMS: &str = "enabled_platforms";
    pub const IGNORE_KEYWORDS: &str = "ignore_keywords";
    pub const IGNORE_DOMAINS: &str = "ignore_domains";
    pub const MIN_SALARY_ANNUAL: &str = "min_salary_annual";
    pub const MIN_SALARY_MONTHLY: &str = "min_salary_monthly";
    pub const MIN_SALARY_HOURLY: &str = "min_salary_hourly";
    pub const STALE_AFTER_DAYS: &str = "stale_after_days";
}

/// External persistence surface.
///
/// `add_posting` is idempotent on the application URL and on the
/// (company, title) pair; a duplicate insert returns `false` and changes
/// nothing. Cookie-set rotation advances a per-platform cursor and returns
/// the next set, or `None` when fewer than two sets exist.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn add_posting(&self, posting: &JobPosting) -> Result<bool>;
    async fn is_duplicate(&self, company: &str, title: &str, url: &str) -> Result<bool>;
    /// Postings discovered today, for count notifications.
    async fn postings_today(&self) -> Result<Vec<JobPosting>>;
    async fn update_applied_status(&self, id: i64, applied: bool, by: &str) -> Result<()>;

    async fn get_setting(&self, key: &str) -> Result<Option<String>>;
    async fn set_setting(&self, key: &str, value: &str) -> Result<()>;
    async fn get_all_settings(&self) -> Result<HashMap<String, String>>;

    async fn add_cookie_set(&self, set: CookieSet) -> Result<i64>;
    async fn get_cookie_sets(&self, platform: Platform) -> Result<Vec<CookieSet>>;
    async fn rotate_cookie_set(&self, platform: Platform) -> Result<Option<CookieSet>>;
    async fn get_active_cookie_set(&self, platform: Platform) -> Result<Option<CookieSet>>;
    async fn mark_cookie_set_used(&self, id: i64) -> Result<()>;
    /// Legacy fallback: the active set's raw records, or empty when the
    /// platform has no sets at all.
    async fn get_cookies(&self, platform: Platform) -> Result<Vec<CookieRecord>>;

    /// Returns `false` when an identical (platform, error_type, message)
    /// report already exists.
    async fn report_bug(&self, report: BugReport) -> Result<bool>;
}

/// Assemble the per-run filter snapshot from the settings store.
///
/// Missing or unparseable entries fall back to defaults; a malformed list
/// never aborts a run.
pub async fn load_filter_settings(store: &dyn JobStore) -> Result<FilterSettings> {
    let settings = store.get_all_settings().await?;
    let mut out = FilterSettings::default();

    if let Some(raw) = settings.get(keys::IGNORE_KEYWORDS) {
        out.ignore_keywords = parse_string_list(raw);
    }
    if let Some(raw) = settings.get(keys::IGNORE_DOMAINS) {
        out.ignore_domains = parse_string_list(raw);
    }
    if let Some(raw) = settings.get(keys::ENABLED_PLATFORMS) {
        let names = parse_string_list(raw);
        let platforms: Vec<Platform> = names
            .iter()
            .filter_map(|name| Platform::from_str(name))
            .collect();
        if !platforms.is_empty() {
            out.enabled_platforms = platforms;
        }
    }
    if let Some(raw) = settings.get(keys::STALE_AFTER_DAYS) {
        if let Ok(days) = raw.trim().parse::<u32>() {
            out.stale_after_days = days;
        }
    }

    out.salary_floor = SalaryFloor {
        annual: parse_numeric(settings.get(keys::MIN_SALARY_ANNUAL)),
        monthly: parse_numeric(settings.get(keys::MIN_SALARY_MONTHLY)),
        hourly: parse_numeric(settings.get(keys::MIN_SALARY_HOURLY)),
    };

    Ok(out)
}

fn parse_string_list(raw: &str) -> Vec<String> {
    if let Ok(list) = serde_json::from_str::<Vec<String>>(raw) {
        return list;
    }
    // Tolerate plain comma-separated values from hand-edited settings.
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_numeric(raw: Option<&String>) -> Option<f64> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    raw.replace([',', '$'], "").parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_filter_settings_from_store() {
        let store = MemoryStore::new();
        store
            .set_setting(keys::IGNORE_KEYWORDS, r#"["senior staff","clearance"]"#)
            .await
            .unwrap();
        store
            .set_setting(keys::MIN_SALARY_ANNUAL, "150000")
            .await
            .unwrap();
        store
            .set_setting(keys::ENABLED_PLATFORMS, r#"["dice","indeed"]"#)
            .await
            .unwrap();

        let settings = load_filter_settings(&store).await.unwrap();
        assert_eq!(settings.ignore_keywords.len(), 2);
        assert_eq!(settings.salary_floor.annual, Some(150_000.0));
        assert_eq!(
            settings.enabled_platforms,
            vec![Platform::Dice, Platform::Indeed]
        );
        assert_eq!(settings.stale_after_days, 7);
    }

    #[tokio::test]
    async fn test_load_filter_settings_tolerates_garbage() {
        let store = MemoryStore::new();
        store
            .set_setting(keys::IGNORE_DOMAINS, "lensa.com, jobs2careers.com")
            .await
            .unwrap();
        store
            .set_setting(keys::MIN_SALARY_HOURLY, "not a number")
            .await
            .unwrap();
        store
            .set_setting(keys::STALE_AFTER_DAYS, "???")
            .await
            .unwrap();

        let settings = load_filter_settings(&store).await.unwrap();
        assert_eq!(
            settings.ignore_domains,
            vec!["lensa.com".to_string(), "jobs2careers.com".to_string()]
        );
        assert!(settings.salary_floor.is_unset());
        assert_eq!(settings.stale_after_days, 7);
    }
}
