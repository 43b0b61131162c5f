//! Shared assembly for CLI commands: context construction, store seeding,
//! cookie-file parsing, and the tallying notification sink.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::classifier::{Classifier, HttpBackend};
use crate::config::JobScoutConfig;
use crate::models::{CookieRecord, CookieSet, Platform, SkipReason};
use crate::notify::{ConsoleSink, NotificationSink};
use crate::scrapers::{ScrapeContext, StopFlag};
use crate::store::{keys, JobStore, MemoryStore};

/// Sink that delegates display to [`ConsoleSink`] while tallying outcomes
/// for an end-of-run summary.
#[derive(Default)]
pub struct TallySink {
    inner: ConsoleSink,
    new_jobs: AtomicU32,
    skips: Mutex<HashMap<&'static str, u32>>,
}

impl TallySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_jobs(&self) -> u32 {
        self.new_jobs.load(Ordering::Relaxed)
    }

    /// Skip counts by reason label, largest first.
    pub fn skip_summary(&self) -> Vec<(&'static str, u32)> {
        let mut entries: Vec<(&'static str, u32)> = self
            .skips
            .lock()
            .map(|map| map.iter().map(|(k, v)| (*k, *v)).collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        entries
    }
}

impl NotificationSink for TallySink {
    fn on_new_job(&self, company: &str, title: &str, platform: Platform) {
        self.new_jobs.fetch_add(1, Ordering::Relaxed);
        self.inner.on_new_job(company, title, platform);
    }

    fn on_job_skipped(&self, company: &str, title: &str, platform: Platform, reason: &SkipReason) {
        if let Ok(mut map) = self.skips.lock() {
            *map.entry(reason.label()).or_insert(0) += 1;
        }
        self.inner.on_job_skipped(company, title, platform, reason);
    }

    fn on_status_update(&self, platform: Platform, step: &str, detail: &str) {
        self.inner.on_status_update(platform, step, detail);
    }

    fn on_scraper_error(&self, platform: Platform, message: &str) {
        self.inner.on_scraper_error(platform, message);
    }

    fn on_scraper_warning(&self, platform: Platform, message: &str) {
        self.inner.on_scraper_warning(platform, message);
    }
}

/// Build the shared context every driver receives: an in-process store
/// seeded from the config file, the rate-limited classifier, and the given
/// sink.
pub async fn build_context(
    config: &JobScoutConfig,
    notify: Arc<dyn NotificationSink>,
) -> Result<ScrapeContext> {
    let store: Arc<dyn JobStore> = Arc::new(MemoryStore::new());
    seed_store(config, store.as_ref()).await?;

    let backend = Arc::new(HttpBackend::new(
        config.classifier.endpoint.clone(),
        config.classifier.model.clone(),
        config.classifier.timeout_secs,
    ));
    let classifier = Arc::new(Classifier::new(backend, config.classifier.to_settings()));

    Ok(ScrapeContext {
        store,
        classifier,
        notify,
        browser: config.browser.clone(),
        stop: StopFlag::new(),
    })
}

/// Seed settings keys and cookie sets from the config file. Drivers read
/// them back through the store contract, never from the config struct.
pub async fn seed_store(config: &JobScoutConfig, store: &dyn JobStore) -> Result<()> {
    let filters = &config.filters;

    if let Some(value) = filters.min_salary_annual {
        store
            .set_setting(keys::MIN_SALARY_ANNUAL, &value.to_string())
            .await?;
    }
    if let Some(value) = filters.min_salary_monthly {
        store
            .set_setting(keys::MIN_SALARY_MONTHLY, &value.to_string())
            .await?;
    }
    if let Some(value) = filters.min_salary_hourly {
        store
            .set_setting(keys::MIN_SALARY_HOURLY, &value.to_string())
            .await?;
    }
    if !filters.ignore_keywords.is_empty() {
        store
            .set_setting(
                keys::IGNORE_KEYWORDS,
                &serde_json::to_string(&filters.ignore_keywords)?,
            )
            .await?;
    }
    if !filters.ignore_domains.is_empty() {
        store
            .set_setting(
                keys::IGNORE_DOMAINS,
                &serde_json::to_string(&filters.ignore_domains)?,
            )
            .await?;
    }
    store
        .set_setting(keys::STALE_AFTER_DAYS, &filters.stale_after_days.to_string())
        .await?;

    let enabled: Vec<&str> = config
        .enabled_platforms()
        .iter()
        .map(|p| p.as_str())
        .collect();
    store
        .set_setting(keys::ENABLED_PLATFORMS, &serde_json::to_string(&enabled)?)
        .await?;

    for platform in Platform::ALL {
        let section = config.platform(platform);
        for (index, file) in section.cookie_files.iter().enumerate() {
            match load_cookie_file(file) {
                Ok(records) => {
                    let label = file
                        .file_stem()
                        .map(|stem| stem.to_string_lossy().into_owned())
                        .unwrap_or_else(|| format!("set-{index}"));
                    store
                        .add_cookie_set(CookieSet::new(platform, label, records))
                        .await?;
                }
                Err(e) => {
                    warn!(
                        platform = platform.as_str(),
                        file = %file.display(),
                        "Skipping cookie file: {e:#}"
                    );
                }
            }
        }
    }

    Ok(())
}

/// Read a cookie-set JSON file.
pub fn load_cookie_file(path: &Path) -> Result<Vec<CookieRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read cookie file: {}", path.display()))?;
    parse_cookie_json(&content)
        .with_context(|| format!("Failed to parse cookie file: {}", path.display()))
}

/// Accepts either a bare JSON array of cookies or the browser-extension
/// export wrapper `{"cookies": [...]}`.
pub fn parse_cookie_json(content: &str) -> Result<Vec<CookieRecord>> {
    if let Ok(records) = serde_json::from_str::<Vec<CookieRecord>>(content) {
        return Ok(records);
    }

    #[derive(Deserialize)]
    struct ExportWrapper {
        cookies: Vec<CookieRecord>,
    }

    let wrapper: ExportWrapper = serde_json::from_str(content)
        .context("expected a JSON array of cookies or an export with a \"cookies\" key")?;
    Ok(wrapper.cookies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;
    use crate::notify::NotificationSink;

    #[test]
    fn test_parse_cookie_json_accepts_both_shapes() {
        let bare = r#"[{"name": "li_at", "value": "abc"}]"#;
        assert_eq!(parse_cookie_json(bare).unwrap().len(), 1);

        let wrapped = r#"{"cookies": [{"name": "a", "value": "1"}, {"name": "b", "value": "2"}]}"#;
        assert_eq!(parse_cookie_json(wrapped).unwrap().len(), 2);

        assert!(parse_cookie_json("{\"sessions\": []}").is_err());
    }

    #[test]
    fn test_tally_sink_counts_by_reason() {
        let stale = SkipReason::Stale {
            posted: "3 weeks ago".into(),
        };
        let sink = TallySink::new();
        sink.on_new_job("Acme", "Engineer", Platform::Indeed);
        sink.on_job_skipped("A", "B", Platform::Indeed, &stale);
        sink.on_job_skipped("C", "D", Platform::Indeed, &stale);
        sink.on_job_skipped("E", "F", Platform::Indeed, &SkipReason::Duplicate);

        assert_eq!(sink.new_jobs(), 1);
        let summary = sink.skip_summary();
        assert_eq!(summary[0], (stale.label(), 2));
        assert_eq!(summary[1], (SkipReason::Duplicate.label(), 1));
    }

    #[tokio::test]
    async fn test_seed_store_writes_settings() {
        let mut config = JobScoutConfig::default();
        config.filters.min_salary_annual = Some(120_000.0);
        config.filters.ignore_keywords = vec!["clearance".to_string()];

        let store = MemoryStore::new();
        seed_store(&config, &store).await.unwrap();

        let filters = crate::store::load_filter_settings(&store).await.unwrap();
        assert_eq!(filters.salary_floor.annual, Some(120_000.0));
        assert_eq!(filters.ignore_keywords, vec!["clearance".to_string()]);
        assert_eq!(filters.enabled_platforms.len(), Platform::ALL.len());
    }
}
