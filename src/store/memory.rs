//! In-memory `JobStore` used by the CLI runner and tests.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::{BugReport, CookieRecord, CookieSet, ErrorCategory, JobPosting, Platform};

use super::JobStore;

#[derive(Default)]
struct Inner {
    postings: Vec<JobPosting>,
    next_posting_id: i64,
    settings: HashMap<String, String>,
    cookie_sets: HashMap<Platform, Vec<CookieSet>>,
    cookie_cursor: HashMap<Platform, usize>,
    next_cookie_id: i64,
    bug_keys: HashSet<(Platform, ErrorCategory, String)>,
    bugs: Vec<BugReport>,
}

/// Process-local store. Everything is lost on exit; persistence across runs
/// is the desktop shell's job, not this crate's.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All postings, insertion-ordered. Test/CLI helper, not part of the
    /// store contract.
    pub async fn all_postings(&self) -> Vec<JobPosting> {
        self.inner.read().await.postings.clone()
    }

    /// All bug reports recorded so far.
    pub async fn bug_reports(&self) -> Vec<BugReport> {
        self.inner.read().await.bugs.clone()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn add_posting(&self, posting: &JobPosting) -> Result<bool> {
        let mut inner = self.inner.write().await;
        // Empty URLs never match each other; some suppressed postings have
        // no resolvable URL and must still be distinct records.
        let exists = inner.postings.iter().any(|p| {
            (!posting.url.is_empty() && p.url == posting.url)
                || (p.company == posting.company && p.title == posting.title)
        });
        if exists {
            return Ok(false);
        }
        inner.next_posting_id += 1;
        let mut stored = posting.clone();
        stored.id = inner.next_posting_id;
        inner.postings.push(stored);
        Ok(true)
    }

    async fn is_duplicate(&self, company: &str, title: &str, url: &str) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner.postings.iter().any(|p| {
            (!url.is_empty() && p.url == url) || (p.company == company && p.title == title)
        }))
    }

    async fn postings_today(&self) -> Result<Vec<JobPosting>> {
        let today = Utc::now().date_naive();
        let inner = self.inner.read().await;
        Ok(inner
            .postings
            .iter()
            .filter(|p| p.discovered_at.date_naive() == today)
            .cloned()
            .collect())
    }

    async fn update_applied_status(&self, id: i64, applied: bool, by: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some(posting) = inner.postings.iter_mut().find(|p| p.id == id) {
            posting.applied = applied;
            posting.applied_by = applied.then(|| by.to_string());
        }
        Ok(())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.read().await.settings.get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.inner
            .write()
            .await
            .settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_all_settings(&self) -> Result<HashMap<String, String>> {
        Ok(self.inner.read().await.settings.clone())
    }

    async fn add_cookie_set(&self, set: CookieSet) -> Result<i64> {
        let mut inner = self.inner.write().await;
        inner.next_cookie_id += 1;
        let id = inner.next_cookie_id;
        let mut stored = set;
        stored.id = id;
        inner.cookie_sets.entry(stored.platform).or_default().push(stored);
        Ok(id)
    }

    async fn get_cookie_sets(&self, platform: Platform) -> Result<Vec<CookieSet>> {
        let inner = self.inner.read().await;
        Ok(inner.cookie_sets.get(&platform).cloned().unwrap_or_default())
    }

    async fn rotate_cookie_set(&self, platform: Platform) -> Result<Option<CookieSet>> {
        let mut inner = self.inner.write().await;
        let len = inner.cookie_sets.get(&platform).map_or(0, Vec::len);
        if len < 2 {
            return Ok(None);
        }
        let cursor = inner.cookie_cursor.entry(platform).or_insert(0);
        *cursor = (*cursor + 1) % len;
        let idx = *cursor;
        Ok(inner.cookie_sets.get(&platform).map(|sets| sets[idx].clone()))
    }

    async fn get_active_cookie_set(&self, platform: Platform) -> Result<Option<CookieSet>> {
        let inner = self.inner.read().await;
        let sets = match inner.cookie_sets.get(&platform) {
            Some(sets) if !sets.is_empty() => sets,
            _ => return Ok(None),
        };
        let cursor = inner.cookie_cursor.get(&platform).copied().unwrap_or(0);
        Ok(Some(sets[cursor % sets.len()].clone()))
    }

    async fn mark_cookie_set_used(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.write().await;
        for sets in inner.cookie_sets.values_mut() {
            if let Some(set) = sets.iter_mut().find(|s| s.id == id) {
                set.last_used = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn get_cookies(&self, platform: Platform) -> Result<Vec<CookieRecord>> {
        Ok(self
            .get_active_cookie_set(platform)
            .await?
            .map(|set| set.records)
            .unwrap_or_default())
    }

    async fn report_bug(&self, report: BugReport) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if !inner.bug_keys.insert(report.dedup_key()) {
            return Ok(false);
        }
        inner.bugs.push(report);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CookieRecord, ErrorCategory};

    fn posting(company: &str, title: &str, url: &str) -> JobPosting {
        JobPosting::new(Platform::Indeed, company.into(), title.into(), url.into())
    }

    fn set(platform: Platform, label: &str) -> CookieSet {
        CookieSet::new(
            platform,
            label.into(),
            vec![CookieRecord {
                name: "sid".into(),
                value: label.into(),
                domain: None,
                path: None,
                expires_at: None,
                secure: false,
                http_only: false,
            }],
        )
    }

    #[tokio::test]
    async fn test_add_posting_idempotent_on_url() {
        let store = MemoryStore::new();
        assert!(store
            .add_posting(&posting("Acme", "Engineer", "https://a.com/1"))
            .await
            .unwrap());
        // Same URL, different title: still a duplicate.
        assert!(!store
            .add_posting(&posting("Acme", "Sr Engineer", "https://a.com/1"))
            .await
            .unwrap());
        assert_eq!(store.all_postings().await.len(), 1);
    }

    #[tokio::test]
    async fn test_add_posting_idempotent_on_company_title() {
        let store = MemoryStore::new();
        assert!(store
            .add_posting(&posting("Acme", "Engineer", "https://a.com/1"))
            .await
            .unwrap());
        // Same (company, title), different URL: also a duplicate.
        assert!(!store
            .add_posting(&posting("Acme", "Engineer", "https://a.com/2"))
            .await
            .unwrap());
        assert_eq!(store.all_postings().await.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_urls_do_not_collide() {
        let store = MemoryStore::new();
        assert!(store.add_posting(&posting("Acme", "Engineer", "")).await.unwrap());
        assert!(store.add_posting(&posting("Globex", "Analyst", "")).await.unwrap());
        assert_eq!(store.all_postings().await.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_check_is_case_sensitive() {
        let store = MemoryStore::new();
        store
            .add_posting(&posting("Acme", "Engineer", "https://a.com/1"))
            .await
            .unwrap();
        assert!(store
            .is_duplicate("Acme", "Engineer", "https://other.com")
            .await
            .unwrap());
        assert!(!store
            .is_duplicate("acme", "engineer", "https://other.com")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_update_applied_status() {
        let store = MemoryStore::new();
        store
            .add_posting(&posting("Acme", "Engineer", "https://a.com/1"))
            .await
            .unwrap();
        let id = store.all_postings().await[0].id;
        store.update_applied_status(id, true, "Bot").await.unwrap();
        let stored = &store.all_postings().await[0];
        assert!(stored.applied);
        assert_eq!(stored.applied_by.as_deref(), Some("Bot"));
    }

    #[tokio::test]
    async fn test_rotation_needs_two_sets() {
        let store = MemoryStore::new();
        assert!(store
            .rotate_cookie_set(Platform::LinkedIn)
            .await
            .unwrap()
            .is_none());

        store
            .add_cookie_set(set(Platform::LinkedIn, "only"))
            .await
            .unwrap();
        assert!(store
            .rotate_cookie_set(Platform::LinkedIn)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_rotation_advances_and_wraps() {
        let store = MemoryStore::new();
        for label in ["a", "b", "c"] {
            store
                .add_cookie_set(set(Platform::LinkedIn, label))
                .await
                .unwrap();
        }

        let active = store
            .get_active_cookie_set(Platform::LinkedIn)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.label, "a");

        let mut labels = Vec::new();
        for _ in 0..3 {
            let rotated = store
                .rotate_cookie_set(Platform::LinkedIn)
                .await
                .unwrap()
                .unwrap();
            labels.push(rotated.label);
        }
        assert_eq!(labels, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_mark_cookie_set_used() {
        let store = MemoryStore::new();
        let id = store
            .add_cookie_set(set(Platform::Dice, "main"))
            .await
            .unwrap();
        store.mark_cookie_set_used(id).await.unwrap();
        let sets = store.get_cookie_sets(Platform::Dice).await.unwrap();
        assert!(sets[0].last_used.is_some());
    }

    #[tokio::test]
    async fn test_bug_report_dedup() {
        let store = MemoryStore::new();
        let report = BugReport::new(Platform::Indeed, ErrorCategory::Navigation, "timeout");
        assert!(store.report_bug(report.clone()).await.unwrap());
        assert!(!store.report_bug(report).await.unwrap());
        assert_eq!(store.bug_reports().await.len(), 1);
    }
}
