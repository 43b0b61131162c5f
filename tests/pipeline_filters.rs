//! Per-card pipeline behavior without a browser.
//!
//! `process_card` takes the detail-resolution step as a closure, so these
//! tests drive the real pre-check, classification, and persistence path
//! with a scripted resolver and a counting classifier backend.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use jobscout::classifier::{Classifier, ClassifierError, ClassifierSettings, ClassifyBackend};
use jobscout::config::BrowserSettings;
use jobscout::models::{FilterSettings, JobPosting, Platform, SkipReason};
use jobscout::notify::LogSink;
use jobscout::scrapers::{process_card, CardOutcome, JobCard, ResolvedDetail, ScrapeContext, StopFlag};
use jobscout::store::{JobStore, MemoryStore};

/// Backend that counts invocations and always fails, forcing the
/// classifier's conservative fallback.
#[derive(Default)]
struct CountingBackend {
    calls: AtomicU32,
}

#[async_trait]
impl ClassifyBackend for CountingBackend {
    async fn complete(&self, _prompt: &str) -> Result<String, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ClassifierError::Connection("scripted outage".into()))
    }
}

fn test_context(store: Arc<MemoryStore>, backend: Arc<CountingBackend>) -> ScrapeContext {
    ScrapeContext {
        store,
        classifier: Arc::new(Classifier::new(backend, ClassifierSettings::default())),
        notify: Arc::new(LogSink),
        browser: BrowserSettings::default(),
        stop: StopFlag::new(),
    }
}

fn card(company: &str, title: &str) -> JobCard {
    JobCard {
        company: company.to_string(),
        title: title.to_string(),
        url: Some("https://www.indeed.com/rc/clk?jk=test1".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_stale_card_skips_without_resolving_or_classifying() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(CountingBackend::default());
    let ctx = test_context(store.clone(), backend.clone());
    let filters = FilterSettings::default();

    let mut stale_card = card("Acme", "Backend Engineer");
    stale_card.posted_text = Some("10 days ago".to_string());

    let resolver_called = Arc::new(AtomicBool::new(false));
    let flag = resolver_called.clone();
    let outcome = process_card(&ctx, &filters, Platform::Indeed, &stale_card, move || {
        flag.store(true, Ordering::SeqCst);
        async { Err(anyhow::anyhow!("resolver must not run")) }
    })
    .await;

    match outcome {
        CardOutcome::Skipped(SkipReason::Stale { posted }) => {
            assert_eq!(posted, "10 days ago");
        }
        other => panic!("expected a staleness skip, got {other:?}"),
    }
    assert!(
        !resolver_called.load(Ordering::SeqCst),
        "stale cards must never open a detail page"
    );
    assert_eq!(
        backend.calls.load(Ordering::SeqCst),
        0,
        "stale cards must never reach the classifier"
    );
    assert!(
        store.all_postings().await.is_empty(),
        "staleness is not a suppression reason"
    );
}

#[tokio::test]
async fn test_keyword_skip_persists_suppressed_posting() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(CountingBackend::default());
    let ctx = test_context(store.clone(), backend.clone());

    let mut filters = FilterSettings::default();
    filters.ignore_keywords = vec!["crypto".to_string()];

    let blocked = card("ChainWorks", "Senior Crypto Engineer");
    let outcome = process_card(&ctx, &filters, Platform::Indeed, &blocked, || async {
        Err(anyhow::anyhow!("resolver must not run"))
    })
    .await;

    assert!(matches!(
        outcome,
        CardOutcome::Skipped(SkipReason::IgnoredKeyword { .. })
    ));

    let postings = store.all_postings().await;
    assert_eq!(postings.len(), 1, "suppression-class skips are persisted");
    let posting = &postings[0];
    assert!(posting.applied);
    assert_eq!(posting.applied_by.as_deref(), Some("Bot"));
    assert!(
        posting
            .note
            .as_deref()
            .is_some_and(|note| note.starts_with("Auto-suppressed")),
        "suppressed postings carry the synthetic note"
    );
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_duplicate_card_is_skipped_and_insert_stays_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(CountingBackend::default());
    let ctx = test_context(store.clone(), backend.clone());
    let filters = FilterSettings::default();

    let existing = JobPosting::new(
        Platform::Indeed,
        "Acme".to_string(),
        "Backend Engineer".to_string(),
        "https://careers.acme.dev/jobs/1".to_string(),
    );
    assert!(store.add_posting(&existing).await.unwrap());
    assert!(
        !store.add_posting(&existing).await.unwrap(),
        "second insert of the same posting must report not-inserted"
    );

    let resolver_called = Arc::new(AtomicBool::new(false));
    let flag = resolver_called.clone();
    let outcome = process_card(
        &ctx,
        &filters,
        Platform::Indeed,
        &card("Acme", "Backend Engineer"),
        move || {
            flag.store(true, Ordering::SeqCst);
            async { Err(anyhow::anyhow!("resolver must not run")) }
        },
    )
    .await;

    assert!(matches!(
        outcome,
        CardOutcome::Skipped(SkipReason::Duplicate)
    ));
    assert!(!resolver_called.load(Ordering::SeqCst));
    assert_eq!(store.all_postings().await.len(), 1);
}

#[tokio::test]
async fn test_backend_outage_falls_back_to_card_data() {
    let store = Arc::new(MemoryStore::new());
    let backend = Arc::new(CountingBackend::default());
    let ctx = test_context(store.clone(), backend.clone());
    let filters = FilterSettings::default();

    let fresh = card("Acme", "Backend Engineer");
    let page_text = "We are hiring a backend engineer to build our API platform. ".repeat(20);
    let outcome = process_card(&ctx, &filters, Platform::Indeed, &fresh, move || async move {
        Ok(ResolvedDetail {
            final_url: "https://careers.acme.dev/jobs/42".to_string(),
            page_text,
            expired: false,
        })
    })
    .await;

    assert!(matches!(outcome, CardOutcome::Persisted));
    assert_eq!(
        backend.calls.load(Ordering::SeqCst),
        1,
        "long page text should reach the backend exactly once"
    );

    let postings = store.all_postings().await;
    assert_eq!(postings.len(), 1);
    let posting = &postings[0];
    assert_eq!(posting.company, "Acme");
    assert_eq!(posting.url, "https://careers.acme.dev/jobs/42");
    assert!(
        posting.remote,
        "without a verdict the remote search context is trusted"
    );
    assert!(!posting.applied);
}
