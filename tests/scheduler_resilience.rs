//! Scheduler fault tolerance and shutdown latency.
//!
//! Exercises the manager with scripted drivers instead of real browser
//! sessions: one driver that always fails must not knock its neighbors out
//! of the rotation, and a stop request must end the run promptly even with
//! long cooldowns configured.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use jobscout::classifier::{Classifier, ClassifierError, ClassifierSettings, ClassifyBackend};
use jobscout::config::{BrowserSettings, ScheduleSettings};
use jobscout::manager::ScraperManager;
use jobscout::models::{ErrorCategory, Platform};
use jobscout::notify::LogSink;
use jobscout::scrapers::{PlatformDriver, ScrapeContext, StopFlag};
use jobscout::store::MemoryStore;

struct NoBackend;

#[async_trait]
impl ClassifyBackend for NoBackend {
    async fn complete(&self, _prompt: &str) -> Result<String, ClassifierError> {
        Err(ClassifierError::Connection("no backend in this test".into()))
    }
}

fn test_context(store: Arc<MemoryStore>) -> ScrapeContext {
    ScrapeContext {
        store,
        classifier: Arc::new(Classifier::new(
            Arc::new(NoBackend),
            ClassifierSettings::default(),
        )),
        notify: Arc::new(LogSink),
        browser: BrowserSettings::default(),
        stop: StopFlag::new(),
    }
}

/// Driver that records each invocation and trips the stop flag once the
/// shared call counter reaches a target.
struct ScriptedDriver {
    platform: Platform,
    fail: bool,
    log: Arc<Mutex<Vec<Platform>>>,
    calls: Arc<AtomicU32>,
    stop_at: u32,
    stop: StopFlag,
}

#[async_trait]
impl PlatformDriver for ScriptedDriver {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn scrape(&self, _ctx: &ScrapeContext) -> anyhow::Result<u32> {
        self.log
            .lock()
            .expect("call log poisoned")
            .push(self.platform);
        let total = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if total >= self.stop_at {
            self.stop.trigger();
        }
        if self.fail {
            anyhow::bail!("simulated session failure");
        }
        Ok(1)
    }
}

#[tokio::test]
async fn test_failing_driver_does_not_break_the_rotation() {
    let store = Arc::new(MemoryStore::new());
    let ctx = test_context(store.clone());

    let log: Arc<Mutex<Vec<Platform>>> = Arc::new(Mutex::new(Vec::new()));
    let calls = Arc::new(AtomicU32::new(0));
    // Two full cycles over three drivers, then stop.
    let stop_at = 6;

    let drivers: Vec<Box<dyn PlatformDriver>> = [
        (Platform::LinkedIn, false),
        (Platform::Indeed, true),
        (Platform::Glassdoor, false),
    ]
    .into_iter()
    .map(|(platform, fail)| {
        Box::new(ScriptedDriver {
            platform,
            fail,
            log: log.clone(),
            calls: calls.clone(),
            stop_at,
            stop: ctx.stop.clone(),
        }) as Box<dyn PlatformDriver>
    })
    .collect();

    let schedule = ScheduleSettings {
        platform_cooldown_secs: 0,
        cycle_cooldown_secs: 0,
    };
    let manager = ScraperManager::new(drivers, ctx, schedule);

    tokio::time::timeout(Duration::from_secs(10), manager.run())
        .await
        .expect("scheduler should stop on its own");

    let seen = log.lock().expect("call log poisoned").clone();
    assert_eq!(
        seen,
        vec![
            Platform::LinkedIn,
            Platform::Indeed,
            Platform::Glassdoor,
            Platform::LinkedIn,
            Platform::Indeed,
            Platform::Glassdoor,
        ],
        "healthy drivers must run in both cycles despite the failing one"
    );

    let bugs = store.bug_reports().await;
    assert!(
        bugs.iter().any(|b| {
            b.platform == Platform::Indeed && b.error_type == ErrorCategory::Session
        }),
        "the failing driver should leave a session-level bug report"
    );
}

/// Driver that simulates a long pass by polling the stop flag between
/// short awaits, the way real drivers poll at loop boundaries.
struct PollingDriver;

#[async_trait]
impl PlatformDriver for PollingDriver {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    async fn scrape(&self, ctx: &ScrapeContext) -> anyhow::Result<u32> {
        for _ in 0..600 {
            if ctx.stop.is_set() {
                return Ok(0);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        Ok(0)
    }
}

#[tokio::test]
async fn test_stop_latency_is_bounded_despite_long_cooldowns() {
    let store = Arc::new(MemoryStore::new());
    let ctx = test_context(store);

    let schedule = ScheduleSettings {
        platform_cooldown_secs: 120,
        cycle_cooldown_secs: 600,
    };
    let manager = Arc::new(ScraperManager::new(
        vec![Box::new(PollingDriver) as Box<dyn PlatformDriver>],
        ctx,
        schedule,
    ));

    let runner = manager.clone();
    let handle = tokio::spawn(async move { runner.run().await });

    // Land inside the driver's polling loop before requesting the stop.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let requested = Instant::now();
    manager.stop().await;

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("run should exit well before the configured cooldowns")
        .expect("scheduler task should not panic");
    assert!(
        requested.elapsed() < Duration::from_secs(5),
        "stop latency must be bounded by polling, not by cooldown length"
    );
}
