//! Round-robin scheduling across platform drivers.
//!
//! Drivers run strictly sequentially: one platform finishes (or fails)
//! before the next starts, with a short cooldown between platforms and a
//! long one between full cycles. A driver error never ends the loop; it is
//! logged, reported, and the rotation moves on. Shutdown is cooperative
//! through the shared stop flag, which drivers poll at their loop
//! boundaries and the cooldowns poll every second.

use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::config::ScheduleSettings;
use crate::models::{BugReport, ErrorCategory};
use crate::scrapers::{PlatformDriver, ScrapeContext, StopFlag};

pub struct ScraperManager {
    drivers: Vec<Box<dyn PlatformDriver>>,
    ctx: ScrapeContext,
    schedule: ScheduleSettings,
}

impl ScraperManager {
    pub fn new(
        drivers: Vec<Box<dyn PlatformDriver>>,
        ctx: ScrapeContext,
        schedule: ScheduleSettings,
    ) -> Self {
        Self {
            drivers,
            ctx,
            schedule,
        }
    }

    /// Handle for signal handlers and embedding shells. Triggering it has
    /// the same effect as [`ScraperManager::stop`] minus the classifier
    /// reset.
    pub fn stop_flag(&self) -> StopFlag {
        self.ctx.stop.clone()
    }

    /// Request shutdown. Drivers observe the flag at their next loop
    /// boundary; the classifier cooldown stamp is cleared so a later start
    /// begins fresh.
    pub async fn stop(&self) {
        self.ctx.stop.trigger();
        self.ctx.classifier.release().await;
    }

    /// Run scrape cycles until the stop flag is set. Never returns early on
    /// driver failure.
    pub async fn run(&self) {
        if self.drivers.is_empty() {
            info!("No platform drivers enabled, nothing to do");
            return;
        }

        let mut cycle: u64 = 0;
        while !self.ctx.stop.is_set() {
            cycle += 1;
            info!(cycle, drivers = self.drivers.len(), "starting scrape cycle");
            let cycle_start = Instant::now();
            let mut cycle_new_jobs: u32 = 0;

            for driver in &self.drivers {
                if self.ctx.stop.is_set() {
                    break;
                }
                let platform = driver.platform();

                match driver.scrape(&self.ctx).await {
                    Ok(new_jobs) => {
                        cycle_new_jobs += new_jobs;
                        if new_jobs > 0 {
                            self.ctx.notify.on_status_update(
                                platform,
                                "cycle",
                                &format!("{new_jobs} new jobs"),
                            );
                        }
                    }
                    Err(e) => {
                        // Drivers catch their own failures; this arm only
                        // fires for implementations outside the shared
                        // pipeline.
                        error!(platform = platform.as_str(), "Driver failed: {e:#}");
                        self.ctx
                            .notify
                            .on_scraper_error(platform, &format!("Driver failed: {e:#}"));
                        let report = BugReport::new(
                            platform,
                            ErrorCategory::Session,
                            format!("Driver failed: {e:#}"),
                        );
                        if let Err(store_err) = self.ctx.store.report_bug(report).await {
                            error!("Failed to record bug report: {store_err:#}");
                        }
                    }
                }

                self.cooldown(Duration::from_secs(self.schedule.platform_cooldown_secs))
                    .await;
            }

            info!(
                cycle,
                new_jobs = cycle_new_jobs,
                elapsed_secs = cycle_start.elapsed().as_secs(),
                "scrape cycle complete"
            );
            self.cooldown(Duration::from_secs(self.schedule.cycle_cooldown_secs))
                .await;
        }

        info!("Scheduler stopped");
    }

    /// Sleep that checks the stop flag every second, so shutdown latency is
    /// bounded by the longest single browser await rather than a cooldown.
    async fn cooldown(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        loop {
            if self.ctx.stop.is_set() {
                return;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return;
            }
            tokio::time::sleep(remaining.min(Duration::from_secs(1))).await;
        }
    }
}
