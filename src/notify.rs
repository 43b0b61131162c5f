//! Notification and status sink consumed by drivers and the scheduler.
//!
//! Every method is fire-and-forget: sinks log, print, or forward to a UI
//! shell, and a broken sink must never abort scraping, so nothing here
//! returns a Result.

use console::style;
use tracing::{error, info, warn};

use crate::models::{Platform, SkipReason};

/// Outbound event surface. The desktop shell implements this over IPC; the
/// CLI uses the console implementation; tests record calls.
pub trait NotificationSink: Send + Sync {
    fn on_new_job(&self, company: &str, title: &str, platform: Platform);
    fn on_job_skipped(&self, company: &str, title: &str, platform: Platform, reason: &SkipReason);
    /// Coarse progress for a status display. `detail` is free-form (a URL
    /// while navigating, a page number while paginating).
    fn on_status_update(&self, platform: Platform, step: &str, detail: &str);
    fn on_scraper_error(&self, platform: Platform, message: &str);
    fn on_scraper_warning(&self, platform: Platform, message: &str);
}

/// Sink that forwards everything to tracing. Default for library embedding.
#[derive(Debug, Default, Clone)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn on_new_job(&self, company: &str, title: &str, platform: Platform) {
        info!(platform = platform.as_str(), company, title, "new job found");
    }

    fn on_job_skipped(&self, company: &str, title: &str, platform: Platform, reason: &SkipReason) {
        info!(
            platform = platform.as_str(),
            company,
            title,
            reason = reason.label(),
            "skipped {reason}"
        );
    }

    fn on_status_update(&self, platform: Platform, step: &str, detail: &str) {
        info!(platform = platform.as_str(), step, detail, "status");
    }

    fn on_scraper_error(&self, platform: Platform, message: &str) {
        error!(platform = platform.as_str(), "{message}");
    }

    fn on_scraper_warning(&self, platform: Platform, message: &str) {
        warn!(platform = platform.as_str(), "{message}");
    }
}

/// Sink for interactive CLI runs: new jobs and failures go to stdout with
/// styling, chatty status updates stay on the log.
#[derive(Debug, Default, Clone)]
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn on_new_job(&self, company: &str, title: &str, platform: Platform) {
        println!(
            "  {} {} at {} [{}]",
            style("+").green().bold(),
            style(title).bold(),
            company,
            platform.display_name()
        );
    }

    fn on_job_skipped(&self, company: &str, title: &str, platform: Platform, reason: &SkipReason) {
        info!(
            platform = platform.as_str(),
            company,
            title,
            reason = reason.label(),
            "skipped"
        );
    }

    fn on_status_update(&self, platform: Platform, step: &str, detail: &str) {
        info!(platform = platform.as_str(), step, detail, "status");
    }

    fn on_scraper_error(&self, platform: Platform, message: &str) {
        eprintln!(
            "  {} [{}] {}",
            style("error:").red().bold(),
            platform.display_name(),
            message
        );
    }

    fn on_scraper_warning(&self, platform: Platform, message: &str) {
        eprintln!(
            "  {} [{}] {}",
            style("warning:").yellow(),
            platform.display_name(),
            message
        );
    }
}
