//! Platform drivers for the supported job boards.
//!
//! Each board implements [`SiteStrategy`]: URL construction, card
//! extraction, and the apply-flow interaction that differ per site. The
//! blanket [`PlatformDriver`] impl in this module supplies everything
//! shared: session launch, cookie priming and rotation, the page/card
//! loops, the filter pre-checks, classification, persistence, and
//! notification fan-out.

pub mod platforms;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::browser::{attempt_evasion, detect_bot_challenge, BrowserSession};
use crate::classifier::{Classifier, Verdict};
use crate::config::BrowserSettings;
use crate::filters;
use crate::models::{
    BugReport, ErrorCategory, FilterSettings, JobPosting, Platform, SkipReason,
};
use crate::notify::NotificationSink;
use crate::store::{load_filter_settings, JobStore};

/// Cookie rotations allowed per scrape pass before giving up on recovery.
const MAX_ROTATION_ATTEMPTS: u32 = 2;
/// Consecutive empty list reads that end the pass.
const MAX_CONSECUTIVE_EMPTY: u32 = 3;
/// Consecutive stale cards that trigger rotation, then termination.
const MAX_CONSECUTIVE_STALE: u32 = 5;
/// Feed reads returning the same card before the pass is declared stuck.
const MAX_FEED_REPEATS: u32 = 3;
/// Cards between orphan-page sweeps.
const ORPHAN_SWEEP_INTERVAL: u64 = 10;
/// Card reads a feed-style pass is allowed per configured page.
const FEED_READS_PER_PAGE: u32 = 10;

/// Cooperative stop signal checked at page and card boundaries.
#[derive(Clone, Debug, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Shared handles every driver invocation receives.
#[derive(Clone)]
pub struct ScrapeContext {
    pub store: Arc<dyn JobStore>,
    pub classifier: Arc<Classifier>,
    pub notify: Arc<dyn NotificationSink>,
    pub browser: BrowserSettings,
    pub stop: StopFlag,
}

/// Per-platform knobs from the config file.
#[derive(Debug, Clone)]
pub struct DriverTuning {
    /// Search query fed into the board's search URL.
    pub query: String,
    /// Result pages (or scroll rounds) per pass.
    pub max_pages: u32,
}

impl Default for DriverTuning {
    fn default() -> Self {
        Self {
            query: "software engineer".to_string(),
            max_pages: 15,
        }
    }
}

/// How a board presents its result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyle {
    /// Numbered result pages reached by URL.
    Paginated,
    /// A single page that grows as it scrolls.
    InfiniteScroll,
    /// A self-mutating feed; the first card is read repeatedly and the
    /// board backfills as cards are dismissed.
    Feed,
}

/// One summary card pulled from a result list.
#[derive(Debug, Clone, Default)]
pub struct JobCard {
    pub company: String,
    pub title: String,
    /// Listing URL when the card exposes one.
    pub url: Option<String>,
    /// Relative age text as rendered ("3 days ago").
    pub posted_text: Option<String>,
    /// Inline salary snippet when the card shows one.
    pub salary: Option<String>,
    pub location: Option<String>,
    /// Card advertises the board's simplified in-platform apply flow.
    pub direct_apply: bool,
    /// Position in the rendered list, used for click targeting.
    pub dom_index: usize,
}

/// Outcome of following a card's apply interaction to the real posting.
#[derive(Debug, Clone)]
pub struct ResolvedDetail {
    /// Final URL after redirects and new-tab hops.
    pub final_url: String,
    /// Visible text of the detail page.
    pub page_text: String,
    /// Posting is closed or no longer accepting applications.
    pub expired: bool,
}

/// What the scheduler knows about a driver.
#[async_trait]
pub trait PlatformDriver: Send + Sync {
    fn platform(&self) -> Platform;

    /// One full scrape pass. Returns the number of newly persisted
    /// postings. Recoverable errors are handled internally; an `Err` is
    /// treated as pass-fatal by the scheduler.
    async fn scrape(&self, ctx: &ScrapeContext) -> Result<u32>;
}

/// Per-board behavior. Implementors get the shared pipeline through the
/// blanket [`PlatformDriver`] impl.
///
/// Marker lists are matched case-insensitively against the list HTML, so
/// supply them lowercase.
#[async_trait]
pub trait SiteStrategy: Send + Sync {
    fn platform(&self) -> Platform;

    fn tuning(&self) -> &DriverTuning;

    fn list_style(&self) -> ListStyle;

    /// Search URL for a zero-based page index. Feed and scroll styles only
    /// ever see index 0.
    fn search_url(&self, query: &str, page_index: u32) -> String;

    /// Pull card summaries out of captured list HTML. Pure.
    fn extract_cards(&self, html: &str) -> Vec<JobCard>;

    /// Texts that mean the query has no (more) results.
    fn no_results_markers(&self) -> &'static [&'static str];

    /// Texts that mean the session is logged out or rate-limited.
    fn login_wall_markers(&self) -> &'static [&'static str];

    /// Bounded window for an apply redirect chain to settle.
    fn settle_timeout(&self) -> Duration {
        Duration::from_secs(8)
    }

    /// Follow the card's apply interaction and capture the final external
    /// URL plus the detail text.
    async fn resolve_application(
        &self,
        session: &BrowserSession,
        card: &JobCard,
    ) -> Result<ResolvedDetail>;

    /// Remove a feed card so the next read returns a fresh one. No-op for
    /// paginated boards.
    async fn advance_feed(&self, _session: &BrowserSession, _card: &JobCard) -> Result<()> {
        Ok(())
    }

    /// Extend an infinite-scroll list. Returns whether the list grew.
    async fn load_more(&self, _session: &BrowserSession) -> Result<bool> {
        Ok(false)
    }

    /// Hook run after each list page loads. The default detects a bot
    /// challenge and attempts evasion once; an unsolved challenge ends the
    /// pass.
    async fn after_list_load(&self, session: &BrowserSession) -> Result<()> {
        let page = session.page();
        if !detect_bot_challenge(page).await {
            return Ok(());
        }
        info!(platform = %SiteStrategy::platform(self), "Bot challenge on list page, attempting evasion");
        if attempt_evasion(page).await {
            return Ok(());
        }
        Err(anyhow::anyhow!("bot challenge did not clear after evasion"))
    }
}

#[async_trait]
impl<T: SiteStrategy> PlatformDriver for T {
    fn platform(&self) -> Platform {
        SiteStrategy::platform(self)
    }

    async fn scrape(&self, ctx: &ScrapeContext) -> Result<u32> {
        let platform = SiteStrategy::platform(self);
        match run_strategy(self, ctx).await {
            Ok(count) => Ok(count),
            Err(e) => {
                let message = format!("Scrape pass failed: {e:#}");
                error!(platform = %platform, "{}", message);
                ctx.notify.on_scraper_error(platform, &message);
                report_bug_quiet(ctx, BugReport::new(platform, ErrorCategory::Session, message))
                    .await;
                Ok(0)
            }
        }
    }
}

/// Launch a session, run the list loop for the strategy's style, and
/// always close the session before surfacing the result.
async fn run_strategy<T>(strategy: &T, ctx: &ScrapeContext) -> Result<u32>
where
    T: SiteStrategy + ?Sized,
{
    let platform = strategy.platform();
    let filters = load_filter_settings(ctx.store.as_ref()).await?;
    let tuning = strategy.tuning();

    info!(
        platform = %platform,
        query = %tuning.query,
        style = ?strategy.list_style(),
        "Starting scrape pass"
    );
    ctx.notify.on_status_update(platform, "start", &tuning.query);

    let session = BrowserSession::launch(platform, &ctx.browser, ctx.notify.clone()).await?;
    let count = drive_session(strategy, ctx, &session, &filters).await;
    session.close().await;
    Ok(count)
}

#[derive(Debug, Default)]
struct RunState {
    new_jobs: u32,
    skipped: u32,
    failed: u32,
    cards_seen: u64,
    consecutive_stale: u32,
    rotation_attempts: u32,
}

impl RunState {
    fn tally(&mut self, outcome: &CardOutcome) {
        self.cards_seen += 1;
        match outcome {
            CardOutcome::Persisted => {
                self.new_jobs += 1;
                self.consecutive_stale = 0;
            }
            CardOutcome::Skipped(SkipReason::Stale { .. }) => {
                self.skipped += 1;
                self.consecutive_stale += 1;
            }
            CardOutcome::Skipped(_) => {
                self.skipped += 1;
                self.consecutive_stale = 0;
            }
            CardOutcome::Failed => {
                self.failed += 1;
                self.consecutive_stale = 0;
            }
        }
    }
}

async fn drive_session<T>(
    strategy: &T,
    ctx: &ScrapeContext,
    session: &BrowserSession,
    filters: &FilterSettings,
) -> u32
where
    T: SiteStrategy + ?Sized,
{
    let platform = strategy.platform();

    // Prime the session with the active cookie set before the first load.
    match ctx.store.get_active_cookie_set(platform).await {
        Ok(Some(set)) => {
            let applied = session.load_cookies(&set).await;
            if applied > 0 {
                if let Err(e) = ctx.store.mark_cookie_set_used(set.id).await {
                    warn!("Failed to mark cookie set {} used: {}", set.id, e);
                }
            }
        }
        Ok(None) => debug!(platform = %platform, "No stored cookies"),
        Err(e) => warn!(platform = %platform, "Could not read cookie sets: {}", e),
    }

    let mut run = RunState::default();
    match strategy.list_style() {
        ListStyle::Paginated => paginated_loop(strategy, ctx, session, filters, &mut run).await,
        ListStyle::InfiniteScroll => scroll_loop(strategy, ctx, session, filters, &mut run).await,
        ListStyle::Feed => feed_loop(strategy, ctx, session, filters, &mut run).await,
    }

    info!(
        platform = %platform,
        new_jobs = run.new_jobs,
        skipped = run.skipped,
        failed = run.failed,
        "Scrape pass complete"
    );
    ctx.notify.on_status_update(
        platform,
        "finish",
        &format!("{} new, {} skipped", run.new_jobs, run.skipped),
    );
    run.new_jobs
}

async fn paginated_loop<T>(
    strategy: &T,
    ctx: &ScrapeContext,
    session: &BrowserSession,
    filters: &FilterSettings,
    run: &mut RunState,
) where
    T: SiteStrategy + ?Sized,
{
    let platform = strategy.platform();
    let tuning = strategy.tuning();
    let mut page_index = 0u32;
    let mut consecutive_empty = 0u32;

    'pages: while page_index < tuning.max_pages {
        if ctx.stop.is_set() {
            info!(platform = %platform, "Stop requested, ending page loop");
            break;
        }

        let url = strategy.search_url(&tuning.query, page_index);
        if let Err(e) = session.navigate(session.page(), &url).await {
            warn!(platform = %platform, page = page_index, "List navigation failed: {:#}", e);
            report_bug_quiet(
                ctx,
                BugReport::new(
                    platform,
                    ErrorCategory::Navigation,
                    format!("Result page {page_index} failed to load: {e:#}"),
                )
                .with_url(&url),
            )
            .await;
            break;
        }
        if let Err(e) = strategy.after_list_load(session).await {
            warn!(platform = %platform, "List page unusable: {:#}", e);
            report_bug_quiet(
                ctx,
                BugReport::new(platform, ErrorCategory::Challenge, format!("{e:#}"))
                    .with_url(&url),
            )
            .await;
            break;
        }

        let html = match session.page().content().await {
            Ok(html) => html,
            Err(e) => {
                warn!(platform = %platform, page = page_index, "Could not capture list HTML: {}", e);
                consecutive_empty += 1;
                if consecutive_empty >= MAX_CONSECUTIVE_EMPTY {
                    break;
                }
                page_index += 1;
                continue;
            }
        };

        match list_health(strategy, &html) {
            ListHealth::LoginWall => {
                warn!(platform = %platform, "Login wall on result page");
                if try_cookie_rotation(ctx, session, platform, &mut run.rotation_attempts).await {
                    continue;
                }
                report_bug_quiet(
                    ctx,
                    BugReport::new(
                        platform,
                        ErrorCategory::Session,
                        "Login wall on result page and no alternate cookie set",
                    )
                    .with_url(&url),
                )
                .await;
                break;
            }
            ListHealth::NoResults => {
                info!(platform = %platform, page = page_index, "No further results");
                break;
            }
            ListHealth::Healthy => {}
        }

        let cards = strategy.extract_cards(&html);
        if cards.is_empty() {
            consecutive_empty += 1;
            debug!(platform = %platform, page = page_index, streak = consecutive_empty, "No cards extracted");
            if consecutive_empty >= MAX_CONSECUTIVE_EMPTY {
                if try_cookie_rotation(ctx, session, platform, &mut run.rotation_attempts).await {
                    consecutive_empty = 0;
                    continue;
                }
                info!(platform = %platform, "Empty page streak, ending pass");
                break;
            }
            page_index += 1;
            continue;
        }
        consecutive_empty = 0;
        info!(platform = %platform, page = page_index, cards = cards.len(), "Processing result page");

        for card in &cards {
            if ctx.stop.is_set() {
                info!(platform = %platform, "Stop requested, ending card loop");
                break 'pages;
            }
            let outcome = process_card(ctx, filters, platform, card, || {
                strategy.resolve_application(session, card)
            })
            .await;
            run.tally(&outcome);
            if run.cards_seen % ORPHAN_SWEEP_INTERVAL == 0 {
                session.cleanup_orphan_pages(&[]).await;
            }
            if run.consecutive_stale >= MAX_CONSECUTIVE_STALE {
                if try_cookie_rotation(ctx, session, platform, &mut run.rotation_attempts).await {
                    run.consecutive_stale = 0;
                    continue 'pages;
                }
                info!(platform = %platform, "Stale streak persists, ending pass");
                break 'pages;
            }
            think_time().await;
        }

        page_index += 1;
    }
}

async fn scroll_loop<T>(
    strategy: &T,
    ctx: &ScrapeContext,
    session: &BrowserSession,
    filters: &FilterSettings,
    run: &mut RunState,
) where
    T: SiteStrategy + ?Sized,
{
    let platform = strategy.platform();
    let tuning = strategy.tuning();
    let url = strategy.search_url(&tuning.query, 0);

    if let Err(e) = session.navigate(session.page(), &url).await {
        warn!(platform = %platform, "List navigation failed: {:#}", e);
        report_bug_quiet(
            ctx,
            BugReport::new(
                platform,
                ErrorCategory::Navigation,
                format!("Result list failed to load: {e:#}"),
            )
            .with_url(&url),
        )
        .await;
        return;
    }
    if let Err(e) = strategy.after_list_load(session).await {
        warn!(platform = %platform, "List page unusable: {:#}", e);
        report_bug_quiet(
            ctx,
            BugReport::new(platform, ErrorCategory::Challenge, format!("{e:#}")).with_url(&url),
        )
        .await;
        return;
    }

    let mut processed = 0usize;
    let mut rounds = 0u32;

    'rounds: loop {
        if rounds >= tuning.max_pages {
            debug!(platform = %platform, "Scroll round budget spent");
            break;
        }
        rounds += 1;
        if ctx.stop.is_set() {
            info!(platform = %platform, "Stop requested, ending scroll loop");
            break;
        }

        let html = match session.page().content().await {
            Ok(html) => html,
            Err(e) => {
                warn!(platform = %platform, "Could not capture list HTML: {}", e);
                break;
            }
        };

        match list_health(strategy, &html) {
            ListHealth::LoginWall => {
                warn!(platform = %platform, "Login wall on result list");
                if try_cookie_rotation(ctx, session, platform, &mut run.rotation_attempts).await
                    && session.navigate(session.page(), &url).await.is_ok()
                {
                    processed = 0;
                    continue;
                }
                report_bug_quiet(
                    ctx,
                    BugReport::new(
                        platform,
                        ErrorCategory::Session,
                        "Login wall on result list and no alternate cookie set",
                    )
                    .with_url(&url),
                )
                .await;
                break;
            }
            ListHealth::NoResults => {
                info!(platform = %platform, "No further results");
                break;
            }
            ListHealth::Healthy => {}
        }

        let cards = strategy.extract_cards(&html);
        if processed >= cards.len() {
            match strategy.load_more(session).await {
                Ok(true) => continue,
                Ok(false) => {
                    debug!(platform = %platform, "List stopped growing");
                    break;
                }
                Err(e) => {
                    warn!(platform = %platform, "Scroll failed: {}", e);
                    break;
                }
            }
        }

        info!(
            platform = %platform,
            fresh = cards.len() - processed,
            total = cards.len(),
            "Processing scrolled-in cards"
        );
        for card in &cards[processed..] {
            if ctx.stop.is_set() {
                info!(platform = %platform, "Stop requested, ending card loop");
                break 'rounds;
            }
            processed += 1;
            let outcome = process_card(ctx, filters, platform, card, || {
                strategy.resolve_application(session, card)
            })
            .await;
            run.tally(&outcome);
            if run.cards_seen % ORPHAN_SWEEP_INTERVAL == 0 {
                session.cleanup_orphan_pages(&[]).await;
            }
            if run.consecutive_stale >= MAX_CONSECUTIVE_STALE {
                if try_cookie_rotation(ctx, session, platform, &mut run.rotation_attempts).await
                    && session.navigate(session.page(), &url).await.is_ok()
                {
                    run.consecutive_stale = 0;
                    processed = 0;
                    continue 'rounds;
                }
                info!(platform = %platform, "Stale streak persists, ending pass");
                break 'rounds;
            }
            think_time().await;
        }
    }
}

async fn feed_loop<T>(
    strategy: &T,
    ctx: &ScrapeContext,
    session: &BrowserSession,
    filters: &FilterSettings,
    run: &mut RunState,
) where
    T: SiteStrategy + ?Sized,
{
    let platform = strategy.platform();
    let tuning = strategy.tuning();
    let url = strategy.search_url(&tuning.query, 0);

    if let Err(e) = session.navigate(session.page(), &url).await {
        warn!(platform = %platform, "Feed navigation failed: {:#}", e);
        report_bug_quiet(
            ctx,
            BugReport::new(
                platform,
                ErrorCategory::Navigation,
                format!("Feed failed to load: {e:#}"),
            )
            .with_url(&url),
        )
        .await;
        return;
    }
    if let Err(e) = strategy.after_list_load(session).await {
        warn!(platform = %platform, "Feed unusable: {:#}", e);
        report_bug_quiet(
            ctx,
            BugReport::new(platform, ErrorCategory::Challenge, format!("{e:#}")).with_url(&url),
        )
        .await;
        return;
    }

    let max_reads = tuning.max_pages.saturating_mul(FEED_READS_PER_PAGE);
    let mut reads = 0u32;
    let mut consecutive_empty = 0u32;
    let mut last_key: Option<(String, String)> = None;
    let mut repeats = 0u32;

    while reads < max_reads {
        if ctx.stop.is_set() {
            info!(platform = %platform, "Stop requested, ending feed loop");
            break;
        }
        reads += 1;

        let html = match session.page().content().await {
            Ok(html) => html,
            Err(e) => {
                warn!(platform = %platform, "Could not capture feed HTML: {}", e);
                consecutive_empty += 1;
                if consecutive_empty >= MAX_CONSECUTIVE_EMPTY {
                    break;
                }
                continue;
            }
        };

        match list_health(strategy, &html) {
            ListHealth::LoginWall => {
                warn!(platform = %platform, "Login wall on feed");
                if try_cookie_rotation(ctx, session, platform, &mut run.rotation_attempts).await
                    && session.navigate(session.page(), &url).await.is_ok()
                {
                    continue;
                }
                report_bug_quiet(
                    ctx,
                    BugReport::new(
                        platform,
                        ErrorCategory::Session,
                        "Login wall on feed and no alternate cookie set",
                    )
                    .with_url(&url),
                )
                .await;
                break;
            }
            ListHealth::NoResults => {
                info!(platform = %platform, "Feed is empty");
                break;
            }
            ListHealth::Healthy => {}
        }

        let Some(card) = strategy.extract_cards(&html).into_iter().next() else {
            consecutive_empty += 1;
            debug!(platform = %platform, streak = consecutive_empty, "No card in feed");
            if consecutive_empty >= MAX_CONSECUTIVE_EMPTY {
                if try_cookie_rotation(ctx, session, platform, &mut run.rotation_attempts).await
                    && session.navigate(session.page(), &url).await.is_ok()
                {
                    consecutive_empty = 0;
                    continue;
                }
                info!(platform = %platform, "Feed has no readable cards, ending pass");
                break;
            }
            // Feeds backfill asynchronously; give the page a beat.
            tokio::time::sleep(Duration::from_secs(2)).await;
            continue;
        };
        consecutive_empty = 0;

        let key = (card.company.clone(), card.title.clone());
        if last_key.as_ref() == Some(&key) {
            repeats += 1;
            if repeats >= MAX_FEED_REPEATS {
                warn!(platform = %platform, title = %card.title, "Feed is not advancing, ending pass");
                break;
            }
        } else {
            repeats = 0;
            last_key = Some(key);
        }

        let outcome = process_card(ctx, filters, platform, &card, || {
            strategy.resolve_application(session, &card)
        })
        .await;
        run.tally(&outcome);
        if run.cards_seen % ORPHAN_SWEEP_INTERVAL == 0 {
            session.cleanup_orphan_pages(&[]).await;
        }

        if let Err(e) = strategy.advance_feed(session, &card).await {
            warn!(platform = %platform, "Could not advance feed: {}", e);
        }

        if run.consecutive_stale >= MAX_CONSECUTIVE_STALE {
            if try_cookie_rotation(ctx, session, platform, &mut run.rotation_attempts).await
                && session.navigate(session.page(), &url).await.is_ok()
            {
                run.consecutive_stale = 0;
                continue;
            }
            info!(platform = %platform, "Stale streak persists, ending pass");
            break;
        }

        think_time().await;
    }
}

enum ListHealth {
    Healthy,
    LoginWall,
    NoResults,
}

fn list_health<T>(strategy: &T, html: &str) -> ListHealth
where
    T: SiteStrategy + ?Sized,
{
    let lower = html.to_lowercase();
    if strategy
        .login_wall_markers()
        .iter()
        .any(|marker| lower.contains(marker))
    {
        return ListHealth::LoginWall;
    }
    if strategy
        .no_results_markers()
        .iter()
        .any(|marker| lower.contains(marker))
    {
        return ListHealth::NoResults;
    }
    ListHealth::Healthy
}

/// Swap in the next stored cookie set, bounded per pass. Returns whether a
/// fresh set was applied.
async fn try_cookie_rotation(
    ctx: &ScrapeContext,
    session: &BrowserSession,
    platform: Platform,
    attempts: &mut u32,
) -> bool {
    if *attempts >= MAX_ROTATION_ATTEMPTS {
        debug!(platform = %platform, "Rotation attempts exhausted");
        return false;
    }
    *attempts += 1;
    match ctx.store.rotate_cookie_set(platform).await {
        Ok(Some(set)) => {
            info!(platform = %platform, label = %set.label, "Rotating to alternate cookie set");
            ctx.notify
                .on_status_update(platform, "rotate_cookies", &set.label);
            let applied = session.load_cookies(&set).await;
            if applied > 0 {
                if let Err(e) = ctx.store.mark_cookie_set_used(set.id).await {
                    warn!("Failed to mark cookie set {} used: {}", set.id, e);
                }
            }
            true
        }
        Ok(None) => {
            debug!(platform = %platform, "No alternate cookie set available");
            false
        }
        Err(e) => {
            warn!(platform = %platform, "Cookie rotation failed: {}", e);
            false
        }
    }
}

/// Where a card ended up after one trip through the pipeline.
#[derive(Debug)]
pub enum CardOutcome {
    /// Persisted as a new actionable posting.
    Persisted,
    /// Filtered out; suppression-class reasons are still persisted as
    /// applied-by-Bot records.
    Skipped(SkipReason),
    /// Resolution or persistence failed; reported as a bug.
    Failed,
}

/// Run one card through pre-checks, resolution, classification, the
/// post-filters, and persistence.
///
/// `resolve` is invoked only when every pre-check passes, so stale or
/// filtered cards never open a detail page and never touch the
/// classifier.
pub async fn process_card<F, Fut>(
    ctx: &ScrapeContext,
    filters: &FilterSettings,
    platform: Platform,
    card: &JobCard,
    resolve: F,
) -> CardOutcome
where
    F: FnOnce() -> Fut + Send,
    Fut: Future<Output = Result<ResolvedDetail>> + Send,
{
    // Pre-checks in fixed order, cheapest first.
    if let Some(posted) = card.posted_text.as_deref() {
        if filters::is_stale(posted, filters.stale_after_days) {
            let reason = SkipReason::Stale {
                posted: posted.to_string(),
            };
            return skip_card(ctx, platform, card, None, reason).await;
        }
    }

    if card.direct_apply {
        return skip_card(ctx, platform, card, None, SkipReason::DirectApply).await;
    }

    let card_url = card.url.as_deref().unwrap_or("");
    match ctx
        .store
        .is_duplicate(&card.company, &card.title, card_url)
        .await
    {
        Ok(true) => return skip_card(ctx, platform, card, None, SkipReason::Duplicate).await,
        Ok(false) => {}
        Err(e) => warn!("Duplicate check failed for {}: {}", card.title, e),
    }

    if let Some(keyword) = filters::matches_ignored_keyword(&card.title, &filters.ignore_keywords) {
        let reason = SkipReason::IgnoredKeyword {
            keyword: keyword.to_string(),
        };
        return skip_card(ctx, platform, card, None, reason).await;
    }

    if let Some(url) = card.url.as_deref() {
        // The board's own listing URL never counts against the block-list;
        // only a known external target does. The final resolved URL is
        // checked again after classification.
        if !url.contains(platform.base_domain()) {
            if let Some(domain) = filters::matches_ignored_domain(url, &filters.ignore_domains) {
                let reason = SkipReason::IgnoredDomain {
                    domain: domain.to_string(),
                };
                return skip_card(ctx, platform, card, None, reason).await;
            }
        }
    }

    if let Some(salary_text) = card.salary.as_deref() {
        let check = filters::compare_salary_to_floor(salary_text, &filters.salary_floor);
        if !check.meets {
            let reason = SkipReason::SalaryBelowFloor {
                normalized_annual: check.normalized_annual.unwrap_or(0.0),
            };
            return skip_card(ctx, platform, card, None, reason).await;
        }
    }

    if let Some(location) = card.location.as_deref() {
        if !filters::is_usa_location(location) {
            let reason = SkipReason::NonUsa {
                location: location.to_string(),
            };
            return skip_card(ctx, platform, card, None, reason).await;
        }
    }

    // Follow the apply flow to the real posting.
    let resolved = match resolve().await {
        Ok(detail) => detail,
        Err(e) => {
            let message = format!("{} at {}: {:#}", card.title, card.company, e);
            ctx.notify.on_scraper_warning(platform, &message);
            let mut report = BugReport::new(platform, ErrorCategory::Navigation, message)
                .with_job(&card.company, &card.title);
            if let Some(url) = card.url.as_deref() {
                report = report.with_url(url);
            }
            report_bug_quiet(ctx, report).await;
            return CardOutcome::Failed;
        }
    };

    if resolved.expired {
        return skip_card(
            ctx,
            platform,
            card,
            Some(&resolved.final_url),
            SkipReason::Expired,
        )
        .await;
    }

    if ctx.classifier.is_content_too_short(&resolved.page_text) {
        return skip_card(
            ctx,
            platform,
            card,
            Some(&resolved.final_url),
            SkipReason::LowContent,
        )
        .await;
    }

    let verdict = ctx
        .classifier
        .classify(
            &resolved.page_text,
            &card.company,
            &card.title,
            &resolved.final_url,
        )
        .await;

    let posting = match verdict {
        Some(v) if v.is_verification_page => {
            return skip_card(
                ctx,
                platform,
                card,
                Some(&resolved.final_url),
                SkipReason::BotChallenge,
            )
            .await;
        }
        Some(v) if v.is_expired => {
            return skip_card(
                ctx,
                platform,
                card,
                Some(&resolved.final_url),
                SkipReason::Expired,
            )
            .await;
        }
        Some(v) => {
            if let Some(detail) = ctx.classifier.unsuitability(&v) {
                return skip_card(
                    ctx,
                    platform,
                    card,
                    Some(&resolved.final_url),
                    SkipReason::Unsuitable { detail },
                )
                .await;
            }

            let salary_text = v.salary.clone().or_else(|| card.salary.clone());
            if let Some(ref text) = salary_text {
                let check = filters::compare_salary_to_floor(text, &filters.salary_floor);
                if !check.meets {
                    let reason = SkipReason::SalaryBelowFloor {
                        normalized_annual: check.normalized_annual.unwrap_or(0.0),
                    };
                    return skip_card(ctx, platform, card, Some(&resolved.final_url), reason)
                        .await;
                }
            }

            // The block-list has to hold against the URL the apply flow
            // actually landed on, not just the board's listing URL.
            if let Some(domain) =
                filters::matches_ignored_domain(&resolved.final_url, &filters.ignore_domains)
            {
                let reason = SkipReason::IgnoredDomain {
                    domain: domain.to_string(),
                };
                return skip_card(ctx, platform, card, Some(&resolved.final_url), reason).await;
            }

            if let Some(ref location) = v.location {
                if !filters::is_usa_location(location) {
                    let reason = SkipReason::NonUsa {
                        location: location.clone(),
                    };
                    return skip_card(ctx, platform, card, Some(&resolved.final_url), reason)
                        .await;
                }
            }

            build_posting(platform, card, &resolved, Some(&v))
        }
        None => {
            // Classifier unavailable. Card data plus conservative flags
            // keeps the candidate rather than dropping it silently.
            debug!(platform = %platform, title = %card.title, "No verdict, falling back to card data");
            build_posting(platform, card, &resolved, None)
        }
    };

    match ctx.store.add_posting(&posting).await {
        Ok(true) => {
            ctx.notify
                .on_new_job(&posting.company, &posting.title, platform);
            CardOutcome::Persisted
        }
        Ok(false) => {
            ctx.notify.on_job_skipped(
                &posting.company,
                &posting.title,
                platform,
                &SkipReason::Duplicate,
            );
            CardOutcome::Skipped(SkipReason::Duplicate)
        }
        Err(e) => {
            let message = format!("Failed to persist {}: {:#}", posting.title, e);
            ctx.notify.on_scraper_error(platform, &message);
            report_bug_quiet(
                ctx,
                BugReport::new(platform, ErrorCategory::Internal, message)
                    .with_job(&posting.company, &posting.title)
                    .with_url(&posting.url),
            )
            .await;
            CardOutcome::Failed
        }
    }
}

/// Notify the skip and, for suppression-class reasons, persist the posting
/// pre-marked as applied by "Bot" so regenerating feeds stop re-serving it.
async fn skip_card(
    ctx: &ScrapeContext,
    platform: Platform,
    card: &JobCard,
    final_url: Option<&str>,
    reason: SkipReason,
) -> CardOutcome {
    ctx.notify
        .on_job_skipped(&card.company, &card.title, platform, &reason);
    debug!(platform = %platform, title = %card.title, "Skipped: {}", reason);

    if reason.record_and_suppress() {
        let url = final_url
            .map(str::to_string)
            .or_else(|| card.url.clone())
            .unwrap_or_default();
        let mut posting =
            JobPosting::new(platform, card.company.clone(), card.title.clone(), url);
        posting.salary = card.salary.clone();
        posting.location = card.location.clone();
        posting.applied = true;
        posting.applied_by = Some("Bot".to_string());
        posting.note = Some(format!("Auto-suppressed: {reason}"));
        if let Err(e) = ctx.store.add_posting(&posting).await {
            warn!(
                "Failed to record suppressed posting {}: {}",
                posting.title, e
            );
        }
    }

    CardOutcome::Skipped(reason)
}

fn build_posting(
    platform: Platform,
    card: &JobCard,
    resolved: &ResolvedDetail,
    verdict: Option<&Verdict>,
) -> JobPosting {
    let mut posting = JobPosting::new(
        platform,
        card.company.clone(),
        card.title.clone(),
        resolved.final_url.clone(),
    );
    match verdict {
        Some(v) => {
            if !v.company.trim().is_empty() {
                posting.company = v.company.clone();
            }
            if !v.title.trim().is_empty() {
                posting.title = v.title.clone();
            }
            posting.salary = v.salary.clone().or_else(|| card.salary.clone());
            posting.tech_stack = v.tech_stack.clone();
            posting.location = v.location.clone().or_else(|| card.location.clone());
            posting.remote = v.is_remote;
            posting.startup = v.is_startup;
        }
        None => {
            posting.salary = card.salary.clone();
            posting.location = card.location.clone();
            // The searches target remote listings, so keep that assumption
            // when no verdict is available.
            posting.remote = true;
        }
    }
    posting
}

async fn report_bug_quiet(ctx: &ScrapeContext, report: BugReport) {
    if let Err(e) = ctx.store.report_bug(report).await {
        warn!("Failed to record bug report: {}", e);
    }
}

/// Human-ish pause between cards.
async fn think_time() {
    let ms = {
        let mut rng = rand::rng();
        rng.random_range(1000..3000)
    };
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
