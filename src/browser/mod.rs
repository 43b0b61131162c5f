//! Headless browser session shared by all platform drivers.
//!
//! Wraps chromiumoxide (CDP) with the anti-detection setup job boards
//! probe for: stealth launch flags, a user agent randomized once per
//! session, fingerprint masks registered on every new document, and
//! cookie injection from stored sets.

mod challenge;
mod cookies;
mod stealth;

pub use challenge::{attempt_evasion, detect_bot_challenge};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, NavigateParams,
};
use chromiumoxide::cdp::browser_protocol::target::TargetId;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use rand::seq::IndexedRandom;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BrowserSettings;
use crate::models::{CookieSet, Platform};
use crate::notify::NotificationSink;

/// Realistic desktop Chrome user agents. One is chosen per session and kept
/// stable thereafter; rotating mid-session is itself a bot signal.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
];

/// Common Chrome executable paths to check.
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    // Common install locations
    "/opt/google/chrome/google-chrome",
];

/// JavaScript to wait for page ready state.
const WAIT_FOR_READY_SCRIPT: &str = r#"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
"#;

/// One isolated browsing context, owned by a single driver invocation.
pub struct BrowserSession {
    platform: Platform,
    browser: Mutex<Option<Browser>>,
    handler_task: JoinHandle<()>,
    page: Page,
    worker_pages: Mutex<Vec<Page>>,
    user_agent: &'static str,
    navigation_timeout: Duration,
    element_timeout: Duration,
    notify: Arc<dyn NotificationSink>,
}

impl BrowserSession {
    /// Launch a local Chrome (or connect to a remote one) and prepare the
    /// primary page. A launch failure is fatal for the calling driver
    /// invocation only; the scheduler moves on to the next platform.
    pub async fn launch(
        platform: Platform,
        settings: &BrowserSettings,
        notify: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        let remote_url = std::env::var("JOBSCOUT_BROWSER_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| settings.remote_url.clone());

        let (browser, handler_task) = match remote_url {
            Some(url) => connect_remote(&url, settings).await?,
            None => launch_local(settings).await?,
        };

        let page = browser
            .new_page("about:blank")
            .await
            .context("Failed to open initial page")?;

        let user_agent = {
            let mut rng = rand::rng();
            USER_AGENTS
                .choose(&mut rng)
                .copied()
                .unwrap_or(USER_AGENTS[0])
        };

        let session = Self {
            platform,
            browser: Mutex::new(Some(browser)),
            handler_task,
            page,
            worker_pages: Mutex::new(Vec::new()),
            user_agent,
            navigation_timeout: Duration::from_secs(settings.navigation_timeout_secs),
            element_timeout: Duration::from_secs(settings.element_timeout_secs),
            notify,
        };

        session.prepare_page(&session.page).await?;
        info!(
            platform = %platform,
            user_agent = session.user_agent,
            "Browser session ready"
        );
        Ok(session)
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// The primary page, used for list navigation.
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Apply the session user agent and fingerprint masks to a page. The
    /// masks are registered for all future documents and evaluated once on
    /// the current one.
    async fn prepare_page(&self, page: &Page) -> Result<()> {
        page.execute(SetUserAgentOverrideParams::new(self.user_agent.to_string()))
            .await?;
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            stealth::bundle(),
        ))
        .await?;

        for script in stealth::STEALTH_SCRIPTS {
            if let Err(e) = page.evaluate(script.to_string()).await {
                debug!("Stealth script injection skipped: {}", e);
            }
        }

        Ok(())
    }

    /// Install a stored cookie set into this context. Per-cookie failures
    /// are logged and skipped; returns how many cookies stuck.
    pub async fn load_cookies(&self, set: &CookieSet) -> u32 {
        cookies::apply_cookie_set(&self.page, self.platform, set).await
    }

    /// Navigate a page and wait for document-ready. Returns the URL after
    /// load so callers can observe redirects. Redirect-following stays
    /// caller-driven; several platforms need to intercept intermediate
    /// modal or tab steps.
    pub async fn navigate(&self, page: &Page, url: &str) -> Result<String> {
        info!(platform = %self.platform, "Navigating to {}", url);

        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| anyhow::anyhow!("Invalid URL: {}", e))?;

        let timeout_secs = self.navigation_timeout.as_secs();
        tokio::time::timeout(self.navigation_timeout, page.execute(nav_params))
            .await
            .map_err(|_| {
                anyhow::anyhow!("Navigation timed out after {}s for {}", timeout_secs, url)
            })?
            .map_err(|e| anyhow::anyhow!("Navigation failed for {}: {}", url, e))?;

        self.wait_for_ready(page).await;

        let final_url = page
            .url()
            .await?
            .map(|u| u.to_string())
            .unwrap_or_else(|| url.to_string());

        // Mirror to the live status surface; never fatal.
        self.notify
            .on_status_update(self.platform, "navigate", &final_url);

        Ok(final_url)
    }

    async fn wait_for_ready(&self, page: &Page) {
        match tokio::time::timeout(
            self.navigation_timeout,
            page.evaluate(WAIT_FOR_READY_SCRIPT.to_string()),
        )
        .await
        {
            Ok(Ok(result)) => {
                let state: String = result
                    .into_value()
                    .unwrap_or_else(|_| "unknown".to_string());
                debug!("Page ready state: {}", state);
            }
            Ok(Err(e)) => {
                debug!("Could not check ready state: {}", e);
            }
            Err(_) => {
                warn!("Timeout waiting for page ready state");
            }
        }
    }

    /// Wait for a selector with the element timeout. Returns whether it
    /// appeared; absence is a signal (empty results page), not an error.
    pub async fn wait_for_selector(&self, page: &Page, selector: &str) -> bool {
        match tokio::time::timeout(self.element_timeout, page.find_element(selector)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("Selector {} not found: {}", selector, e);
                false
            }
            Err(_) => {
                debug!("Timeout waiting for selector {}", selector);
                false
            }
        }
    }

    /// Visible text of the page body, the classifier's input.
    pub async fn page_text(&self, page: &Page) -> Result<String> {
        let value = page
            .evaluate("document.body ? document.body.innerText : ''")
            .await?;
        Ok(value.into_value::<String>().unwrap_or_default())
    }

    /// Open an auxiliary page in the same context with the same
    /// anti-detection setup, for detail inspection without losing the
    /// list page. The session tracks it for orphan cleanup.
    pub async fn new_worker_page(&self, label: &str) -> Result<Page> {
        let page = {
            let guard = self.browser.lock().await;
            let browser = guard
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("Browser session already closed"))?;
            browser.new_page("about:blank").await?
        };

        self.prepare_page(&page).await?;
        debug!(label, "Opened worker page");
        self.worker_pages.lock().await.push(page.clone());
        Ok(page)
    }

    /// Close an auxiliary page and drop it from tracking. Strategies call
    /// this on every exit path of a detail inspection; the periodic orphan
    /// sweep only has to catch what slipped through.
    pub async fn close_worker(&self, page: Page) {
        let id = page.target_id().clone();
        self.worker_pages
            .lock()
            .await
            .retain(|p| p.target_id() != &id);
        if let Err(e) = page.close().await {
            debug!("Failed to close worker page: {}", e);
        }
    }

    /// Snapshot of currently open targets, for diffing after an action
    /// that may spawn a tab.
    pub async fn known_targets(&self) -> Vec<TargetId> {
        let guard = self.browser.lock().await;
        let Some(browser) = guard.as_ref() else {
            return Vec::new();
        };
        match browser.pages().await {
            Ok(pages) => pages.iter().map(|p| p.target_id().clone()).collect(),
            Err(e) => {
                debug!("Could not list pages: {}", e);
                Vec::new()
            }
        }
    }

    /// Poll for a tab that was not in `known`. Platforms whose apply
    /// buttons open the external posting in a new tab use this to capture
    /// it. The captured page joins the tracked set.
    pub async fn wait_for_new_page(&self, known: &[TargetId], timeout: Duration) -> Option<Page> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let candidate = {
                let guard = self.browser.lock().await;
                let browser = guard.as_ref()?;
                match browser.pages().await {
                    Ok(pages) => pages
                        .into_iter()
                        .find(|p| !known.iter().any(|k| k == p.target_id())),
                    Err(_) => None,
                }
            };

            if let Some(page) = candidate {
                debug!("Captured new tab");
                self.worker_pages.lock().await.push(page.clone());
                return Some(page);
            }
            if tokio::time::Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    /// Close every tracked auxiliary page not present in `keep`. Drivers
    /// call this on a cadence so abandoned detail tabs do not pile up.
    pub async fn cleanup_orphan_pages(&self, keep: &[&Page]) {
        let mut tracked = self.worker_pages.lock().await;
        let keep_ids: Vec<TargetId> = keep.iter().map(|p| p.target_id().clone()).collect();

        let mut kept = Vec::new();
        let mut closed = 0usize;
        for page in tracked.drain(..) {
            if keep_ids.iter().any(|id| id == page.target_id()) {
                kept.push(page);
            } else {
                if let Err(e) = page.close().await {
                    debug!("Failed to close orphan page: {}", e);
                }
                closed += 1;
            }
        }
        *tracked = kept;

        if closed > 0 {
            debug!(closed, "Cleaned up orphan worker pages");
        }
    }

    /// Tear down the session. Idempotent, swallows errors. The browser
    /// process dies when the handle drops.
    pub async fn close(&self) {
        {
            let mut tracked = self.worker_pages.lock().await;
            for page in tracked.drain(..) {
                let _ = page.close().await;
            }
        }

        let mut guard = self.browser.lock().await;
        if guard.take().is_some() {
            debug!(platform = %self.platform, "Browser session closed");
        }
        self.handler_task.abort();
    }
}

async fn launch_local(settings: &BrowserSettings) -> Result<(Browser, JoinHandle<()>)> {
    let chrome_path = resolve_chrome_binary(settings)?;
    info!(
        chrome = %chrome_path.display(),
        headless = settings.headless,
        "Launching browser"
    );

    let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

    // with_head means NOT headless, confusingly
    if !settings.headless {
        builder = builder.with_head();
    }

    // Anti-detection launch flags
    builder = builder
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-infobars")
        .arg("--disable-dev-shm-usage")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--disable-background-networking")
        .arg("--disable-sync")
        .arg("--disable-translate")
        .arg("--metrics-recording-only")
        .arg("--safebrowsing-disable-auto-update")
        .arg("--window-size=1920,1080")
        .arg("--no-sandbox") // Often needed for headless in containers/restricted environments
        .arg("--disable-gpu") // Recommended for headless
        .arg("--disable-software-rasterizer");

    let config = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .context("Failed to launch browser")?;

    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    Ok((browser, handler_task))
}

/// Connect to a remote Chrome instance over DevTools.
async fn connect_remote(url: &str, settings: &BrowserSettings) -> Result<(Browser, JoinHandle<()>)> {
    info!("Connecting to remote browser at {}", url);

    let ws_url = if url.starts_with("ws") {
        url.to_string()
    } else {
        // Get the WebSocket URL from the /json/version endpoint
        let version_url = format!("{}/json/version", url.trim_end_matches('/'));
        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await
            .context("Failed to connect to remote browser")?
            .json()
            .await
            .context("Failed to parse browser version info")?;

        resp.get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("No webSocketDebuggerUrl in response"))?
            .to_string()
    };

    debug!("Connecting to WebSocket: {}", ws_url);

    let handler_config = chromiumoxide::handler::HandlerConfig {
        request_timeout: Duration::from_secs(settings.navigation_timeout_secs),
        ..Default::default()
    };

    let (browser, mut handler) = Browser::connect_with_config(ws_url, handler_config)
        .await
        .context("Failed to connect to remote browser")?;

    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    Ok((browser, handler_task))
}

fn resolve_chrome_binary(settings: &BrowserSettings) -> Result<PathBuf> {
    if let Some(ref configured) = settings.chrome_path {
        if configured.exists() {
            return Ok(configured.clone());
        }
        return Err(anyhow::anyhow!(
            "Configured Chrome binary does not exist: {}",
            configured.display()
        ));
    }

    if let Ok(env_path) = std::env::var("CHROME") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            info!("Using Chrome from CHROME env: {}", env_path);
            return Ok(path);
        }
    }

    for cmd in &[
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ] {
        if let Ok(path) = which::which(cmd) {
            info!("Found Chrome in PATH: {}", path.display());
            return Ok(path);
        }
    }

    for path in CHROME_PATHS {
        let candidate = std::path::Path::new(path);
        if candidate.exists() {
            info!("Found Chrome at: {}", path);
            return Ok(candidate.to_path_buf());
        }
    }

    Err(anyhow::anyhow!(
        "Chrome/Chromium not found. Please install it:\n\
         - Arch/Manjaro: sudo pacman -S chromium\n\
         - Ubuntu/Debian: sudo apt install chromium-browser\n\
         - Fedora: sudo dnf install chromium\n\
         - Or set chrome_path in the [browser] config section"
    ))
}
