//! Site strategies, one per supported board.
//!
//! Strategies only carry what genuinely differs between boards: search
//! URLs, card selectors, marker texts, and the shape of the apply
//! interaction. Everything else comes from the shared pipeline.

mod dice;
mod glassdoor;
mod indeed;
mod linkedin;
mod ziprecruiter;

pub use dice::Dice;
pub use glassdoor::Glassdoor;
pub use indeed::Indeed;
pub use linkedin::LinkedIn;
pub use ziprecruiter::ZipRecruiter;

use std::time::Duration;

use anyhow::Result;
use chromiumoxide::Page;
use scraper::{ElementRef, Selector};
use tracing::{debug, warn};
use url::Url;

use super::{DriverTuning, PlatformDriver};
use crate::models::Platform;

/// Build the driver for a platform with its configured tuning.
pub fn driver_for(platform: Platform, tuning: DriverTuning) -> Box<dyn PlatformDriver> {
    match platform {
        Platform::LinkedIn => Box::new(LinkedIn::new(tuning)),
        Platform::Indeed => Box::new(Indeed::new(tuning)),
        Platform::Glassdoor => Box::new(Glassdoor::new(tuning)),
        Platform::ZipRecruiter => Box::new(ZipRecruiter::new(tuning)),
        Platform::Dice => Box::new(Dice::new(tuning)),
    }
}

fn parse_selector(raw: &str) -> Option<Selector> {
    match Selector::parse(raw) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!("Invalid selector {:?}: {:?}", raw, e);
            None
        }
    }
}

/// Whitespace-collapsed text of an element.
fn collapse_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first descendant matching `raw`, if non-empty.
fn select_text(element: &ElementRef<'_>, raw: &str) -> Option<String> {
    let selector = parse_selector(raw)?;
    element
        .select(&selector)
        .next()
        .map(collapse_text)
        .filter(|text| !text.is_empty())
}

/// Attribute of the first descendant matching `raw`.
fn select_attr(element: &ElementRef<'_>, raw: &str, attr: &str) -> Option<String> {
    let selector = parse_selector(raw)?;
    element
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::to_string)
}

/// Resolve a card href against the board's base URL. Fragment and script
/// pseudo-links are dropped.
fn absolutize(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    Url::parse(base)
        .ok()?
        .join(href)
        .ok()
        .map(|url| url.to_string())
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    needles.iter().any(|needle| lower.contains(needle))
}

/// Click the first element matching any of `selectors`. Returns whether
/// anything was clicked.
async fn click_first(page: &Page, selectors: &[&str]) -> Result<bool> {
    let list = serde_json::to_string(selectors)?;
    let script = format!(
        r#"(() => {{
            const sels = {list};
            for (const s of sels) {{
                const el = document.querySelector(s);
                if (el) {{ el.click(); return true; }}
            }}
            return false;
        }})()"#
    );
    Ok(page
        .evaluate(script)
        .await?
        .into_value::<bool>()
        .unwrap_or(false))
}

/// Click the nth element matching `selector`.
async fn click_nth(page: &Page, selector: &str, index: usize) -> Result<bool> {
    let sel = serde_json::to_string(selector)?;
    let script = format!(
        r#"(() => {{
            const el = document.querySelectorAll({sel})[{index}];
            if (!el) return false;
            el.click();
            return true;
        }})()"#
    );
    Ok(page
        .evaluate(script)
        .await?
        .into_value::<bool>()
        .unwrap_or(false))
}

async fn count_elements(page: &Page, selector: &str) -> Result<u64> {
    let sel = serde_json::to_string(selector)?;
    let script = format!("document.querySelectorAll({sel}).length");
    Ok(page
        .evaluate(script)
        .await?
        .into_value::<u64>()
        .unwrap_or(0))
}

async fn eval_string(page: &Page, script: &str) -> Result<String> {
    Ok(page
        .evaluate(script.to_string())
        .await?
        .into_value::<String>()
        .unwrap_or_default())
}

/// Visible text of the first matching container, falling back to the whole
/// body when none of the preferred selectors carries content.
async fn detail_text(page: &Page, preferred: &[&str]) -> Result<String> {
    let list = serde_json::to_string(preferred)?;
    let script = format!(
        r#"(() => {{
            const sels = {list};
            for (const s of sels) {{
                const el = document.querySelector(s);
                if (el && el.innerText && el.innerText.trim().length > 0) return el.innerText;
            }}
            return document.body ? document.body.innerText : '';
        }})()"#
    );
    Ok(page
        .evaluate(script)
        .await?
        .into_value::<String>()
        .unwrap_or_default())
}

/// Poll a page until its URL leaves `origin_domain` and stops changing, or
/// the window closes. Returns the last URL observed.
async fn settle_external_redirect(
    page: &Page,
    origin_domain: &str,
    window: Duration,
) -> Option<String> {
    let deadline = tokio::time::Instant::now() + window;
    let mut last: Option<String> = None;
    loop {
        match page.url().await {
            Ok(Some(url)) => {
                let url = url.to_string();
                let settled = !url.contains(origin_domain) && last.as_deref() == Some(url.as_str());
                last = Some(url);
                if settled {
                    debug!(url = last.as_deref().unwrap_or(""), "Redirect settled");
                    return last;
                }
            }
            Ok(None) => {}
            Err(_) => return last,
        }
        if tokio::time::Instant::now() >= deadline {
            return last;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_absolutize_handles_relative_and_junk_hrefs() {
        assert_eq!(
            absolutize("https://www.dice.com", "/job-detail/abc123"),
            Some("https://www.dice.com/job-detail/abc123".to_string())
        );
        assert_eq!(
            absolutize("https://www.indeed.com", "https://ats.example.com/j/1"),
            Some("https://ats.example.com/j/1".to_string())
        );
        assert_eq!(absolutize("https://www.indeed.com", "#"), None);
        assert_eq!(absolutize("https://www.indeed.com", "javascript:void(0)"), None);
    }

    #[test]
    fn test_select_text_collapses_whitespace() {
        let html = Html::parse_fragment(
            "<div><h2 class=\"t\">  Senior \n  Engineer </h2><span class=\"c\"></span></div>",
        );
        let root = html.root_element();
        assert_eq!(select_text(&root, "h2.t"), Some("Senior Engineer".to_string()));
        // Empty matches are treated as absent.
        assert_eq!(select_text(&root, "span.c"), None);
        assert_eq!(select_text(&root, ".missing"), None);
    }

    #[test]
    fn test_contains_any_is_case_insensitive() {
        assert!(contains_any(
            "This Job Has EXPIRED on Indeed",
            &["job has expired"]
        ));
        assert!(!contains_any("open position", &["job has expired"]));
    }
}
