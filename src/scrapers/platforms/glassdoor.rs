//! Glassdoor job search strategy.
//!
//! Paginated results with data-test attributed cards. Glassdoor loves
//! throwing a sign-up overlay over everything, so the detail flow closes
//! popups before reading, and the apply button raises a modal that has to
//! be clicked through before the external redirect starts.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chromiumoxide::Page;
use scraper::Html;

use super::{
    absolutize, click_first, collapse_text, contains_any, detail_text, parse_selector,
    select_attr, select_text, settle_external_redirect,
};
use crate::browser::BrowserSession;
use crate::models::Platform;
use crate::scrapers::{DriverTuning, JobCard, ListStyle, ResolvedDetail, SiteStrategy};

const BASE_URL: &str = "https://www.glassdoor.com";
const CARD_SELECTOR: &str = "li[data-test='jobListing']";

const POPUP_CLOSE_SELECTORS: &[&str] = &[
    "button.CloseButton",
    "[data-test='job-alert-modal-close']",
    "span[alt='Close']",
];
const DETAIL_TEXT_SELECTORS: &[&str] = &[
    "div[class*='JobDetails_jobDescription']",
    "#JobDescriptionContainer",
    ".desc",
];
const APPLY_SELECTORS: &[&str] = &[
    "button[data-test='applyButton']",
    "[data-test='apply-button']",
];
const MODAL_CONTINUE_SELECTORS: &[&str] = &[
    "button[data-test='continue-apply']",
    "a[data-test='applyExternal']",
    "div[data-test='modal'] a[target='_blank']",
];
const EXPIRED_MARKERS: &[&str] = &["no longer available", "this job has expired"];

pub struct Glassdoor {
    tuning: DriverTuning,
}

impl Glassdoor {
    pub fn new(tuning: DriverTuning) -> Self {
        Self { tuning }
    }

    async fn resolve_in_worker(
        &self,
        session: &BrowserSession,
        worker: &Page,
        listing_url: &str,
    ) -> Result<ResolvedDetail> {
        session.navigate(worker, listing_url).await?;

        if click_first(worker, POPUP_CLOSE_SELECTORS).await? {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        let page_text = detail_text(worker, DETAIL_TEXT_SELECTORS).await?;
        if contains_any(&page_text, EXPIRED_MARKERS) {
            return Ok(ResolvedDetail {
                final_url: listing_url.to_string(),
                page_text,
                expired: true,
            });
        }

        let known = session.known_targets().await;
        if !click_first(worker, APPLY_SELECTORS).await? {
            return Ok(ResolvedDetail {
                final_url: listing_url.to_string(),
                page_text,
                expired: false,
            });
        }

        // The apply modal interposes before anything navigates; click it
        // through, then watch for either a spawned tab or a same-tab hop.
        tokio::time::sleep(Duration::from_millis(1000)).await;
        click_first(worker, MODAL_CONTINUE_SELECTORS).await?;

        let final_url = match session.wait_for_new_page(&known, Duration::from_secs(5)).await {
            Some(tab) => {
                let url = settle_external_redirect(&tab, "glassdoor.com", self.settle_timeout())
                    .await
                    .unwrap_or_else(|| listing_url.to_string());
                session.close_worker(tab).await;
                url
            }
            None => settle_external_redirect(worker, "glassdoor.com", self.settle_timeout())
                .await
                .unwrap_or_else(|| listing_url.to_string()),
        };

        Ok(ResolvedDetail {
            final_url,
            page_text,
            expired: false,
        })
    }
}

#[async_trait]
impl SiteStrategy for Glassdoor {
    fn platform(&self) -> Platform {
        Platform::Glassdoor
    }

    fn tuning(&self) -> &DriverTuning {
        &self.tuning
    }

    fn list_style(&self) -> ListStyle {
        ListStyle::Paginated
    }

    fn search_url(&self, query: &str, page_index: u32) -> String {
        format!(
            "{BASE_URL}/Job/jobs.htm?sc.keyword={}&locT=S&locKeyword=Remote&fromAge=7&p={}",
            urlencoding::encode(query),
            page_index + 1
        )
    }

    fn extract_cards(&self, html: &str) -> Vec<JobCard> {
        let document = Html::parse_document(html);
        let Some(card_selector) = parse_selector(CARD_SELECTOR) else {
            return Vec::new();
        };

        let mut cards = Vec::new();
        for (dom_index, element) in document.select(&card_selector).enumerate() {
            let Some(title) = select_text(&element, "a[data-test='job-title']") else {
                continue;
            };

            let card_text = collapse_text(element);
            cards.push(JobCard {
                company: select_text(&element, "span[class*='compactEmployerName']")
                    .unwrap_or_default(),
                title,
                url: select_attr(&element, "a[data-test='job-title']", "href")
                    .and_then(|href| absolutize(BASE_URL, &href)),
                posted_text: select_text(&element, "div[data-test='job-age']"),
                salary: select_text(&element, "div[data-test='detailSalary']"),
                location: select_text(&element, "div[data-test='emp-location']"),
                direct_apply: card_text.to_lowercase().contains("easy apply"),
                dom_index,
            });
        }
        cards
    }

    fn no_results_markers(&self) -> &'static [&'static str] {
        &["no jobs found matching", "there are no jobs"]
    }

    fn login_wall_markers(&self) -> &'static [&'static str] {
        &["create an account or sign in", "sign in or create an account"]
    }

    fn settle_timeout(&self) -> Duration {
        Duration::from_secs(15)
    }

    async fn resolve_application(
        &self,
        session: &BrowserSession,
        card: &JobCard,
    ) -> Result<ResolvedDetail> {
        let listing_url = card
            .url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("card exposes no listing URL"))?;

        let worker = session.new_worker_page("glassdoor-detail").await?;
        let result = self.resolve_in_worker(session, &worker, &listing_url).await;
        session.close_worker(worker).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD_HTML: &str = r#"
        <ul>
          <li data-test="jobListing">
            <a data-test="job-title" href="/job-listing/platform-engineer-hooli-JV_KO0,17.htm">Platform Engineer</a>
            <span class="EmployerProfile_compactEmployerName__abc12">Hooli</span>
            <div data-test="emp-location">Remote, USA</div>
            <div data-test="detailSalary">$150K - $190K (Employer est.)</div>
            <div data-test="job-age">5d</div>
            <button>Easy Apply</button>
          </li>
        </ul>
    "#;

    #[test]
    fn test_extract_cards_reads_data_test_fields() {
        let strategy = Glassdoor::new(DriverTuning::default());
        let cards = strategy.extract_cards(CARD_HTML);
        assert_eq!(cards.len(), 1);

        let card = &cards[0];
        assert_eq!(card.title, "Platform Engineer");
        assert_eq!(card.company, "Hooli");
        assert_eq!(card.location.as_deref(), Some("Remote, USA"));
        assert_eq!(card.salary.as_deref(), Some("$150K - $190K (Employer est.)"));
        assert_eq!(card.posted_text.as_deref(), Some("5d"));
        assert!(card.direct_apply);
        assert!(card
            .url
            .as_deref()
            .unwrap()
            .starts_with("https://www.glassdoor.com/job-listing/"));
    }

    #[test]
    fn test_search_url_is_one_based() {
        let strategy = Glassdoor::new(DriverTuning::default());
        assert!(strategy.search_url("sre", 0).ends_with("&p=1"));
        assert!(strategy.search_url("sre", 4).ends_with("&p=5"));
    }
}
