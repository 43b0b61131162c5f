//! ZipRecruiter job search strategy.
//!
//! One continuously growing results page instead of numbered pages: the
//! pipeline keeps processing whatever has scrolled in, and `load_more`
//! scrolls to the bottom (clicking the occasional "Load More" button) and
//! reports whether the card count grew. "1-Click Apply" postings are the
//! board's in-platform flow and get flagged on the card.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chromiumoxide::Page;
use scraper::Html;

use super::{
    absolutize, click_first, collapse_text, contains_any, count_elements, detail_text,
    parse_selector, select_attr, select_text, settle_external_redirect,
};
use crate::browser::BrowserSession;
use crate::models::Platform;
use crate::scrapers::{DriverTuning, JobCard, ListStyle, ResolvedDetail, SiteStrategy};

const BASE_URL: &str = "https://www.ziprecruiter.com";
const CARD_SELECTOR: &str = "article[class*='job_result'], div.job_content";

const LOAD_MORE_SELECTORS: &[&str] = &["button[title='Load More']", "a.load_more_jobs"];
const DETAIL_TEXT_SELECTORS: &[&str] = &["div.job_description", "div[class*='job_details']"];
const APPLY_SELECTORS: &[&str] = &[
    "a[class*='apply_button']",
    "button[class*='apply']",
    "a.job_apply",
];
const EXPIRED_MARKERS: &[&str] = &["no longer available", "position has been filled"];

pub struct ZipRecruiter {
    tuning: DriverTuning,
}

impl ZipRecruiter {
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

        let final_url = match session.wait_for_new_page(&known, Duration::from_secs(5)).await {
            Some(tab) => {
                let url =
                    settle_external_redirect(&tab, "ziprecruiter.com", self.settle_timeout())
                        .await
                        .unwrap_or_else(|| listing_url.to_string());
                session.close_worker(tab).await;
                url
            }
            None => settle_external_redirect(worker, "ziprecruiter.com", self.settle_timeout())
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
impl SiteStrategy for ZipRecruiter {
    fn platform(&self) -> Platform {
        Platform::ZipRecruiter
    }

    fn tuning(&self) -> &DriverTuning {
        &self.tuning
    }

    fn list_style(&self) -> ListStyle {
        ListStyle::InfiniteScroll
    }

    fn search_url(&self, query: &str, _page_index: u32) -> String {
        format!(
            "{BASE_URL}/jobs-search?search={}&location=Remote&days=7",
            urlencoding::encode(query)
        )
    }

    fn extract_cards(&self, html: &str) -> Vec<JobCard> {
        let document = Html::parse_document(html);
        let Some(card_selector) = parse_selector(CARD_SELECTOR) else {
            return Vec::new();
        };

        let mut cards = Vec::new();
        for (dom_index, element) in document.select(&card_selector).enumerate() {
            let title = select_text(&element, "h2[class*='title'] a")
                .or_else(|| select_text(&element, "a.job_link"));
            let Some(title) = title else { continue };

            let card_text = collapse_text(element);
            let lower = card_text.to_lowercase();
            cards.push(JobCard {
                company: select_text(&element, "a[class*='company_name']")
                    .or_else(|| select_text(&element, ".hiring_company_text"))
                    .unwrap_or_default(),
                title,
                url: select_attr(&element, "h2[class*='title'] a", "href")
                    .or_else(|| select_attr(&element, "a.job_link", "href"))
                    .and_then(|href| absolutize(BASE_URL, &href)),
                posted_text: select_text(&element, "time")
                    .or_else(|| select_text(&element, "p[class*='posted']")),
                salary: select_text(&element, "p[class*='salary']")
                    .filter(|text| text.contains('$')),
                location: select_text(&element, "p[class*='location']")
                    .or_else(|| select_text(&element, ".location")),
                direct_apply: lower.contains("1-click apply") || lower.contains("quick apply"),
                dom_index,
            });
        }
        cards
    }

    fn no_results_markers(&self) -> &'static [&'static str] {
        &["no results found", "we didn't find any jobs"]
    }

    fn login_wall_markers(&self) -> &'static [&'static str] {
        &["verify your email to continue"]
    }

    fn settle_timeout(&self) -> Duration {
        Duration::from_secs(10)
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

        let worker = session.new_worker_page("ziprecruiter-detail").await?;
        let result = self.resolve_in_worker(session, &worker, &listing_url).await;
        session.close_worker(worker).await;
        result
    }

    async fn load_more(&self, session: &BrowserSession) -> Result<bool> {
        let page = session.page();
        let before = count_elements(page, CARD_SELECTOR).await?;

        page.evaluate("window.scrollTo(0, document.body.scrollHeight)".to_string())
            .await?;
        tokio::time::sleep(Duration::from_secs(2)).await;

        // Some layouts gate further results behind a button instead of
        // loading on scroll alone.
        if click_first(page, LOAD_MORE_SELECTORS).await? {
            tokio::time::sleep(Duration::from_secs(2)).await;
        }

        let after = count_elements(page, CARD_SELECTOR).await?;
        Ok(after > before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD_HTML: &str = r#"
        <div id="results">
          <article class="job_result_two_pane job_result">
            <h2 class="title_container"><a class="job_link" href="/jobs/acme-1234/senior-engineer">Senior Engineer</a></h2>
            <a class="company_name_link company_name" href="/c/acme">Acme Corp</a>
            <p class="location_text location">Remote (USA)</p>
            <p class="salary_text salary">$70 an hour</p>
            <button class="one_click_apply">1-Click Apply</button>
          </article>
          <div class="job_content">
            <h2 class="title"><a href="/jobs/globex-9/data-engineer">Data Engineer</a></h2>
            <span class="hiring_company_text">Globex</span>
          </div>
        </div>
    "#;

    #[test]
    fn test_extract_cards_flags_one_click_apply() {
        let strategy = ZipRecruiter::new(DriverTuning::default());
        let cards = strategy.extract_cards(CARD_HTML);
        assert_eq!(cards.len(), 2);

        assert_eq!(cards[0].title, "Senior Engineer");
        assert_eq!(cards[0].company, "Acme Corp");
        assert_eq!(cards[0].salary.as_deref(), Some("$70 an hour"));
        assert!(cards[0].direct_apply);
        assert_eq!(
            cards[0].url.as_deref(),
            Some("https://www.ziprecruiter.com/jobs/acme-1234/senior-engineer")
        );

        assert_eq!(cards[1].title, "Data Engineer");
        assert_eq!(cards[1].company, "Globex");
        assert!(!cards[1].direct_apply);
    }

    #[test]
    fn test_search_url_ignores_page_index() {
        let strategy = ZipRecruiter::new(DriverTuning::default());
        assert_eq!(
            strategy.search_url("rust", 0),
            strategy.search_url("rust", 7)
        );
    }
}
