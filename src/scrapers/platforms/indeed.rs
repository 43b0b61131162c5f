//! Indeed job search strategy.
//!
//! Classic pagination through the `start` query parameter, ten results per
//! page. Cards carry inline salary snippets that feed the cheap pre-check.
//! The external apply flow usually rides a same-tab redirect chain through
//! Indeed's click tracker to the employer's ATS.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chromiumoxide::Page;
use scraper::Html;

use super::{
    absolutize, click_first, collapse_text, contains_any, detail_text, parse_selector,
    select_attr, select_text, settle_external_redirect,
};
use crate::browser::{attempt_evasion, detect_bot_challenge, BrowserSession};
use crate::models::Platform;
use crate::scrapers::{DriverTuning, JobCard, ListStyle, ResolvedDetail, SiteStrategy};

const BASE_URL: &str = "https://www.indeed.com";
const CARD_SELECTOR: &str = "div.job_seen_beacon";
const RESULTS_PER_PAGE: u32 = 10;

const DETAIL_TEXT_SELECTORS: &[&str] = &[
    "#jobDescriptionText",
    ".jobsearch-JobComponent-description",
];
const APPLY_SELECTORS: &[&str] = &[
    "#applyButtonLinkContainer a",
    "#viewJobButtonLinkContainer a",
    "a[aria-label*='company site']",
];
const EXPIRED_MARKERS: &[&str] = &["this job has expired", "job has expired on indeed"];

pub struct Indeed {
    tuning: DriverTuning,
}

impl Indeed {
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

        // Detail pages sit behind the same Cloudflare front as the list.
        if detect_bot_challenge(worker).await {
            attempt_evasion(worker).await;
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

        // Some employers open a tab, most redirect the worker page itself.
        let final_url = match session.wait_for_new_page(&known, Duration::from_secs(5)).await {
            Some(tab) => {
                let url = settle_external_redirect(&tab, "indeed.com", self.settle_timeout())
                    .await
                    .unwrap_or_else(|| listing_url.to_string());
                session.close_worker(tab).await;
                url
            }
            None => settle_external_redirect(worker, "indeed.com", self.settle_timeout())
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
impl SiteStrategy for Indeed {
    fn platform(&self) -> Platform {
        Platform::Indeed
    }

    fn tuning(&self) -> &DriverTuning {
        &self.tuning
    }

    fn list_style(&self) -> ListStyle {
        ListStyle::Paginated
    }

    fn search_url(&self, query: &str, page_index: u32) -> String {
        format!(
            "{BASE_URL}/jobs?q={}&l=Remote&fromage=7&sort=date&start={}",
            urlencoding::encode(query),
            page_index * RESULTS_PER_PAGE
        )
    }

    fn extract_cards(&self, html: &str) -> Vec<JobCard> {
        let document = Html::parse_document(html);
        let Some(card_selector) = parse_selector(CARD_SELECTOR) else {
            return Vec::new();
        };

        let mut cards = Vec::new();
        for (dom_index, element) in document.select(&card_selector).enumerate() {
            let title = select_text(&element, "h2.jobTitle span[title]")
                .or_else(|| select_text(&element, "h2.jobTitle"));
            let Some(title) = title else { continue };

            let salary = select_text(&element, "div[data-testid='attribute_snippet_testid']")
                .or_else(|| select_text(&element, ".salary-snippet-container"))
                .filter(|text| text.contains('$'));

            let card_text = collapse_text(element);
            cards.push(JobCard {
                company: select_text(&element, "span[data-testid='company-name']")
                    .unwrap_or_default(),
                title,
                url: select_attr(&element, "h2.jobTitle a", "href")
                    .and_then(|href| absolutize(BASE_URL, &href)),
                posted_text: select_text(&element, "span[data-testid='myJobsStateDate']")
                    .or_else(|| select_text(&element, "span.date")),
                salary,
                location: select_text(&element, "div[data-testid='text-location']"),
                direct_apply: card_text.to_lowercase().contains("easily apply"),
                dom_index,
            });
        }
        cards
    }

    fn no_results_markers(&self) -> &'static [&'static str] {
        &["did not match any jobs"]
    }

    fn login_wall_markers(&self) -> &'static [&'static str] {
        &[]
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

        let worker = session.new_worker_page("indeed-detail").await?;
        let result = self.resolve_in_worker(session, &worker, &listing_url).await;
        session.close_worker(worker).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD_HTML: &str = r#"
        <div id="mosaic-jobResults">
          <div class="job_seen_beacon">
            <h2 class="jobTitle"><a href="/rc/clk?jk=abc123"><span title="Backend Engineer">Backend Engineer</span></a></h2>
            <span data-testid="company-name">Initech</span>
            <div data-testid="text-location">Remote in Austin, TX</div>
            <div data-testid="attribute_snippet_testid">$140,000 - $180,000 a year</div>
            <span data-testid="myJobsStateDate">Posted 3 days ago</span>
          </div>
          <div class="job_seen_beacon">
            <h2 class="jobTitle"><a href="/rc/clk?jk=def456"><span title="QA Lead">QA Lead</span></a></h2>
            <span data-testid="company-name">Globex</span>
            <div data-testid="text-location">Remote</div>
            <div data-testid="attribute_snippet_testid">Full-time</div>
            <span class="indeedApply">Easily apply</span>
          </div>
        </div>
    "#;

    #[test]
    fn test_extract_cards_reads_salary_and_direct_apply() {
        let strategy = Indeed::new(DriverTuning::default());
        let cards = strategy.extract_cards(CARD_HTML);
        assert_eq!(cards.len(), 2);

        assert_eq!(cards[0].title, "Backend Engineer");
        assert_eq!(cards[0].company, "Initech");
        assert_eq!(
            cards[0].salary.as_deref(),
            Some("$140,000 - $180,000 a year")
        );
        assert_eq!(cards[0].posted_text.as_deref(), Some("Posted 3 days ago"));
        assert_eq!(
            cards[0].url.as_deref(),
            Some("https://www.indeed.com/rc/clk?jk=abc123")
        );
        assert!(!cards[0].direct_apply);

        // Non-salary snippets are not mistaken for pay, and the in-platform
        // apply badge is flagged.
        assert_eq!(cards[1].salary, None);
        assert!(cards[1].direct_apply);
        assert_eq!(cards[1].dom_index, 1);
    }

    #[test]
    fn test_search_url_paginates_by_ten() {
        let strategy = Indeed::new(DriverTuning::default());
        assert!(strategy.search_url("rust developer", 0).contains("start=0"));
        assert!(strategy.search_url("rust developer", 3).contains("start=30"));
        assert!(strategy
            .search_url("rust developer", 0)
            .contains("q=rust%20developer"));
    }
}
