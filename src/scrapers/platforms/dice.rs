//! Dice job search strategy.
//!
//! The lightest of the boards: cards usually carry the employer's posting
//! URL directly, and when the detail page exposes an absolute external
//! apply link we read it off the DOM instead of clicking through.

use anyhow::Result;
use async_trait::async_trait;
use chromiumoxide::Page;
use scraper::Html;

use super::{
    absolutize, click_first, collapse_text, contains_any, detail_text, eval_string,
    parse_selector, select_attr, select_text, settle_external_redirect,
};
use crate::browser::BrowserSession;
use crate::models::Platform;
use crate::scrapers::{DriverTuning, JobCard, ListStyle, ResolvedDetail, SiteStrategy};

const BASE_URL: &str = "https://www.dice.com";
const CARD_SELECTOR: &str = "div.search-card, dhi-search-card";

const DETAIL_TEXT_SELECTORS: &[&str] = &["#jobDescription", "div.job-description"];
const APPLY_SELECTORS: &[&str] = &["#applyButton a", "a#applyButton", ".apply-button a"];
const EXPIRED_MARKERS: &[&str] = &[
    "this job is no longer available",
    "position has been filled",
];

/// Reads the external apply URL straight from the apply widget when the
/// page exposes one, so the happy path needs no click at all.
const APPLY_URL_PROBE: &str = r#"
    (() => {
        const wc = document.querySelector('apply-button-wc');
        if (wc) {
            const url = wc.getAttribute('url') || wc.getAttribute('apply-url');
            if (url) return url;
        }
        const link = document.querySelector('#applyButton a, a#applyButton, .apply-button a');
        if (link && link.href) return link.href;
        return '';
    })()
"#;

pub struct Dice {
    tuning: DriverTuning,
}

impl Dice {
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

        let probed = eval_string(worker, APPLY_URL_PROBE).await.unwrap_or_default();
        if probed.starts_with("http") && !probed.contains("dice.com") {
            return Ok(ResolvedDetail {
                final_url: probed,
                page_text,
                expired: false,
            });
        }

        let final_url = if click_first(worker, APPLY_SELECTORS).await? {
            settle_external_redirect(worker, "dice.com", self.settle_timeout())
                .await
                .unwrap_or_else(|| listing_url.to_string())
        } else {
            listing_url.to_string()
        };

        Ok(ResolvedDetail {
            final_url,
            page_text,
            expired: false,
        })
    }
}

#[async_trait]
impl SiteStrategy for Dice {
    fn platform(&self) -> Platform {
        Platform::Dice
    }

    fn tuning(&self) -> &DriverTuning {
        &self.tuning
    }

    fn list_style(&self) -> ListStyle {
        ListStyle::Paginated
    }

    fn search_url(&self, query: &str, page_index: u32) -> String {
        format!(
            "{BASE_URL}/jobs?q={}&filters.postedDate=SEVEN&filters.workplaceTypes=Remote&page={}",
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
            let Some(title) = select_text(&element, "a.card-title-link") else {
                continue;
            };

            let lower = collapse_text(element).to_lowercase();
            cards.push(JobCard {
                company: select_text(&element, "a[data-cy='search-result-company-name']")
                    .or_else(|| select_text(&element, ".search-result-company-name"))
                    .unwrap_or_default(),
                title,
                url: select_attr(&element, "a.card-title-link", "href")
                    .and_then(|href| absolutize(BASE_URL, &href)),
                posted_text: select_text(&element, "span.posted-date"),
                salary: select_text(&element, "span[data-cy='search-result-salary']"),
                location: select_text(&element, "span.search-result-location")
                    .or_else(|| select_text(&element, "span[data-cy='search-result-location']")),
                direct_apply: lower.contains("easy apply"),
                dom_index,
            });
        }
        cards
    }

    fn no_results_markers(&self) -> &'static [&'static str] {
        &["no results for your search", "0 jobs found"]
    }

    fn login_wall_markers(&self) -> &'static [&'static str] {
        &[]
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

        let worker = session.new_worker_page("dice-detail").await?;
        let result = self.resolve_in_worker(session, &worker, &listing_url).await;
        session.close_worker(worker).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD_HTML: &str = r#"
        <div id="searchDisplay">
          <div class="card search-card">
            <a class="card-title-link" href="/job-detail/9f1c2a">Platform Engineer</a>
            <a data-cy="search-result-company-name" href="/company/initech">Initech</a>
            <span class="search-result-location">Remote</span>
            <span data-cy="search-result-salary">$150,000 - $180,000</span>
            <span class="posted-date">Posted 4 days ago</span>
          </div>
          <div class="card search-card">
            <span>Sponsored</span>
          </div>
        </div>
    "#;

    #[test]
    fn test_extract_cards_requires_title_link() {
        let strategy = Dice::new(DriverTuning::default());
        let cards = strategy.extract_cards(CARD_HTML);
        assert_eq!(cards.len(), 1);

        let card = &cards[0];
        assert_eq!(card.title, "Platform Engineer");
        assert_eq!(card.company, "Initech");
        assert_eq!(
            card.url.as_deref(),
            Some("https://www.dice.com/job-detail/9f1c2a")
        );
        assert_eq!(card.posted_text.as_deref(), Some("Posted 4 days ago"));
        assert_eq!(card.salary.as_deref(), Some("$150,000 - $180,000"));
        assert!(!card.direct_apply);
    }

    #[test]
    fn test_search_url_is_one_based() {
        let strategy = Dice::new(DriverTuning::default());
        assert!(strategy.search_url("rust", 0).ends_with("page=1"));
        assert!(strategy.search_url("rust", 4).ends_with("page=5"));
    }
}
