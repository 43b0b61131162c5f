//! LinkedIn job search strategy.
//!
//! The search results behave like a feed: dismissing a card makes the list
//! re-rank and backfill, so the pipeline reads the first card repeatedly
//! and this strategy dismisses each one after processing. The apply button
//! opens the external posting in a new tab, captured by diffing the
//! browser's target list.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use scraper::Html;
use tracing::debug;

use super::{
    absolutize, click_first, click_nth, collapse_text, contains_any, detail_text, parse_selector,
    select_attr, select_text, settle_external_redirect,
};
use crate::browser::BrowserSession;
use crate::models::Platform;
use crate::scrapers::{DriverTuning, JobCard, ListStyle, ResolvedDetail, SiteStrategy};

const BASE_URL: &str = "https://www.linkedin.com";
const CARD_SELECTOR: &str = "div.job-card-container";
const CARD_LINK_SELECTOR: &str = "a.job-card-container__link, a.job-card-list__title";
const DISMISS_SELECTOR: &str =
    "button[aria-label*='Dismiss'], button.job-card-container__action-small";

const SHOW_MORE_SELECTORS: &[&str] = &[
    "button.show-more-less-html__button",
    ".jobs-description__footer-button",
    "button[aria-label*='Show more']",
];
const DETAIL_TEXT_SELECTORS: &[&str] = &[
    ".jobs-description__content",
    ".jobs-box__html-content",
    "div.jobs-description-content__text",
    "#job-details",
];
const APPLY_SELECTORS: &[&str] = &[
    "button.jobs-apply-button",
    "div.jobs-apply-button--top-card button",
];
const EXPIRED_MARKERS: &[&str] = &["no longer accepting applications"];

pub struct LinkedIn {
    tuning: DriverTuning,
}

impl LinkedIn {
    pub fn new(tuning: DriverTuning) -> Self {
        Self { tuning }
    }
}

#[async_trait]
impl SiteStrategy for LinkedIn {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    fn tuning(&self) -> &DriverTuning {
        &self.tuning
    }

    fn list_style(&self) -> ListStyle {
        ListStyle::Feed
    }

    fn search_url(&self, query: &str, _page_index: u32) -> String {
        // f_WT=2 restricts to remote, f_TPR=r604800 to the past week.
        format!(
            "{BASE_URL}/jobs/search/?keywords={}&f_WT=2&f_TPR=r604800&sortBy=DD",
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
            let title = select_text(&element, CARD_LINK_SELECTOR)
                .or_else(|| select_text(&element, ".job-card-list__title"));
            let Some(title) = title else { continue };

            let company = select_text(&element, ".job-card-container__primary-description")
                .or_else(|| select_text(&element, ".artdeco-entity-lockup__subtitle"))
                .unwrap_or_default();

            let card_text = collapse_text(element);
            cards.push(JobCard {
                company,
                title,
                url: select_attr(&element, CARD_LINK_SELECTOR, "href")
                    .and_then(|href| absolutize(BASE_URL, &href)),
                posted_text: select_text(&element, "time"),
                salary: select_text(&element, ".job-card-container__metadata-item--salary"),
                location: select_text(&element, ".job-card-container__metadata-item"),
                direct_apply: card_text.to_lowercase().contains("easy apply"),
                dom_index,
            });
        }
        cards
    }

    fn no_results_markers(&self) -> &'static [&'static str] {
        &["no matching jobs found", "couldn't find any jobs"]
    }

    fn login_wall_markers(&self) -> &'static [&'static str] {
        &[
            "sign in to continue",
            "join linkedin",
            "quick security check",
        ]
    }

    fn settle_timeout(&self) -> Duration {
        Duration::from_secs(20)
    }

    async fn resolve_application(
        &self,
        session: &BrowserSession,
        card: &JobCard,
    ) -> Result<ResolvedDetail> {
        let page = session.page();
        let listing_url = match card.url.clone() {
            Some(url) => url,
            None => session
                .navigate(page, &self.search_url(&self.tuning.query, 0))
                .await?,
        };

        // Open the detail rail by clicking the card in place.
        if !click_nth(page, CARD_LINK_SELECTOR, card.dom_index).await? {
            return Err(anyhow::anyhow!("card link not clickable"));
        }
        session.wait_for_selector(page, ".jobs-description__content").await;
        tokio::time::sleep(Duration::from_millis(1500)).await;

        if click_first(page, SHOW_MORE_SELECTORS).await? {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        let page_text = detail_text(page, DETAIL_TEXT_SELECTORS).await?;
        if contains_any(&page_text, EXPIRED_MARKERS) {
            return Ok(ResolvedDetail {
                final_url: listing_url,
                page_text,
                expired: true,
            });
        }

        // The apply button spawns a tab for external postings. Snapshot
        // the targets first so the new one is identifiable.
        let known = session.known_targets().await;
        if !click_first(page, APPLY_SELECTORS).await? {
            debug!("No apply button on detail rail, keeping listing URL");
            return Ok(ResolvedDetail {
                final_url: listing_url,
                page_text,
                expired: false,
            });
        }

        match session.wait_for_new_page(&known, self.settle_timeout()).await {
            Some(tab) => {
                let final_url = settle_external_redirect(&tab, "linkedin.com", self.settle_timeout())
                    .await
                    .unwrap_or_else(|| listing_url.clone());
                session.close_worker(tab).await;
                Ok(ResolvedDetail {
                    final_url,
                    page_text,
                    expired: false,
                })
            }
            None => {
                // Easy Apply variants and some promoted posts stay in
                // place; the listing URL is the best we have.
                debug!("Apply click spawned no tab, keeping listing URL");
                Ok(ResolvedDetail {
                    final_url: listing_url,
                    page_text,
                    expired: false,
                })
            }
        }
    }

    async fn advance_feed(&self, session: &BrowserSession, card: &JobCard) -> Result<()> {
        let page = session.page();
        if !click_nth(page, DISMISS_SELECTOR, card.dom_index).await? {
            return Err(anyhow::anyhow!("dismiss control not found"));
        }
        // Let the feed re-rank before the next read.
        tokio::time::sleep(Duration::from_millis(1200)).await;
        Ok(())
    }
}
