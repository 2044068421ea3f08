//! Marketplace listing scraper.
//!
//! Discovers the offers for one release: cache first, then an admitted
//! browser session with anti-bot posture, then selector-chain extraction.
//! Every outcome is a typed [`ScrapeOutcome`]; nothing is thrown.

use crate::admission::AdmissionControl;
use crate::cache::{cache_key, TtlCache};
use crate::error::{MarketError, Result};
use crate::gate::ScrapingGate;
use crate::selectors::{element_text, ListingSelectors};
use digger_browser::{BrowserError, PageSession, SessionFactory};
use digger_core::{
    Classify, CountryCode, ErrorKind, ErrorLog, ErrorRecord, Offer, ReleaseId, RetryPolicy,
    ScraperConfig, UNKNOWN_SHIPPING,
};
use regex::Regex;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Platform name used in error records.
pub const PLATFORM: &str = "Discogs Marketplace";

/// Markers of a captcha or challenge page, lower case.
const BOT_WALL_MARKERS: &[&str] = &[
    "g-recaptcha",
    "h-captcha",
    "cf-challenge",
    "challenge-platform",
    "px-captcha",
    "verify you are human",
    "are you a robot",
];

/// Status of a listing scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeStatus {
    /// Offers were read, or served from the cache
    Success,
    /// The listing page loaded but held no offers
    NoOffersFound,
    /// The listing page did not load in time
    TimeoutError,
    /// Any other failure while scraping
    ScrapingError,
    /// Invalid input; nothing was fetched
    Error,
}

impl ScrapeStatus {
    /// Wire name of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NoOffersFound => "no_offers_found",
            Self::TimeoutError => "timeout_error",
            Self::ScrapingError => "scraping_error",
            Self::Error => "error",
        }
    }
}

/// Result of [`ListingScraper::scrape_offers`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeOutcome {
    /// Offers in listing order, empty unless `status` is success
    pub offers: Vec<Offer>,
    /// How the scrape ended
    pub status: ScrapeStatus,
    /// Classified failure, for every status but success and no offers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}

impl ScrapeOutcome {
    fn success(offers: Vec<Offer>) -> Self {
        Self {
            offers,
            status: ScrapeStatus::Success,
            error: None,
        }
    }

    fn failed(status: ScrapeStatus, record: ErrorRecord) -> Self {
        Self {
            offers: Vec::new(),
            status,
            error: Some(record),
        }
    }
}

fn item_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/sell/item/(\d+)").expect("valid item path regex"))
}

fn item_url(base: &str, id: &str) -> String {
    format!("{}/sell/item/{id}", base.trim_end_matches('/'))
}

fn is_numeric_id(value: &str) -> bool {
    value.len() >= 4 && value.chars().all(|c| c.is_ascii_digit())
}

/// Detail-page URL for one listing row.
///
/// Strategies, in order: the add-to-cart control's item id, an anchor to
/// the item page, a form posting to the item page, any numeric id-like
/// attribute on the row. Empty when none applies.
#[must_use]
pub fn resolve_offer_url(row: &ElementRef, selectors: &ListingSelectors, base: &str) -> String {
    if let Some(id) = selectors
        .cart_button
        .first(row)
        .and_then(|el| el.value().attr("data-item-id"))
        .filter(|id| is_numeric_id(id))
    {
        return item_url(base, id);
    }

    for (css, attr) in [("a[href]", "href"), ("form[action]", "action")] {
        let Ok(selector) = scraper::Selector::parse(css) else {
            continue;
        };
        let found = row
            .select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .find_map(|target| item_path_re().captures(target));
        if let Some(captures) = found {
            return item_url(base, &captures[1]);
        }
    }

    let id_like = std::iter::once(*row)
        .chain(row.descendants().filter_map(ElementRef::wrap))
        .flat_map(|el| el.value().attrs().collect::<Vec<_>>())
        .find(|(name, value)| {
            let name = name.to_ascii_lowercase();
            (name == "id" || (name.starts_with("data-") && name.ends_with("id")))
                && is_numeric_id(value)
        });
    if let Some((_, id)) = id_like {
        return item_url(base, id);
    }

    String::new()
}

fn clean_country(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .split_once(':')
        .map_or(trimmed, |(_, rest)| rest.trim())
        .to_string()
}

/// Captcha or challenge page served instead of the listing.
#[must_use]
pub fn is_bot_wall(html: &str) -> bool {
    let lower = html.to_lowercase();
    BOT_WALL_MARKERS.iter().any(|m| lower.contains(m))
}

/// Extract up to `max_offers` offers from a listing page.
///
/// Rows without a price are skipped. A row without shipping gets
/// [`UNKNOWN_SHIPPING`] so enrichment picks it up. A page whose offers
/// container shows prices while no row selector matches is a
/// [`MarketError::StructureChanged`], not an empty listing.
pub fn parse_offers(
    html: &str,
    selectors: &ListingSelectors,
    base: &str,
    max_offers: usize,
) -> Result<Vec<Offer>> {
    if is_bot_wall(html) {
        return Err(MarketError::BotBlocked(base.to_string()));
    }
    let document = Html::parse_document(html);
    let rows = selectors.rows.select_all(&document);

    if rows.is_empty() {
        let priced_container = selectors
            .container
            .first(&document.root_element())
            .is_some_and(|container| selectors.price.first(&container).is_some());
        if priced_container {
            return Err(MarketError::StructureChanged(format!(
                "offers container at {base} has prices but no row selector matches"
            )));
        }
    }

    let mut offers = Vec::new();
    for row in rows {
        if offers.len() >= max_offers {
            break;
        }
        let Some(price) = selectors.price.text(&row) else {
            tracing::trace!("skipping row without price: {}", element_text(&row));
            continue;
        };

        let mut offer = Offer::new(
            selectors.seller.text(&row).unwrap_or_default(),
            selectors.condition.text(&row).unwrap_or_default(),
            price,
            selectors
                .shipping
                .text(&row)
                .unwrap_or_else(|| UNKNOWN_SHIPPING.to_string()),
            resolve_offer_url(&row, selectors, base),
        );
        offer.country = selectors.country.text(&row).map(|c| clean_country(&c));
        offers.push(offer);
    }
    Ok(offers)
}

/// Discovers marketplace offers for one release.
pub struct ListingScraper {
    config: ScraperConfig,
    sessions: Arc<dyn SessionFactory>,
    cache: TtlCache<Vec<Offer>>,
    admission: AdmissionControl,
    selectors: ListingSelectors,
    retry: RetryPolicy,
    gate: Arc<ScrapingGate>,
    error_log: Arc<ErrorLog>,
}

impl ListingScraper {
    /// Build a scraper over `sessions`. The cache, admission ceiling and
    /// retry budget all come from `config`.
    #[must_use]
    pub fn new(
        config: ScraperConfig,
        sessions: Arc<dyn SessionFactory>,
        gate: Arc<ScrapingGate>,
        error_log: Arc<ErrorLog>,
    ) -> Self {
        let admission = AdmissionControl::new(
            config.max_concurrent_sessions,
            Duration::from_millis(config.admission_wait_min_ms),
            Duration::from_millis(config.admission_wait_max_ms),
        );
        let retry = RetryPolicy::new(config.max_retries.saturating_add(1))
            .with_base_delay(config.delay_range().0);

        Self {
            cache: TtlCache::new(config.cache_ttl()),
            admission,
            selectors: ListingSelectors::default(),
            retry,
            config,
            sessions,
            gate,
            error_log,
        }
    }

    /// Replace the selector chains.
    #[must_use]
    pub fn with_selectors(mut self, selectors: ListingSelectors) -> Self {
        self.selectors = selectors;
        self
    }

    /// Listing cache, keyed by [`cache_key`].
    #[must_use]
    pub fn cache(&self) -> &TtlCache<Vec<Offer>> {
        &self.cache
    }

    /// Session admission counter.
    #[must_use]
    pub fn admission(&self) -> &AdmissionControl {
        &self.admission
    }

    fn listing_url(&self, release: &ReleaseId, country: &CountryCode) -> String {
        format!(
            "{}/sell/release/{}?sort=price%2Casc&ships_to={}",
            self.config.marketplace_url.trim_end_matches('/'),
            release.as_str(),
            country.as_str()
        )
    }

    fn fail(&self, status: ScrapeStatus, error: &MarketError, release_id: &str) -> ScrapeOutcome {
        let record = error
            .to_record(PLATFORM)
            .with_detail("release_id", release_id);
        self.error_log.record(&record);
        ScrapeOutcome::failed(status, record)
    }

    /// Scrape up to `max_offers` offers for `release_id` as seen from
    /// `country`. A `max_offers` of zero means the configured maximum.
    pub async fn scrape_offers(
        &self,
        release_id: &str,
        max_offers: usize,
        country: &str,
    ) -> ScrapeOutcome {
        let (release, country) = match (ReleaseId::new(release_id), CountryCode::new(country)) {
            (Ok(release), Ok(country)) => (release, country),
            (Err(e), _) | (_, Err(e)) => {
                return self.fail(ScrapeStatus::Error, &MarketError::from(e), release_id);
            }
        };
        let max_offers = match max_offers {
            0 => self.config.max_offers_per_release,
            n => n.min(self.config.max_offers_per_release),
        };

        if let Err(e) = self.gate.check() {
            return self.fail(ScrapeStatus::ScrapingError, &e, release.as_str());
        }

        let key = cache_key(release.as_str(), max_offers);
        if self.config.cache_enabled {
            if let Some(offers) = self.cache.get(&key) {
                tracing::debug!("cache hit for release {}", release);
                return ScrapeOutcome::success(offers);
            }
        }

        let _admitted = self.admission.admit().await;
        let url = self.listing_url(&release, &country);
        tracing::info!("scraping offers for release {} ({})", release, country);

        let result = self
            .retry
            .run(&format!("listing {release}"), |_| self.scrape_once(&url, max_offers))
            .await;

        match result {
            Ok(offers) if offers.is_empty() => {
                tracing::info!("no offers listed for release {}", release);
                ScrapeOutcome {
                    offers,
                    status: ScrapeStatus::NoOffersFound,
                    error: None,
                }
            }
            Ok(offers) => {
                tracing::info!("found {} offers for release {}", offers.len(), release);
                if self.config.cache_enabled {
                    self.cache.set(key, offers.clone());
                }
                ScrapeOutcome::success(offers)
            }
            Err(e) if e.is_timeout() => self.fail(ScrapeStatus::TimeoutError, &e, release.as_str()),
            Err(e) => {
                if e.kind() == ErrorKind::MissingDependency {
                    self.gate.disable(e.to_string());
                }
                self.fail(ScrapeStatus::ScrapingError, &e, release.as_str())
            }
        }
    }

    /// One attempt: open a session, read the page, always close.
    async fn scrape_once(&self, url: &str, max_offers: usize) -> Result<Vec<Offer>> {
        let mut session = self.sessions.open().await?;
        let result = self.read_listing(session.as_mut(), url, max_offers).await;
        if let Err(e) = session.close().await {
            tracing::warn!("failed to close listing session: {}", e);
        }
        result
    }

    async fn read_listing(
        &self,
        session: &mut dyn PageSession,
        url: &str,
        max_offers: usize,
    ) -> Result<Vec<Offer>> {
        session.navigate(url, self.config.request_timeout()).await?;
        session.pause().await;
        session.simulate_reading().await?;
        let html = session.content().await?;

        if html.trim().is_empty() {
            return Err(MarketError::Browser(BrowserError::NavigationError(format!(
                "empty document at {url}"
            ))));
        }
        parse_offers(&html, &self.selectors, &self.config.marketplace_url, max_offers)
    }
}
