//! Service lifecycle.

use digger_browser::{BrowserEngine, SessionFactory};
use digger_core::{AppConfig, CountryCode, ErrorLog, ResultEnvelope, SearchCriteria};
use digger_market::{EnrichmentEngine, ListingScraper, ScrapeOutcome, ScrapeStatus, ScrapingGate};
use digger_search::{Fetcher, HttpFetcher, SearchContext, SearchOrchestrator};
use std::sync::Arc;

/// Every long-lived service of the application.
///
/// Built once at startup from [`AppConfig`] and torn down with
/// [`shutdown`](Self::shutdown). The HTTP client, browser factory, listing
/// cache, admission counter and error log all live here; nothing is global.
pub struct AppServices {
    config: AppConfig,
    error_log: Arc<ErrorLog>,
    gate: Arc<ScrapingGate>,
    search: SearchOrchestrator,
    listings: ListingScraper,
    enrichment: EnrichmentEngine,
}

impl AppServices {
    /// Build the production services: a `reqwest` fetcher and a Chromium
    /// session factory.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let error_log = match &config.logging.error_log_path {
            Some(path) => {
                tracing::info!("Error log: {}", path.display());
                ErrorLog::open(path)?
            }
            None => ErrorLog::in_memory(),
        };
        let fetcher = HttpFetcher::new(&config.search)?;
        let sessions = BrowserEngine::from_config(&config.scraper);

        Ok(Self::with_parts(
            config,
            Arc::new(fetcher),
            Arc::new(sessions),
            Arc::new(error_log),
        ))
    }

    /// Build services around the given transport seams.
    pub fn with_parts(
        config: AppConfig,
        fetcher: Arc<dyn Fetcher>,
        sessions: Arc<dyn SessionFactory>,
        error_log: Arc<ErrorLog>,
    ) -> Self {
        let gate = Arc::new(ScrapingGate::new());

        let ctx = SearchContext::new(
            fetcher,
            &config.search,
            config.scoring,
            config.providers.clone(),
            Arc::clone(&error_log),
        );
        let search = SearchOrchestrator::new(ctx, &config.search);

        let listings = ListingScraper::new(
            config.scraper.clone(),
            Arc::clone(&sessions),
            Arc::clone(&gate),
            Arc::clone(&error_log),
        );
        let enrichment = EnrichmentEngine::new(
            config.enrichment.clone(),
            sessions,
            Arc::clone(&gate),
            Arc::clone(&error_log),
        );

        Self {
            config,
            error_log,
            gate,
            search,
            listings,
            enrichment,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    /// False once the browser engine was found missing.
    pub fn scraping_enabled(&self) -> bool {
        self.gate.is_open()
    }

    /// Search every capable provider.
    pub async fn search(&self, criteria: &SearchCriteria) -> Vec<ResultEnvelope> {
        self.search.search(criteria).await
    }

    /// Scrape the offers for a release and enrich the ones without shipping.
    pub async fn offers(&self, release_id: &str, country: &str, max_offers: usize) -> ScrapeOutcome {
        let mut outcome = self.listings.scrape_offers(release_id, max_offers, country).await;
        if outcome.status != ScrapeStatus::Success {
            return outcome;
        }

        // Validated by the scraper already
        let Ok(country) = CountryCode::new(country) else {
            return outcome;
        };
        let offers = std::mem::take(&mut outcome.offers);
        outcome.offers = self.enrichment.enrich(offers, &country).await;
        outcome
    }

    /// Release cached state and report what was recorded.
    pub fn shutdown(self) {
        let cache = self.listings.cache();
        let expired = cache.purge_expired();
        let live = cache.len();
        cache.clear();
        tracing::info!(
            "Shutting down: {} live and {} expired cached listings dropped, {} errors recorded",
            live,
            expired,
            self.error_log.len()
        );
    }
}
