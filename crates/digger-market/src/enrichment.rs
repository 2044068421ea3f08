//! Per-offer shipping enrichment.
//!
//! Offers whose listing row showed no shipping cost are visited on their
//! detail page, cheapest first. Offers the seller will not ship to the
//! buyer's country are dropped; the rest get their shipping and parsed
//! totals filled in. Work stops early once enough offers are confirmed.

use crate::detail::{inspect_detail, DetailFinding};
use crate::error::{MarketError, Result};
use crate::gate::ScrapingGate;
use crate::listing::{is_bot_wall, PLATFORM};
use crate::price::{parse_price, round_cents};
use crate::selectors::DetailSelectors;
use crate::shipping::ShippingCost;
use digger_browser::{PageSession, SessionFactory};
use digger_core::{
    Classify, CountryCode, EnrichmentConfig, EnrichmentStrategy, ErrorKind, ErrorLog, Offer,
};
use futures::stream::{FuturesUnordered, StreamExt};
use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// One selected offer waiting for a worker.
#[derive(Debug)]
struct Job {
    /// Position in price order, 0 = cheapest
    rank: usize,
    /// Position in the caller's list
    index: usize,
    offer: Offer,
}

/// What happened to one job.
#[derive(Debug)]
enum Visit {
    Enriched(Offer),
    Dropped,
    Unchanged,
}

/// State shared by the workers of one `enrich` call.
struct Run<'a> {
    country: &'a CountryCode,
    queue: Mutex<VecDeque<Job>>,
    visits: Mutex<HashMap<usize, Visit>>,
    confirmed: AtomicUsize,
    cancel: CancellationToken,
}

impl Run<'_> {
    fn next_job(&self) -> Option<Job> {
        self.queue.lock().expect("acquire enrichment queue lock").pop_front()
    }

    fn finish(&self, index: usize, visit: Visit) {
        self.visits
            .lock()
            .expect("acquire enrichment results lock")
            .insert(index, visit);
    }
}

/// Fills in shipping for offers whose listing row did not show it.
pub struct EnrichmentEngine {
    config: EnrichmentConfig,
    sessions: Arc<dyn SessionFactory>,
    selectors: DetailSelectors,
    gate: Arc<ScrapingGate>,
    error_log: Arc<ErrorLog>,
}

impl EnrichmentEngine {
    /// Build an engine over `sessions`; strategy, worker count and
    /// timeouts come from `config`.
    #[must_use]
    pub fn new(
        config: EnrichmentConfig,
        sessions: Arc<dyn SessionFactory>,
        gate: Arc<ScrapingGate>,
        error_log: Arc<ErrorLog>,
    ) -> Self {
        Self {
            config,
            sessions,
            selectors: DetailSelectors::default(),
            gate,
            error_log,
        }
    }

    /// Replace the detail-page region chains.
    #[must_use]
    pub fn with_selectors(mut self, selectors: DetailSelectors) -> Self {
        self.selectors = selectors;
        self
    }

    /// Number of concurrent workers for `jobs` selected offers.
    fn worker_count(&self, jobs: usize) -> usize {
        let wanted = match self.config.strategy {
            EnrichmentStrategy::Sequential => 1,
            EnrichmentStrategy::Parallel => self.config.workers.max(1),
        };
        wanted.min(jobs).max(1)
    }

    /// Enrich `offers` for a buyer in `country`.
    ///
    /// The result keeps the input order and never grows. Offers that were
    /// not selected, not reached, or could not be loaded come back as they
    /// went in.
    pub async fn enrich(&self, offers: Vec<Offer>, country: &CountryCode) -> Vec<Offer> {
        let mut jobs: Vec<Job> = offers
            .iter()
            .enumerate()
            .filter(|(_, offer)| offer.needs_enrichment() && !offer.offer_url.is_empty())
            .map(|(index, offer)| Job {
                rank: 0,
                index,
                offer: offer.clone(),
            })
            .collect();

        if jobs.is_empty() {
            return offers;
        }
        if !self.gate.is_open() {
            tracing::warn!(
                "marketplace scraping disabled, returning {} offers un-enriched",
                offers.len()
            );
            return offers;
        }

        jobs.sort_by(|a, b| compare_prices(&a.offer, &b.offer));
        for (rank, job) in jobs.iter_mut().enumerate() {
            job.rank = rank;
        }

        let workers = self.worker_count(jobs.len());
        tracing::info!(
            "enriching {} of {} offers for {} with {} worker(s)",
            jobs.len(),
            offers.len(),
            country,
            workers
        );

        let run = Run {
            country,
            queue: Mutex::new(jobs.into()),
            visits: Mutex::new(HashMap::new()),
            confirmed: AtomicUsize::new(0),
            cancel: CancellationToken::new(),
        };

        let mut pool: FuturesUnordered<_> = (0..workers).map(|id| self.worker(id, &run)).collect();
        while pool.next().await.is_some() {}
        drop(pool);

        let mut visits = run.visits.into_inner().expect("acquire enrichment results lock");
        let enriched = offers
            .into_iter()
            .enumerate()
            .filter_map(|(index, offer)| match visits.remove(&index) {
                Some(Visit::Enriched(updated)) => Some(updated),
                Some(Visit::Dropped) => None,
                Some(Visit::Unchanged) | None => Some(offer),
            })
            .collect::<Vec<_>>();

        tracing::info!(
            "enrichment done: {} offers kept, {} confirmed",
            enriched.len(),
            run.confirmed.load(Ordering::SeqCst)
        );
        enriched
    }

    /// One worker: pulls jobs in price order until the queue is empty or
    /// early exit is signalled, reusing one lazily opened session.
    async fn worker(&self, id: usize, run: &Run<'_>) {
        let threshold = self.config.early_exit_after;
        let mut session: Option<Box<dyn PageSession>> = None;

        while let Some(job) = run.next_job() {
            let protected = job.rank < threshold;
            if !protected && run.cancel.is_cancelled() {
                tracing::debug!(worker = id, "early exit, leaving remaining offers un-enriched");
                break;
            }

            if session.is_none() {
                match self.sessions.open().await {
                    Ok(opened) => session = Some(opened),
                    Err(e) => {
                        self.session_failed(&MarketError::from(e));
                        break;
                    }
                }
            }
            let Some(active) = session.as_mut() else {
                break;
            };

            let visit = if protected {
                self.visit(active.as_mut(), &job, run.country).await
            } else {
                tokio::select! {
                    () = run.cancel.cancelled() => {
                        tracing::debug!(worker = id, rank = job.rank, "abandoning offer after early exit");
                        break;
                    }
                    visit = self.visit(active.as_mut(), &job, run.country) => visit,
                }
            };

            let visit = match visit {
                Ok(visit) => visit,
                Err(e) => {
                    let record = e
                        .to_record(PLATFORM)
                        .with_detail("offer_url", &job.offer.offer_url);
                    self.error_log.record(&record);
                    if e.kind() == ErrorKind::AutomationEngine {
                        if let Some(mut broken) = session.take() {
                            let _ = broken.close().await;
                        }
                    }
                    Visit::Unchanged
                }
            };

            if matches!(visit, Visit::Enriched(_)) {
                let confirmed = run.confirmed.fetch_add(1, Ordering::SeqCst) + 1;
                if confirmed >= threshold && !run.cancel.is_cancelled() {
                    tracing::debug!("{} offers confirmed, signalling early exit", confirmed);
                    run.cancel.cancel();
                }
            }
            run.finish(job.index, visit);
        }

        if let Some(mut session) = session {
            if let Err(e) = session.close().await {
                tracing::warn!(worker = id, "failed to close enrichment session: {}", e);
            }
        }
    }

    fn session_failed(&self, error: &MarketError) {
        let record = error.to_record(PLATFORM);
        self.error_log.record(&record);
        if error.kind() == ErrorKind::MissingDependency {
            self.gate.disable(error.to_string());
        }
    }

    /// Load one detail page and apply what it says.
    ///
    /// A timed-out load is retried exactly once with the extended budget;
    /// if that also times out the offer is left unchanged.
    async fn visit(
        &self,
        session: &mut dyn PageSession,
        job: &Job,
        country: &CountryCode,
    ) -> Result<Visit> {
        let url = job.offer.offer_url.as_str();

        if let Err(first) = session.navigate(url, self.config.page_timeout()).await {
            let first = MarketError::from(first);
            if !first.is_timeout() {
                return Err(first);
            }
            tracing::debug!("{} timed out, retrying with extended timeout", url);
            if let Err(second) = session.navigate(url, self.config.extended_timeout()).await {
                let second = MarketError::from(second);
                if second.is_timeout() {
                    tracing::info!("{} timed out twice, keeping offer as listed", url);
                    return Ok(Visit::Unchanged);
                }
                return Err(second);
            }
        }

        session.pause().await;
        let html = session.content().await?;
        if is_bot_wall(&html) {
            return Err(MarketError::BotBlocked(url.to_string()));
        }

        Ok(match inspect_detail(&html, country.as_str(), &self.selectors) {
            DetailFinding::Unavailable => {
                tracing::debug!("{} does not ship to {}, dropping offer", url, country);
                Visit::Dropped
            }
            DetailFinding::Shipping(cost) => Visit::Enriched(apply_shipping(job.offer.clone(), &cost)),
            DetailFinding::NoShipping => Visit::Unchanged,
        })
    }
}

/// Ascending by parsed item price; unparseable prices sort last.
fn compare_prices(a: &Offer, b: &Offer) -> CmpOrdering {
    let a = parse_price(&a.price).map(|m| m.amount);
    let b = parse_price(&b.price).map(|m| m.amount);
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => CmpOrdering::Less,
        (None, Some(_)) => CmpOrdering::Greater,
        (None, None) => CmpOrdering::Equal,
    }
}

/// Fill shipping, parsed price and total into `offer`.
#[must_use]
pub fn apply_shipping(mut offer: Offer, cost: &ShippingCost) -> Offer {
    offer.shipping = cost.cost.clone();
    offer.shipping_amount = Some(cost.amount);

    if let Some(price) = parse_price(&offer.price) {
        offer.price_amount = Some(price.amount);
        offer.price_currency = price
            .currency
            .map(str::to_string)
            .or_else(|| cost.currency.clone());
        offer.total_amount = Some(round_cents(price.amount + cost.amount));
    }
    offer
}
