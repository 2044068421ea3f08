//! Search orchestrator for fanning criteria out across providers.
//!
//! This module provides the `SearchOrchestrator` which runs one task per
//! capable provider on a bounded pool, tolerates any mix of failures, and
//! always reports exactly one envelope per capable provider.

use crate::error::SearchError;
use crate::provider::{Provider, SearchContext};
use digger_core::{Classify, ErrorRecord, ResultEnvelope, SearchConfig, SearchCriteria};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::Instant;

/// Append-only result list shared with the provider tasks.
///
/// Once closed, late results are discarded so an abandoned provider can
/// never add a second envelope after its timeout entry.
#[derive(Default)]
struct Collected {
    closed: bool,
    envelopes: Vec<ResultEnvelope>,
}

#[derive(Clone)]
struct Sink {
    collected: Arc<Mutex<Collected>>,
    stream: Option<mpsc::UnboundedSender<ResultEnvelope>>,
}

impl Sink {
    fn push(&self, envelope: ResultEnvelope) {
        let mut collected = self.collected.lock().expect("acquire results lock");
        if collected.closed {
            return;
        }
        if let Some(tx) = &self.stream {
            let _ = tx.send(envelope.clone());
        }
        collected.envelopes.push(envelope);
    }

    /// Stop accepting results and add `fill(provider)` for every provider
    /// that has not reported yet.
    fn close(
        &self,
        expected: &[Provider],
        fill: impl Fn(Provider) -> ResultEnvelope,
    ) -> Vec<ResultEnvelope> {
        let mut collected = self.collected.lock().expect("acquire results lock");
        collected.closed = true;
        for provider in expected {
            if collected.envelopes.iter().any(|e| e.platform == provider.name()) {
                continue;
            }
            let envelope = fill(*provider);
            if let Some(tx) = &self.stream {
                let _ = tx.send(envelope.clone());
            }
            collected.envelopes.push(envelope);
        }
        std::mem::take(&mut collected.envelopes)
    }
}

/// Orchestrates concurrent searches across providers.
pub struct SearchOrchestrator {
    ctx: Arc<SearchContext>,
    providers: Vec<Provider>,
    workers: usize,
    task_timeout: Duration,
    overall_timeout: Duration,
}

impl SearchOrchestrator {
    /// Create an orchestrator over every provider.
    #[must_use]
    pub fn new(ctx: SearchContext, config: &SearchConfig) -> Self {
        Self {
            ctx: Arc::new(ctx),
            providers: Provider::ALL.to_vec(),
            workers: config.workers.max(1),
            task_timeout: config.task_timeout(),
            overall_timeout: config.overall_timeout(),
        }
    }

    /// Restrict the provider set.
    #[must_use]
    pub fn with_providers(mut self, providers: Vec<Provider>) -> Self {
        self.providers = providers;
        self
    }

    /// Set the per-provider and whole-search time budgets.
    #[must_use]
    pub fn with_timeouts(mut self, task: Duration, overall: Duration) -> Self {
        self.task_timeout = task;
        self.overall_timeout = overall;
        self
    }

    /// Set the maximum number of concurrent provider searches.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Providers able to answer `criteria`, in dispatch order.
    #[must_use]
    pub fn capable(&self, criteria: &SearchCriteria) -> Vec<Provider> {
        self.providers
            .iter()
            .copied()
            .filter(|p| p.can_search(criteria))
            .collect()
    }

    /// Search every capable provider and collect the envelopes.
    pub async fn search(&self, criteria: &SearchCriteria) -> Vec<ResultEnvelope> {
        self.run(criteria, None).await
    }

    /// Like [`search`](Self::search), additionally streaming each envelope
    /// to `tx` as soon as it is ready.
    pub async fn search_streaming(
        &self,
        criteria: &SearchCriteria,
        tx: mpsc::UnboundedSender<ResultEnvelope>,
    ) -> Vec<ResultEnvelope> {
        self.run(criteria, Some(tx)).await
    }

    fn record_failure(&self, error: &SearchError, provider: Provider) -> ResultEnvelope {
        let record: ErrorRecord = error.to_record(provider.name());
        self.ctx.error_log.record(&record);
        ResultEnvelope::could_not_search(&record)
    }

    async fn run(
        &self,
        criteria: &SearchCriteria,
        stream: Option<mpsc::UnboundedSender<ResultEnvelope>>,
    ) -> Vec<ResultEnvelope> {
        let capable = self.capable(criteria);
        if capable.is_empty() {
            tracing::info!("no provider can search {:?}", criteria.free_text());
            return Vec::new();
        }
        tracing::info!(
            "searching {} providers with {} workers",
            capable.len(),
            self.workers
        );

        let deadline = Instant::now() + self.overall_timeout;
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let sink = Sink {
            collected: Arc::new(Mutex::new(Collected::default())),
            stream,
        };
        let criteria = Arc::new(criteria.clone());

        let mut tasks = FuturesUnordered::new();
        let mut abort_handles = Vec::with_capacity(capable.len());

        for provider in capable.iter().copied() {
            let ctx = Arc::clone(&self.ctx);
            let criteria = Arc::clone(&criteria);
            let semaphore = Arc::clone(&semaphore);
            let task_sink = sink.clone();
            let task_timeout = self.task_timeout;

            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let envelope =
                    match tokio::time::timeout(task_timeout, provider.search(&ctx, &criteria)).await {
                        Ok(envelope) => envelope,
                        Err(_) => {
                            let error = SearchError::Timeout {
                                millis: u64::try_from(task_timeout.as_millis()).unwrap_or(u64::MAX),
                            };
                            let record = error.to_record(provider.name());
                            ctx.error_log.record(&record);
                            ResultEnvelope::could_not_search(&record)
                        }
                    };
                task_sink.push(envelope);
            });

            abort_handles.push(handle.abort_handle());
            tasks.push(async move { (provider, handle.await) });
        }

        loop {
            match tokio::time::timeout_at(deadline, tasks.next()).await {
                Ok(Some((_, Ok(())))) => {}
                Ok(Some((provider, Err(join_error)))) => {
                    tracing::error!("{} search task ended abnormally: {}", provider, join_error);
                    let error = SearchError::Internal(format!("search task failed: {join_error}"));
                    sink.push(self.record_failure(&error, provider));
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        "search exceeded {:?}, abandoning {} providers",
                        self.overall_timeout,
                        tasks.len()
                    );
                    for handle in &abort_handles {
                        handle.abort();
                    }
                    break;
                }
            }
        }

        // Abandoned providers are reported, not dropped
        let envelopes = sink.close(&capable, |provider| {
            let error = SearchError::Timeout {
                millis: u64::try_from(self.overall_timeout.as_millis()).unwrap_or(u64::MAX),
            };
            self.record_failure(&error, provider)
        });
        let errors = envelopes.iter().filter(|e| e.is_error()).count();
        tracing::info!(
            "search finished: {} envelopes, {} could not search",
            envelopes.len(),
            errors
        );
        envelopes
    }
}
