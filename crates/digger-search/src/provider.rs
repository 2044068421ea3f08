//! The closed provider set and its two-operation contract.

use crate::error::{Result, SearchError};
use crate::fetch::Fetcher;
use crate::providers::{bandcamp, deezer, discogs, itunes, juno, revibed};
use crate::relevance::Selection;
use digger_core::{
    Classify, ErrorLog, ProviderConfig, ResultEnvelope, ScoringWeights, SearchConfig,
    SearchCriteria,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Everything a provider needs to run one search.
pub struct SearchContext {
    /// HTTP transport
    pub fetcher: Arc<dyn Fetcher>,
    /// Endpoints and credentials
    pub providers: ProviderConfig,
    /// Scorer weights
    pub weights: ScoringWeights,
    /// Raw results scored per provider
    pub top_k: usize,
    /// Sink for classified failures
    pub error_log: Arc<ErrorLog>,
}

impl SearchContext {
    /// Build a context from configuration.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        search: &SearchConfig,
        weights: ScoringWeights,
        providers: ProviderConfig,
        error_log: Arc<ErrorLog>,
    ) -> Self {
        Self {
            fetcher,
            providers,
            weights,
            top_k: search.top_k,
            error_log,
        }
    }
}

/// A searchable source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Discogs database (JSON API)
    Discogs,
    /// Revibed rare and physical goods
    Revibed,
    /// Bandcamp digital store
    Bandcamp,
    /// Juno Records store
    Juno,
    /// iTunes Store
    Itunes,
    /// Deezer streaming catalogue
    Deezer,
}

impl Provider {
    /// Every provider, in dispatch order.
    pub const ALL: [Provider; 6] = [
        Provider::Discogs,
        Provider::Revibed,
        Provider::Bandcamp,
        Provider::Juno,
        Provider::Itunes,
        Provider::Deezer,
    ];

    /// Display name used as the envelope's platform.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Discogs => discogs::NAME,
            Self::Revibed => revibed::NAME,
            Self::Bandcamp => bandcamp::NAME,
            Self::Juno => juno::NAME,
            Self::Itunes => itunes::NAME,
            Self::Deezer => deezer::NAME,
        }
    }

    /// Whether this provider can answer `criteria`.
    ///
    /// Pure over the four criteria fields.
    #[must_use]
    pub fn can_search(self, criteria: &SearchCriteria) -> bool {
        let title = criteria.title().is_some();
        let artist = criteria.artist().is_some();
        let album = criteria.album().is_some();
        let catalog = criteria.catalog().is_some();

        match self {
            Self::Discogs => {
                catalog || (title && artist) || (title && album) || (artist && album)
            }
            Self::Revibed => album || artist,
            Self::Bandcamp | Self::Juno | Self::Itunes | Self::Deezer => {
                (title && artist) || (title && album) || (artist && album)
            }
        }
    }

    /// Apply the strict word filter before scoring.
    fn strict(self) -> bool {
        matches!(self, Self::Revibed)
    }

    async fn raw_results(self, ctx: &SearchContext, criteria: &SearchCriteria) -> Result<Vec<ResultEnvelope>> {
        match self {
            Self::Discogs => discogs::search(ctx, criteria).await,
            Self::Revibed => revibed::search(ctx, criteria).await,
            Self::Bandcamp => bandcamp::search(ctx, criteria).await,
            Self::Juno => juno::search(ctx, criteria).await,
            Self::Itunes => itunes::search(ctx, criteria).await,
            Self::Deezer => deezer::search(ctx, criteria).await,
        }
    }

    /// Search this provider and return its single best result.
    ///
    /// Never fails: failures become an error-tagged envelope after being
    /// classified and written to the error log.
    pub async fn search(self, ctx: &SearchContext, criteria: &SearchCriteria) -> ResultEnvelope {
        let outcome = if self.can_search(criteria) {
            self.raw_results(ctx, criteria).await
        } else {
            Err(SearchError::Unsearchable(self.name().to_string()))
        };

        match outcome {
            Ok(results) => {
                tracing::debug!(platform = self.name(), count = results.len(), "raw results");
                let selection = Selection {
                    weights: &ctx.weights,
                    top_k: ctx.top_k,
                    strict: self.strict(),
                };
                selection.best(self.name(), criteria, results)
            }
            Err(e) => {
                let record = e
                    .to_record(self.name())
                    .with_detail("criteria", criteria.free_text());
                ctx.error_log.record(&record);
                ResultEnvelope::could_not_search(&record)
            }
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria(title: bool, artist: bool, album: bool, catalog: bool) -> SearchCriteria {
        SearchCriteria::new(
            title.then_some("Windowlicker"),
            artist.then_some("Aphex Twin"),
            album.then_some("Windowlicker EP"),
            catalog.then_some("WAP105"),
        )
    }

    fn all_combinations() -> Vec<(bool, bool, bool, bool)> {
        (0u8..16)
            .map(|bits| (bits & 1 != 0, bits & 2 != 0, bits & 4 != 0, bits & 8 != 0))
            .collect()
    }

    #[test]
    fn test_discogs_truth_table() {
        for (t, a, al, c) in all_combinations() {
            let expected = (c && a) || (c && al) || (c && t) || (t && a) || (t && al) || (a && al) || c;
            assert_eq!(
                Provider::Discogs.can_search(&criteria(t, a, al, c)),
                expected,
                "title={t} artist={a} album={al} catalog={c}"
            );
        }
    }

    #[test]
    fn test_revibed_truth_table() {
        for (t, a, al, c) in all_combinations() {
            assert_eq!(Provider::Revibed.can_search(&criteria(t, a, al, c)), al || a);
        }
        assert!(!Provider::Revibed.can_search(&criteria(true, false, false, true)));
    }

    #[test]
    fn test_digital_store_truth_table() {
        for provider in [Provider::Bandcamp, Provider::Juno, Provider::Itunes, Provider::Deezer] {
            for (t, a, al, c) in all_combinations() {
                let expected = (t && a) || (t && al) || (a && al);
                assert_eq!(
                    provider.can_search(&criteria(t, a, al, c)),
                    expected,
                    "{provider}: title={t} artist={a} album={al} catalog={c}"
                );
            }
        }
    }

    #[test]
    fn test_blank_fields_do_not_count() {
        let criteria = SearchCriteria::new(Some("  "), Some("Burial"), None, Some(""));
        assert!(!Provider::Juno.can_search(&criteria));
        assert!(!Provider::Discogs.can_search(&criteria));
        assert!(Provider::Revibed.can_search(&criteria));
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = Provider::ALL.iter().map(|p| p.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Provider::ALL.len());
    }
}
