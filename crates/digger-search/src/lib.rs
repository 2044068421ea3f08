//! Release search across marketplaces and digital stores.
//!
//! A [`SearchOrchestrator`] fans [`SearchCriteria`](digger_core::SearchCriteria)
//! out to every capable [`Provider`] on a bounded pool. Each provider scores
//! its raw results with the [`relevance`] module and returns a single
//! envelope: the best match, the no-match sentinel, or an error-tagged entry.
//!
//! # Example
//!
//! ```rust
//! use digger_core::SearchCriteria;
//! use digger_search::Provider;
//!
//! let criteria = SearchCriteria::new(None, Some("Burial"), None, None);
//! assert!(Provider::Revibed.can_search(&criteria));
//! assert!(!Provider::Deezer.can_search(&criteria));
//! ```

pub mod error;
pub mod fetch;
pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod relevance;

pub use error::{Result, SearchError};
pub use fetch::{fetch_json, FetchRequest, Fetcher, HttpFetcher};
pub use orchestrator::SearchOrchestrator;
pub use provider::{Provider, SearchContext};
pub use relevance::{calculate_relevance_score, normalize_for_matching, strict_filter, Candidate, Selection};
