//! Digger Core - Foundation crate for the Digger release finder.
//!
//! This crate provides the shared data model, the error taxonomy every
//! failure is classified into, configuration management, and the retry
//! policy shared by providers and scrapers.
//!
//! # Modules
//!
//! - [`types`] - Search criteria, result envelopes, offers, validated newtypes
//! - [`taxonomy`] - Closed error-kind set with severity and retryability
//! - [`error_log`] - Append-only structured sink for classified failures
//! - [`error`] - Crate error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`retry`] - Reusable retry policy driven by the taxonomy
//!
//! # Example
//!
//! ```rust
//! use digger_core::{ErrorKind, ErrorRecord, SearchCriteria, Severity};
//!
//! let criteria = SearchCriteria::new(Some(" Windowlicker "), Some("Aphex Twin"), None, None);
//! assert_eq!(criteria.title(), Some("Windowlicker"));
//!
//! let record = ErrorRecord::new(ErrorKind::MissingDependency, "Discogs", "chromium not found");
//! assert_eq!(record.severity(), Severity::Critical);
//! assert!(!record.is_retryable());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod error_log;
pub mod retry;
pub mod taxonomy;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, EnrichmentConfig, EnrichmentStrategy, LoggingConfig, ProviderConfig,
    ScoringWeights, ScraperConfig, SearchConfig,
};
pub use error::{ConfigError, ConfigResult, CoreError, Result};
pub use error_log::ErrorLog;
pub use retry::{Backoff, RetryPolicy};
pub use taxonomy::{Classify, ErrorKind, ErrorLayer, ErrorRecord, Severity};
pub use types::{
    CountryCode, EnvelopeStatus, Offer, ReleaseId, ResultEnvelope, SearchCriteria,
    NO_MATCH_TITLE, UNKNOWN_SHIPPING,
};
