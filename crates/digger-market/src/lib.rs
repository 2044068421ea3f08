//! Marketplace offers for a release.
//!
//! The [`ListingScraper`] reads the offer rows of a release's listing page
//! through a browser session, behind a TTL cache and admission control.
//! The [`EnrichmentEngine`] then visits the detail pages of offers whose
//! row did not state shipping, drops the ones that do not ship to the
//! buyer, and fills in shipping and totals for the rest.
//!
//! Both share a [`ScrapingGate`] that closes for good once the browser
//! engine turns out to be missing.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod admission;
pub mod availability;
pub mod cache;
pub mod detail;
pub mod enrichment;
pub mod error;
pub mod gate;
pub mod listing;
pub mod price;
pub mod selectors;
pub mod shipping;

pub use admission::{AdmissionControl, AdmissionGuard};
pub use cache::{cache_key, TtlCache};
pub use detail::{inspect_detail, DetailFinding};
pub use enrichment::EnrichmentEngine;
pub use error::{MarketError, Result};
pub use gate::ScrapingGate;
pub use listing::{parse_offers, ListingScraper, ScrapeOutcome, ScrapeStatus};
pub use price::{parse_price, Money};
pub use selectors::{DetailSelectors, ListingSelectors, SelectorChain};
pub use shipping::{parse_shipping, ShippingCost};
