//! Shared types used across the Digger workspace.
//!
//! This module defines the search criteria, the uniform result envelope every
//! provider returns, the marketplace offer model, and validated newtypes for
//! release ids and buyer countries.

use crate::error::CoreError;
use crate::taxonomy::{ErrorKind, ErrorRecord};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// Shipping value the listing scraper emits when the row did not show one.
pub const UNKNOWN_SHIPPING: &str = "unknown";

/// Title carried by the canonical "searched, found nothing" envelope.
pub const NO_MATCH_TITLE: &str = "No match";

/// The 4-field user query.
///
/// Fields are trimmed on construction and blank values become absent. The
/// value is immutable afterwards, so it can key caches directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "CriteriaFields")]
pub struct SearchCriteria {
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    catalog: Option<String>,
}

#[derive(Deserialize)]
struct CriteriaFields {
    title: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    catalog: Option<String>,
}

impl From<CriteriaFields> for SearchCriteria {
    fn from(raw: CriteriaFields) -> Self {
        Self::new(
            raw.title.as_deref(),
            raw.artist.as_deref(),
            raw.album.as_deref(),
            raw.catalog.as_deref(),
        )
    }
}

fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl SearchCriteria {
    /// Build criteria from raw user input.
    #[must_use]
    pub fn new(
        title: Option<&str>,
        artist: Option<&str>,
        album: Option<&str>,
        catalog: Option<&str>,
    ) -> Self {
        Self {
            title: clean(title),
            artist: clean(artist),
            album: clean(album),
            catalog: clean(catalog),
        }
    }

    /// Track title.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Artist name.
    #[must_use]
    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    /// Album / release title.
    #[must_use]
    pub fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }

    /// Catalog number.
    #[must_use]
    pub fn catalog(&self) -> Option<&str> {
        self.catalog.as_deref()
    }

    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields().next().is_none()
    }

    /// The term matched against a result's title during scoring: the track
    /// title when given, otherwise the album.
    #[must_use]
    pub fn primary_term(&self) -> Option<&str> {
        self.title().or_else(|| self.album())
    }

    /// Non-empty fields in title, artist, album, catalog order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        [self.title(), self.artist(), self.album(), self.catalog()]
            .into_iter()
            .flatten()
    }

    /// All non-empty fields joined with spaces, for free-text search boxes.
    #[must_use]
    pub fn free_text(&self) -> String {
        self.fields().collect::<Vec<_>>().join(" ")
    }
}

/// Outcome carried by a [`ResultEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EnvelopeStatus {
    /// A relevant result was found
    Found,
    /// The provider was searched and had nothing relevant
    NoMatch,
    /// The provider could not be searched
    Error {
        /// Taxonomy kind of the failure
        kind: ErrorKind,
        /// Human readable message
        message: String,
    },
}

/// Uniform per-provider search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    /// Display name of the provider
    pub platform: String,
    /// Result title, or the no-match marker
    pub title: String,
    /// Artist as reported by the provider
    pub artist: Option<String>,
    /// Album as reported by the provider
    pub album: Option<String>,
    /// Record label
    pub label: Option<String>,
    /// Display price, verbatim
    pub price: Option<String>,
    /// Artwork URL
    pub cover_url: Option<String>,
    /// Link to the result on the provider's site
    pub url: Option<String>,
    /// Provider-specific extras (release id, catalog number, year, ...)
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
    /// Found, no match, or could not search
    pub status: EnvelopeStatus,
}

impl ResultEnvelope {
    /// A found result with only the title set.
    #[must_use]
    pub fn found(platform: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            title: title.into(),
            artist: None,
            album: None,
            label: None,
            price: None,
            cover_url: None,
            url: None,
            extra: BTreeMap::new(),
            status: EnvelopeStatus::Found,
        }
    }

    /// The canonical "searched, found nothing" envelope.
    #[must_use]
    pub fn no_match(platform: impl Into<String>) -> Self {
        Self {
            status: EnvelopeStatus::NoMatch,
            ..Self::found(platform, NO_MATCH_TITLE)
        }
    }

    /// The "could not search" envelope for a classified failure.
    #[must_use]
    pub fn could_not_search(record: &ErrorRecord) -> Self {
        Self {
            status: EnvelopeStatus::Error {
                kind: record.kind,
                message: record.message.clone(),
            },
            ..Self::found(record.platform.clone(), NO_MATCH_TITLE)
        }
    }

    /// Set the artist.
    #[must_use]
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    /// Set the album.
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Set the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the display price.
    #[must_use]
    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = Some(price.into());
        self
    }

    /// Set the artwork URL.
    #[must_use]
    pub fn with_cover_url(mut self, url: impl Into<String>) -> Self {
        self.cover_url = Some(url.into());
        self
    }

    /// Set the result URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Add a provider-specific extra value.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// True for the no-match sentinel.
    #[must_use]
    pub fn is_no_match(&self) -> bool {
        self.status == EnvelopeStatus::NoMatch
    }

    /// True for a "could not search" entry.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.status, EnvelopeStatus::Error { .. })
    }

    /// Extras flattened into one string, for relevance matching.
    #[must_use]
    pub fn extra_text(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        parts.extend(self.album.iter().cloned());
        parts.extend(self.label.iter().cloned());
        for value in self.extra.values() {
            match value {
                serde_json::Value::String(s) => parts.push(s.clone()),
                serde_json::Value::Number(n) => parts.push(n.to_string()),
                _ => {}
            }
        }
        parts.join(" ")
    }
}

/// A marketplace listing for one release.
///
/// Created by the listing scraper; the enrichment engine may fill in the
/// parsed amounts and replace an unknown shipping value. Nothing is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    /// Seller name
    pub seller: String,
    /// Media/sleeve condition, verbatim
    pub condition: String,
    /// Item price, verbatim
    pub price: String,
    /// Shipping cost, verbatim, or [`UNKNOWN_SHIPPING`]
    pub shipping: String,
    /// Detail page URL, empty when no strategy resolved one
    pub offer_url: String,
    /// Seller's country, when shown
    pub country: Option<String>,
    /// Parsed item price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_amount: Option<f64>,
    /// ISO currency of the item price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_currency: Option<String>,
    /// Parsed shipping cost
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_amount: Option<f64>,
    /// Item price plus shipping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
}

impl Offer {
    /// Create a raw offer as read from a listing row.
    #[must_use]
    pub fn new(
        seller: impl Into<String>,
        condition: impl Into<String>,
        price: impl Into<String>,
        shipping: impl Into<String>,
        offer_url: impl Into<String>,
    ) -> Self {
        Self {
            seller: seller.into(),
            condition: condition.into(),
            price: price.into(),
            shipping: shipping.into(),
            offer_url: offer_url.into(),
            country: None,
            price_amount: None,
            price_currency: None,
            shipping_amount: None,
            total_amount: None,
        }
    }

    /// True when the listing row did not show a shipping cost.
    #[must_use]
    pub fn needs_enrichment(&self) -> bool {
        let shipping = self.shipping.trim();
        shipping.is_empty() || shipping.eq_ignore_ascii_case(UNKNOWN_SHIPPING)
    }
}

/// Buyer country as an ISO-3166 alpha-2 code, upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CountryCode(String);

impl CountryCode {
    /// Parse a two-letter code, case-insensitively.
    ///
    /// # Errors
    /// Returns error if the code is not two ASCII letters.
    pub fn new(code: impl AsRef<str>) -> Result<Self, CoreError> {
        let code = code.as_ref().trim();
        if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(CoreError::Validation(format!(
                "invalid country code: must be ISO-3166 alpha-2, got '{code}'"
            )))
        }
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Marketplace release identifier (numeric, optionally prefixed with `r`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseId(String);

impl ReleaseId {
    /// Create a new `ReleaseId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID is not numeric.
    pub fn new(id: impl AsRef<str>) -> Result<Self, CoreError> {
        static RELEASE_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex =
            RELEASE_REGEX.get_or_init(|| Regex::new(r"^[rR]?([0-9]{1,12})$").expect("valid regex"));

        let id = id.as_ref().trim();
        regex
            .captures(id)
            .and_then(|caps| caps.get(1))
            .map(|m| Self(m.as_str().to_string()))
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "invalid release ID: must be numeric, got '{id}'"
                ))
            })
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
