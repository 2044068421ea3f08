//! Error taxonomy shared by every provider and scraper.
//!
//! Every caught failure is classified into one [`ErrorKind`]. The kind alone
//! decides how loud the failure is ([`Severity`]) and whether a retry can
//! help. Raw errors never cross a provider or scraper boundary; an
//! [`ErrorRecord`] does instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Layer of the stack a failure originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorLayer {
    /// DNS, sockets, TLS
    Network,
    /// Non-success HTTP responses
    Http,
    /// Page structure and extraction
    Scraping,
    /// Local runtime and automation engine
    Technical,
    /// Contracted JSON APIs
    Api,
    /// Site policy (regions, age gates, paywalls)
    Platform,
    /// Everything else
    General,
}

/// Closed set of failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    // Network
    /// Site does not answer at all
    SiteDown,
    /// Host name did not resolve
    DnsError,
    /// Connection was not established in time
    ConnectTimeout,
    /// Response did not arrive in time
    ReadTimeout,
    /// TLS handshake or certificate failure
    SslError,
    /// No route to the network
    NetworkUnreachable,

    // HTTP
    /// 401/403
    AccessDenied,
    /// 404/410
    NotFound,
    /// 429
    RateLimited,
    /// Captcha or challenge page served instead of content
    BotBlocked,
    /// Unexpected redirect chain
    Redirect,
    /// 5xx
    ServerError,

    // Scraping
    /// A required selector matched nothing
    SelectorNotFound,
    /// Page layout no longer matches any known chain
    StructureChanged,
    /// The site answered but had nothing for the query
    NoResults,
    /// Text could not be parsed into the expected value
    ParseError,
    /// Content type or shape was not what was expected
    UnexpectedFormat,
    /// Required fields were missing from an otherwise valid result
    IncompleteData,

    // Technical
    /// The browser automation engine failed
    AutomationEngine,
    /// Process ran out of memory
    OutOfMemory,
    /// In-page script or page load exceeded its budget
    ScriptTimeout,
    /// Bytes could not be decoded
    EncodingError,
    /// A required local dependency (browser binary) is unavailable
    MissingDependency,

    // API
    /// API key rejected
    ApiBadKey,
    /// API quota exhausted
    ApiQuotaExceeded,
    /// API endpoint or version retired
    ApiDeprecated,
    /// API down for maintenance
    ApiMaintenance,
    /// API answered with a body that does not decode
    ApiInvalidResponse,

    // Platform
    /// The site rejected the search terms
    InvalidSearchTerms,
    /// Content not available in the buyer's region
    RegionBlocked,
    /// Content behind an age gate
    AgeRestricted,
    /// Content behind a paid tier
    PremiumRequired,

    // General
    /// Unclassified failure
    Unknown,
    /// Invalid local configuration
    ConfigError,
    /// Invalid caller input
    ValidationError,
}

impl ErrorKind {
    /// Layer this kind belongs to.
    #[must_use]
    pub fn layer(self) -> ErrorLayer {
        match self {
            Self::SiteDown
            | Self::DnsError
            | Self::ConnectTimeout
            | Self::ReadTimeout
            | Self::SslError
            | Self::NetworkUnreachable => ErrorLayer::Network,
            Self::AccessDenied
            | Self::NotFound
            | Self::RateLimited
            | Self::BotBlocked
            | Self::Redirect
            | Self::ServerError => ErrorLayer::Http,
            Self::SelectorNotFound
            | Self::StructureChanged
            | Self::NoResults
            | Self::ParseError
            | Self::UnexpectedFormat
            | Self::IncompleteData => ErrorLayer::Scraping,
            Self::AutomationEngine
            | Self::OutOfMemory
            | Self::ScriptTimeout
            | Self::EncodingError
            | Self::MissingDependency => ErrorLayer::Technical,
            Self::ApiBadKey
            | Self::ApiQuotaExceeded
            | Self::ApiDeprecated
            | Self::ApiMaintenance
            | Self::ApiInvalidResponse => ErrorLayer::Api,
            Self::InvalidSearchTerms
            | Self::RegionBlocked
            | Self::AgeRestricted
            | Self::PremiumRequired => ErrorLayer::Platform,
            Self::Unknown | Self::ConfigError | Self::ValidationError => ErrorLayer::General,
        }
    }

    /// How loudly this kind should be reported.
    ///
    /// Critical kinds mean a selector chain or integration needs maintenance.
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::StructureChanged
            | Self::SelectorNotFound
            | Self::MissingDependency
            | Self::ApiDeprecated => Severity::Critical,
            Self::NoResults | Self::RegionBlocked | Self::PremiumRequired => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Whether repeating the same request may succeed.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout
                | Self::ReadTimeout
                | Self::RateLimited
                | Self::ServerError
                | Self::ApiMaintenance
                | Self::NetworkUnreachable
        )
    }

    /// Classify a non-success HTTP status code.
    #[must_use]
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::AccessDenied,
            404 | 410 => Self::NotFound,
            429 => Self::RateLimited,
            300..=399 => Self::Redirect,
            503 => Self::ApiMaintenance,
            500..=599 => Self::ServerError,
            400 | 422 => Self::InvalidSearchTerms,
            451 => Self::RegionBlocked,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // serde names double as stable log keys
        let name = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("{self:?}"));
        f.write_str(&name)
    }
}

/// Reporting level derived from an [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Benign, expected in normal operation
    Warning,
    /// A single request failed
    Error,
    /// Maintenance is required
    Critical,
}

/// Errors that can be mapped onto the taxonomy.
pub trait Classify: std::error::Error {
    /// The taxonomy kind for this error.
    fn kind(&self) -> ErrorKind;

    /// Build a record for this error raised while serving `platform`.
    fn to_record(&self, platform: &str) -> ErrorRecord {
        ErrorRecord::new(self.kind(), platform, self.to_string())
    }
}

/// A classified failure, created at the boundary where it was caught.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Unique identifier for this record
    pub id: Uuid,
    /// Taxonomy kind
    pub kind: ErrorKind,
    /// Provider or scraper that raised it
    pub platform: String,
    /// Human readable message
    pub message: String,
    /// Free-form context (url, attempt, status, ...)
    pub details: BTreeMap<String, String>,
    /// When the failure was caught
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    /// Create a record stamped with the current time.
    #[must_use]
    pub fn new(kind: ErrorKind, platform: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            platform: platform.into(),
            message: message.into(),
            details: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach a detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }

    /// Derived severity.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// Derived retryability.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.platform, self.message)
    }
}
