//! Error types for provider searches.

use digger_core::{Classify, ErrorKind};
use thiserror::Error;

/// Errors that can occur while searching a provider.
///
/// None of these reach the caller of [`crate::Provider::search`]; they are
/// classified and turned into an error-tagged envelope at that boundary.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Transport failure
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {status} from {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Response body did not have the expected shape
    #[error("failed to parse response from {provider}: {message}")]
    Parse {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Request URL could not be built
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The provider needs a credential that is not configured
    #[error("no API token configured for {0}")]
    MissingToken(String),

    /// Page served a captcha or challenge instead of results
    #[error("bot protection page served by {0}")]
    BotBlocked(String),

    /// The criteria cannot be searched on this provider
    #[error("criteria not searchable on {0}")]
    Unsearchable(String),

    /// Search exceeded its time budget
    #[error("search timed out after {millis}ms")]
    Timeout {
        /// Budget in milliseconds
        millis: u64,
    },

    /// Search task ended abnormally
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;

impl SearchError {
    /// Build a parse error for `provider`.
    pub fn parse(provider: &str, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }
}

fn classify_transport(e: &reqwest::Error) -> ErrorKind {
    if let Some(status) = e.status() {
        return ErrorKind::from_http_status(status.as_u16());
    }

    let message = format!("{e:?}").to_lowercase();
    if e.is_timeout() {
        if e.is_connect() {
            ErrorKind::ConnectTimeout
        } else {
            ErrorKind::ReadTimeout
        }
    } else if e.is_connect() {
        if message.contains("dns") || message.contains("resolve") || message.contains("lookup") {
            ErrorKind::DnsError
        } else if message.contains("certificate") || message.contains("tls") {
            ErrorKind::SslError
        } else if message.contains("refused") {
            ErrorKind::SiteDown
        } else {
            ErrorKind::NetworkUnreachable
        }
    } else if e.is_redirect() {
        ErrorKind::Redirect
    } else if e.is_decode() || e.is_body() {
        ErrorKind::ApiInvalidResponse
    } else {
        ErrorKind::Unknown
    }
}

impl Classify for SearchError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(e) => classify_transport(e),
            Self::Status { status, .. } => ErrorKind::from_http_status(*status),
            Self::Parse { .. } => ErrorKind::ApiInvalidResponse,
            Self::InvalidUrl(_) => ErrorKind::ConfigError,
            Self::MissingToken(_) => ErrorKind::ApiBadKey,
            Self::BotBlocked(_) => ErrorKind::BotBlocked,
            Self::Unsearchable(_) => ErrorKind::InvalidSearchTerms,
            Self::Timeout { .. } => ErrorKind::ReadTimeout,
            Self::Internal(_) => ErrorKind::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use digger_core::Severity;

    #[test]
    fn test_status_classification() {
        let err = SearchError::Status {
            status: 429,
            url: "https://api.discogs.com/database/search".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert!(err.kind().is_retryable());

        let err = SearchError::Status {
            status: 404,
            url: "https://example.com".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_timeout_is_retryable_error() {
        let record = SearchError::Timeout { millis: 8000 }.to_record("Juno");
        assert_eq!(record.kind, ErrorKind::ReadTimeout);
        assert_eq!(record.severity(), Severity::Error);
        assert!(record.is_retryable());
    }

    #[test]
    fn test_missing_token() {
        let err = SearchError::MissingToken("Discogs".to_string());
        assert_eq!(err.kind(), ErrorKind::ApiBadKey);
        assert_eq!(err.to_string(), "no API token configured for Discogs");
    }
}
