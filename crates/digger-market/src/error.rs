//! Error types for the marketplace subsystem.

use digger_browser::BrowserError;
use digger_core::{Classify, CoreError, ErrorKind};
use thiserror::Error;

/// Errors that can occur while scraping or enriching marketplace offers.
#[derive(Error, Debug)]
pub enum MarketError {
    /// Browser session failure
    #[error(transparent)]
    Browser(#[from] BrowserError),

    /// Invalid release id, country, or limit
    #[error("invalid input: {0}")]
    Validation(String),

    /// Scraping was switched off after the automation engine went missing
    #[error("scraping disabled: {0}")]
    Disabled(String),

    /// Captcha or challenge page instead of the listing
    #[error("bot protection page at {0}")]
    BotBlocked(String),

    /// Listing page loaded but its layout is unrecognisable
    #[error("page structure changed: {0}")]
    StructureChanged(String),
}

/// Result type alias for marketplace operations.
pub type Result<T> = std::result::Result<T, MarketError>;

impl From<CoreError> for MarketError {
    fn from(e: CoreError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl MarketError {
    /// True for page-load timeouts.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Browser(BrowserError::Timeout(_)))
    }
}

impl Classify for MarketError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Browser(e) => e.kind(),
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::Disabled(_) => ErrorKind::MissingDependency,
            Self::BotBlocked(_) => ErrorKind::BotBlocked,
            Self::StructureChanged(_) => ErrorKind::StructureChanged,
        }
    }
}
