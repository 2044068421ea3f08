use digger_core::{Classify, ErrorKind};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("navigation failed: {0}")]
    NavigationError(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("script failed: {0}")]
    ScriptError(String),

    #[error("session already closed")]
    SessionClosed,
}

impl Classify for BrowserError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::EngineUnavailable(_) => ErrorKind::MissingDependency,
            Self::ChromiumError(_) | Self::SessionClosed => ErrorKind::AutomationEngine,
            Self::NavigationError(msg) => classify_navigation(msg),
            Self::Timeout(_) => ErrorKind::ReadTimeout,
            Self::ScriptError(_) => ErrorKind::ScriptTimeout,
        }
    }
}

/// Chromium reports network failures as `net::ERR_*` codes in the message.
fn classify_navigation(message: &str) -> ErrorKind {
    if message.contains("ERR_NAME_NOT_RESOLVED") {
        ErrorKind::DnsError
    } else if message.contains("ERR_CONNECTION_TIMED_OUT") {
        ErrorKind::ConnectTimeout
    } else if message.contains("ERR_INTERNET_DISCONNECTED")
        || message.contains("ERR_ADDRESS_UNREACHABLE")
        || message.contains("ERR_NETWORK_CHANGED")
    {
        ErrorKind::NetworkUnreachable
    } else if message.contains("ERR_CERT") || message.contains("ERR_SSL") {
        ErrorKind::SslError
    } else if message.contains("ERR_CONNECTION_REFUSED") || message.contains("ERR_EMPTY_RESPONSE")
    {
        ErrorKind::SiteDown
    } else if message.contains("ERR_TOO_MANY_REDIRECTS") {
        ErrorKind::Redirect
    } else {
        ErrorKind::Unknown
    }
}
