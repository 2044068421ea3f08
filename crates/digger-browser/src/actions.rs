use crate::error::{BrowserError, Result};
use std::time::Duration;

/// One browser tab owned by one worker.
///
/// Implementations are not shared between concurrent workers; a worker may
/// reuse its session for several page visits in a row.
#[async_trait::async_trait]
pub trait PageSession: Send {
    /// Navigate to a URL, failing with [`BrowserError::Timeout`] when the
    /// page does not load within `timeout`
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;

    /// Serialized DOM of the current page
    async fn content(&mut self) -> Result<String>;

    /// Scroll and move the pointer the way a reader would
    async fn simulate_reading(&mut self) -> Result<()>;

    /// Wait a randomized inter-action delay
    async fn pause(&mut self);

    /// Release the tab and its browser process
    async fn close(&mut self) -> Result<()>;
}

/// Opens fresh, independent sessions.
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync {
    /// Open a new session, failing with [`BrowserError::EngineUnavailable`]
    /// when no browser can be started at all
    async fn open(&self) -> Result<Box<dyn PageSession>>;
}

/// Helper to extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {}", e)))?;

    url.host_str()
        .ok_or_else(|| BrowserError::NavigationError("No host in URL".to_string()))
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://www.discogs.com/sell/release/249504").unwrap(),
            "www.discogs.com"
        );
        assert_eq!(
            extract_domain("http://localhost:8080/sell/item/1").unwrap(),
            "localhost"
        );
    }

    #[test]
    fn test_extract_domain_invalid() {
        assert!(extract_domain("not-a-url").is_err());
    }
}
