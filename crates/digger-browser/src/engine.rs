use crate::actions::{extract_domain, PageSession, SessionFactory};
use crate::error::{BrowserError, Result};
use crate::fingerprint::{FingerprintConfig, FingerprintPool};
use crate::pacing::HumanPacing;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetTimezoneOverrideParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use digger_core::ScraperConfig;
use futures::stream::StreamExt;
use rand::Rng;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Hides the most common automation tell before any page script runs.
const STEALTH_SCRIPT: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

/// Browser automation engine.
///
/// Every call to [`SessionFactory::open`] launches a separate Chromium
/// process with the next fingerprint from the pool, so concurrent workers
/// never share a browser.
pub struct BrowserEngine {
    fingerprints: FingerprintPool,
    pacing: HumanPacing,
    headless: bool,
    simulate_human: bool,
}

impl BrowserEngine {
    /// Create an engine with a randomized fingerprint pool and default pacing
    pub fn new() -> Self {
        Self::with_fingerprints(FingerprintPool::randomized(8, true), HumanPacing::default())
    }

    /// Create an engine with a specific fingerprint pool
    pub fn with_fingerprints(fingerprints: FingerprintPool, pacing: HumanPacing) -> Self {
        Self {
            fingerprints,
            pacing,
            headless: true,
            simulate_human: true,
        }
    }

    /// Create an engine configured from the scraper settings
    pub fn from_config(config: &ScraperConfig) -> Self {
        let (min, max) = config.delay_range();
        Self {
            fingerprints: FingerprintPool::randomized(8, config.rotate_fingerprint),
            pacing: HumanPacing::new(min, max),
            headless: config.headless,
            simulate_human: config.simulate_human,
        }
    }

    /// Launch a new browser process and open one tab in it
    pub async fn launch(&self) -> Result<ChromiumSession> {
        let fingerprint = self.fingerprints.next();

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .arg(format!("--user-agent={}", fingerprint.user_agent))
            .arg(format!("--lang={}", fingerprint.primary_language()))
            .arg("--disable-blink-features=AutomationControlled");
        if !self.headless {
            builder = builder.with_head();
        }

        let config = builder.build().map_err(classify_launch_message)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| classify_launch_message(e.to_string()))?;

        // Spawn browser handler
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let mut session = ChromiumSession {
            browser: Some(browser),
            page: None,
            handler,
            fingerprint,
            pacing: self.pacing,
            simulate_human: self.simulate_human,
        };

        // Close the half-built session on any error below
        match session.prepare_page().await {
            Ok(()) => Ok(session),
            Err(e) => {
                let _ = session.close().await;
                Err(e)
            }
        }
    }
}

impl Default for BrowserEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionFactory for BrowserEngine {
    async fn open(&self) -> Result<Box<dyn PageSession>> {
        let session = self.launch().await?;
        tracing::debug!(
            user_agent = %session.fingerprint.user_agent,
            "opened browser session"
        );
        Ok(Box::new(session))
    }
}

/// A missing executable is a dependency problem, not a transient failure.
fn classify_launch_message(message: String) -> BrowserError {
    let lower = message.to_lowercase();
    if lower.contains("could not auto detect")
        || lower.contains("no such file")
        || lower.contains("not found")
    {
        BrowserError::EngineUnavailable(message)
    } else {
        BrowserError::ChromiumError(message)
    }
}

fn navigation_error(e: CdpError) -> BrowserError {
    match e {
        CdpError::Timeout => BrowserError::Timeout("navigation timed out".to_string()),
        other => BrowserError::NavigationError(other.to_string()),
    }
}

/// One Chromium process with a single tab.
///
/// Dropping the session aborts the event handler and lets chromiumoxide kill
/// the child process, so a cancelled worker never leaks a browser.
pub struct ChromiumSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler: JoinHandle<()>,
    fingerprint: FingerprintConfig,
    pacing: HumanPacing,
    simulate_human: bool,
}

impl ChromiumSession {
    pub fn fingerprint(&self) -> &FingerprintConfig {
        &self.fingerprint
    }

    async fn prepare_page(&mut self) -> Result<()> {
        let browser = self.browser.as_ref().ok_or(BrowserError::SessionClosed)?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        if let Err(e) = page.evaluate_on_new_document(STEALTH_SCRIPT).await {
            tracing::warn!("failed to install stealth script: {}", e);
        }
        if let Err(e) = page
            .execute(SetTimezoneOverrideParams::new(self.fingerprint.timezone.clone()))
            .await
        {
            tracing::warn!("failed to override timezone: {}", e);
        }

        self.page = Some(page);
        Ok(())
    }

    fn page(&self) -> Result<&Page> {
        self.page.as_ref().ok_or(BrowserError::SessionClosed)
    }

    async fn eval(&self, script: String) -> Result<()> {
        self.page()?
            .evaluate(script)
            .await
            .map(|_| ())
            .map_err(|e| BrowserError::ScriptError(e.to_string()))
    }

    async fn short_beat() {
        let millis = rand::thread_rng().gen_range(120..=400);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}

#[async_trait::async_trait]
impl PageSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let domain = extract_domain(url)?;
        tracing::debug!(domain = %domain, "navigating to {}", url);
        let page = self.page()?;
        match tokio::time::timeout(timeout, page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(navigation_error(e)),
            Err(_) => Err(BrowserError::Timeout(format!(
                "{url} did not load within {timeout:?}"
            ))),
        }
    }

    async fn content(&mut self) -> Result<String> {
        self.page()?
            .content()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))
    }

    async fn simulate_reading(&mut self) -> Result<()> {
        if !self.simulate_human {
            return Ok(());
        }

        let path = self
            .pacing
            .pointer_path(self.fingerprint.viewport_width, self.fingerprint.viewport_height);
        for (x, y) in path {
            self.eval(format!(
                "document.dispatchEvent(new MouseEvent('mousemove', {{ clientX: {x:.0}, clientY: {y:.0}, bubbles: true }}))"
            ))
            .await?;
            Self::short_beat().await;
        }

        for px in self.pacing.scroll_plan() {
            self.eval(format!("window.scrollBy(0, {px})")).await?;
            Self::short_beat().await;
        }
        Ok(())
    }

    async fn pause(&mut self) {
        self.pacing.pause().await;
    }

    async fn close(&mut self) -> Result<()> {
        let mut first_error = None;

        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                first_error.get_or_insert(BrowserError::ChromiumError(e.to_string()));
            }
        }
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                first_error.get_or_insert(BrowserError::ChromiumError(e.to_string()));
            }
            let _ = browser.wait().await;
        }
        self.handler.abort();

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if self.browser.is_some() {
            tracing::debug!("browser session dropped without close; killing process");
        }
        self.handler.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_executable_is_unavailable() {
        let err = classify_launch_message(
            "Could not auto detect a chrome executable".to_string(),
        );
        assert!(matches!(err, BrowserError::EngineUnavailable(_)));

        let err = classify_launch_message("websocket closed".to_string());
        assert!(matches!(err, BrowserError::ChromiumError(_)));
    }

    #[test]
    fn test_from_config() {
        let mut config = ScraperConfig::default();
        config.headless = false;
        config.rotate_fingerprint = false;
        let engine = BrowserEngine::from_config(&config);
        assert!(!engine.headless);
        assert_eq!(engine.fingerprints.next(), engine.fingerprints.next());
    }
}
