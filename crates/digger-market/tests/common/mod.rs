//! In-memory browser for marketplace tests.

#![allow(dead_code)]

use async_trait::async_trait;
use digger_browser::{BrowserError, PageSession, Result, SessionFactory};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How a fake URL behaves.
#[derive(Clone)]
pub enum Page {
    Html(String),
    /// Times out on the first `n` loads, then serves the page
    SlowThen(usize, String),
    /// Never loads
    Timeout,
    /// Loads after a real delay
    Delayed(Duration, String),
}

/// Shared state of all sessions opened by one [`FakeBrowser`].
#[derive(Default)]
pub struct FakeBrowser {
    pages: Mutex<HashMap<String, Page>>,
    loads: Mutex<HashMap<String, usize>>,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub navigations: AtomicUsize,
    missing: bool,
}

impl FakeBrowser {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A browser whose executable cannot be found.
    pub fn missing() -> Arc<Self> {
        Arc::new(Self {
            missing: true,
            ..Self::default()
        })
    }

    pub fn serve(&self, url: impl Into<String>, page: Page) {
        self.pages.lock().expect("acquire pages lock").insert(url.into(), page);
    }

    pub fn loads_of(&self, url: &str) -> usize {
        self.loads
            .lock()
            .expect("acquire loads lock")
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    /// Every load of a URL starting with `prefix`.
    pub fn loads_with_prefix(&self, prefix: &str) -> usize {
        self.loads
            .lock()
            .expect("acquire loads lock")
            .iter()
            .filter(|(url, _)| url.starts_with(prefix))
            .map(|(_, n)| n)
            .sum()
    }
}

/// Factory handle, so tests keep the browser for assertions.
pub struct FakeSessions(pub Arc<FakeBrowser>);

#[async_trait]
impl SessionFactory for FakeSessions {
    async fn open(&self) -> Result<Box<dyn PageSession>> {
        if self.0.missing {
            return Err(BrowserError::EngineUnavailable(
                "Could not auto detect a chrome executable".to_string(),
            ));
        }
        self.0.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            browser: Arc::clone(&self.0),
            current: None,
        }))
    }
}

pub struct FakeSession {
    browser: Arc<FakeBrowser>,
    current: Option<String>,
}

#[async_trait]
impl PageSession for FakeSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        self.browser.navigations.fetch_add(1, Ordering::SeqCst);
        let attempt = {
            let mut loads = self.browser.loads.lock().expect("acquire loads lock");
            let count = loads.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        let page = self
            .browser
            .pages
            .lock()
            .expect("acquire pages lock")
            .get(url)
            .cloned();

        let html = match page {
            Some(Page::Html(html)) => html,
            Some(Page::SlowThen(n, html)) if attempt > n => html,
            Some(Page::SlowThen(..) | Page::Timeout) => {
                return Err(BrowserError::Timeout(format!("{url} after {timeout:?}")));
            }
            Some(Page::Delayed(delay, html)) => {
                tokio::time::sleep(delay).await;
                html
            }
            None => {
                return Err(BrowserError::NavigationError(format!(
                    "net::ERR_NAME_NOT_RESOLVED at {url}"
                )))
            }
        };
        self.current = Some(html);
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        self.current.clone().ok_or(BrowserError::SessionClosed)
    }

    async fn simulate_reading(&mut self) -> Result<()> {
        Ok(())
    }

    async fn pause(&mut self) {}

    async fn close(&mut self) -> Result<()> {
        self.browser.closed.fetch_add(1, Ordering::SeqCst);
        self.current = None;
        Ok(())
    }
}

/// Detail page stating a shipping cost next to the price.
pub fn detail_page(price: &str, shipping: &str) -> String {
    format!(
        r#"<html><body><div id="page_content"><span class="price">{price}</span><span class="shipping">{shipping}</span></div></body></html>"#
    )
}

/// Detail page refusing delivery to `country_name`.
pub fn unavailable_page(country_name: &str) -> String {
    format!(
        r#"<html><body><div id="page_content"><span class="price">€10.00</span><p>Unavailable in {country_name}</p></div></body></html>"#
    )
}
