//! Process-wide switch for the scraping subsystem.

use crate::error::{MarketError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Shared by the listing scraper and the enrichment engine.
///
/// Once the automation engine is found missing, the gate closes and both
/// refuse further work for the rest of the process.
#[derive(Debug, Default)]
pub struct ScrapingGate {
    closed: AtomicBool,
    reason: Mutex<Option<String>>,
}

impl ScrapingGate {
    /// An open gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True while scraping is allowed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    /// Close the gate. The first reason wins.
    pub fn disable(&self, reason: impl Into<String>) {
        let mut current = self.reason.lock().expect("acquire gate reason lock");
        if current.is_none() {
            let reason = reason.into();
            tracing::error!("disabling marketplace scraping: {}", reason);
            *current = Some(reason);
        }
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Fail with [`MarketError::Disabled`] when closed.
    pub fn check(&self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }
        let reason = self
            .reason
            .lock()
            .expect("acquire gate reason lock")
            .clone()
            .unwrap_or_default();
        Err(MarketError::Disabled(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_closes_once() {
        let gate = ScrapingGate::new();
        assert!(gate.check().is_ok());

        gate.disable("chromium not found");
        gate.disable("second reason");

        assert!(!gate.is_open());
        match gate.check() {
            Err(MarketError::Disabled(reason)) => assert_eq!(reason, "chromium not found"),
            other => panic!("expected disabled, got {other:?}"),
        }
    }
}
