//! Browser automation for marketplace pages.
//!
//! Provides headless browser sessions with fingerprint rotation and
//! human-like pacing. Sessions are opened through a [`SessionFactory`] so
//! every concurrent worker owns its own browser; nothing here is shared
//! between workers.

pub mod actions;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod pacing;

pub use actions::{extract_domain, PageSession, SessionFactory};
pub use engine::{BrowserEngine, ChromiumSession};
pub use error::{BrowserError, Result};
pub use fingerprint::{FingerprintConfig, FingerprintPool};
pub use pacing::HumanPacing;
