//! Per-source search implementations.
//!
//! Each module exposes a `search` function returning the provider's raw
//! results; scoring and error conversion happen in [`crate::provider`].

pub mod common;
pub(crate) mod bandcamp;
pub(crate) mod deezer;
pub(crate) mod discogs;
pub(crate) mod itunes;
pub(crate) mod juno;
pub(crate) mod revibed;
