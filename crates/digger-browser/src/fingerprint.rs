use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Common desktop user agents
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36 Edg/123.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

/// Common viewport sizes
const VIEWPORTS: &[(u32, u32)] = &[(1920, 1080), (1366, 768), (1536, 864), (1440, 900), (1680, 1050)];

/// Timezone and accept-language pairs that look plausible together
const LOCALES: &[(&str, &str)] = &[
    ("Europe/Berlin", "de-DE,de;q=0.9,en;q=0.8"),
    ("Europe/London", "en-GB,en;q=0.9"),
    ("America/New_York", "en-US,en;q=0.9"),
    ("Europe/Paris", "fr-FR,fr;q=0.9,en;q=0.8"),
    ("Europe/Amsterdam", "nl-NL,nl;q=0.9,en;q=0.8"),
];

/// Fingerprint configuration for anti-detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintConfig {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub timezone: String,
    pub accept_language: String,
}

impl FingerprintConfig {
    /// Generate a randomized fingerprint configuration
    pub fn randomized() -> Self {
        let mut rng = rand::thread_rng();

        let ua_idx = rng.gen_range(0..USER_AGENTS.len());
        let (width, height) = VIEWPORTS[rng.gen_range(0..VIEWPORTS.len())];
        let (timezone, language) = LOCALES[rng.gen_range(0..LOCALES.len())];

        Self {
            user_agent: USER_AGENTS[ua_idx].to_string(),
            viewport_width: width,
            viewport_height: height,
            timezone: timezone.to_string(),
            accept_language: language.to_string(),
        }
    }

    /// First language tag, as passed to `--lang`
    pub fn primary_language(&self) -> &str {
        self.accept_language
            .split([',', ';'])
            .next()
            .unwrap_or("en-US")
    }
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENTS[0].to_string(),
            viewport_width: 1920,
            viewport_height: 1080,
            timezone: "Europe/Berlin".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}

/// Pool of fingerprints handed out to new sessions.
///
/// With rotation enabled every session gets the next profile in a shuffled
/// round-robin; otherwise the first profile is reused.
#[derive(Debug)]
pub struct FingerprintPool {
    profiles: Vec<FingerprintConfig>,
    cursor: AtomicUsize,
    rotate: bool,
}

impl FingerprintPool {
    /// Build a pool of `size` randomized profiles.
    pub fn randomized(size: usize, rotate: bool) -> Self {
        let profiles = (0..size.max(1))
            .map(|_| FingerprintConfig::randomized())
            .collect();
        Self::from_profiles(profiles, rotate)
    }

    /// Build a pool from explicit profiles.
    pub fn from_profiles(mut profiles: Vec<FingerprintConfig>, rotate: bool) -> Self {
        if profiles.is_empty() {
            profiles.push(FingerprintConfig::default());
        }
        if rotate {
            profiles.shuffle(&mut rand::thread_rng());
        }
        Self {
            profiles,
            cursor: AtomicUsize::new(0),
            rotate,
        }
    }

    /// Fingerprint for the next session.
    pub fn next(&self) -> FingerprintConfig {
        if !self.rotate {
            return self.profiles[0].clone();
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.profiles.len();
        self.profiles[idx].clone()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
