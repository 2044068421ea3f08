//! Configuration management for Digger.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::retry::RetryPolicy;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/digger/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Provider fan-out settings
    pub search: SearchConfig,
    /// Relevance scorer weights
    pub scoring: ScoringWeights,
    /// Marketplace listing scraper settings
    pub scraper: ScraperConfig,
    /// Offer enrichment settings
    pub enrichment: EnrichmentConfig,
    /// Provider endpoints and credentials
    pub providers: ProviderConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `DIGGER_DISCOGS_TOKEN`: Discogs API token
    /// - `DIGGER_HEADLESS`: Override browser headless mode (true/false)
    /// - `DIGGER_CACHE_TTL_SECS`: Override listing cache TTL
    /// - `DIGGER_SEARCH_WORKERS`: Override search fan-out width
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("DIGGER_DISCOGS_TOKEN") {
            if !token.trim().is_empty() {
                self.providers.discogs_token = Some(token.trim().to_string());
                tracing::debug!("Override providers.discogs_token from env");
            }
        }

        if let Some(val) = lookup("DIGGER_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.scraper.headless = headless;
                tracing::debug!("Override scraper.headless from env: {}", headless);
            }
        }

        if let Some(val) = lookup("DIGGER_CACHE_TTL_SECS") {
            if let Ok(ttl) = val.parse() {
                self.scraper.cache_ttl_secs = ttl;
                tracing::debug!("Override scraper.cache_ttl_secs from env: {}", ttl);
            }
        }

        if let Some(val) = lookup("DIGGER_SEARCH_WORKERS") {
            if let Ok(workers) = val.parse() {
                self.search.workers = workers;
                tracing::debug!("Override search.workers from env: {}", workers);
            }
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        fn invalid(field: &str, reason: &str) -> ConfigError {
            ConfigError::InvalidValue {
                field: field.to_string(),
                reason: reason.to_string(),
            }
        }

        if self.search.workers == 0 {
            return Err(invalid("search.workers", "must be at least 1"));
        }
        if self.search.top_k == 0 || self.search.top_k > 3 {
            return Err(invalid("search.top_k", "must be between 1 and 3"));
        }
        if self.scraper.min_delay_ms > self.scraper.max_delay_ms {
            return Err(invalid("scraper.min_delay_ms", "must not exceed max_delay_ms"));
        }
        if self.scraper.admission_wait_min_ms > self.scraper.admission_wait_max_ms {
            return Err(invalid(
                "scraper.admission_wait_min_ms",
                "must not exceed admission_wait_max_ms",
            ));
        }
        if self.scraper.max_concurrent_sessions == 0 {
            return Err(invalid("scraper.max_concurrent_sessions", "must be at least 1"));
        }
        if self.enrichment.workers == 0 {
            return Err(invalid("enrichment.workers", "must be at least 1"));
        }
        if self.enrichment.extended_timeout_secs < self.enrichment.page_timeout_secs {
            return Err(invalid(
                "enrichment.extended_timeout_secs",
                "must not be shorter than page_timeout_secs",
            ));
        }
        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/digger/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "digger", "digger").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/digger`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "digger", "digger").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

/// Provider fan-out settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Concurrent provider searches
    pub workers: usize,
    /// Budget for one provider search in seconds
    pub task_timeout_secs: u64,
    /// Budget for the whole fan-out in seconds
    pub overall_timeout_secs: u64,
    /// Raw results scored per provider (1-3)
    pub top_k: usize,
    /// User agent sent to JSON APIs and store pages
    pub user_agent: String,
    /// Bind outgoing sockets to IPv4 only
    pub ipv4_only: bool,
    /// Retry policy for provider HTTP requests
    pub retry: RetryPolicy,
}

impl SearchConfig {
    /// Per-provider timeout.
    #[must_use]
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    /// Whole fan-out timeout.
    #[must_use]
    pub fn overall_timeout(&self) -> Duration {
        Duration::from_secs(self.overall_timeout_secs)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            task_timeout_secs: 8,
            overall_timeout_secs: 20,
            top_k: 3,
            user_agent: "Digger/0.1.0 (+https://github.com/digger-music/digger)".to_string(),
            ipv4_only: true,
            retry: RetryPolicy::new(2),
        }
    }
}

/// Relevance scorer weights.
///
/// Empirically tuned constants; kept configurable rather than fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Base score when both artist and track match
    pub both_terms: u32,
    /// Base score when exactly one matches
    pub one_term: u32,
    /// Bonus per term found inside the result title
    pub title_bonus: u32,
    /// Bonus per term matched as a whole word
    pub whole_word_bonus: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            both_terms: 10,
            one_term: 5,
            title_bonus: 3,
            whole_word_bonus: 2,
        }
    }
}

/// Marketplace listing scraper settings.
///
/// Owned by exactly one scraper instance and never changed after it is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ScraperConfig {
    /// Lower bound of the randomized delay between browser actions
    pub min_delay_ms: u64,
    /// Upper bound of the randomized delay between browser actions
    pub max_delay_ms: u64,
    /// Budget for one listing scrape in seconds
    pub request_timeout_secs: u64,
    /// Navigation retries for retryable failures
    pub max_retries: u32,
    /// Run the browser without a window
    pub headless: bool,
    /// Pick a fresh fingerprint for every session
    pub rotate_fingerprint: bool,
    /// Scroll and move the pointer before reading the DOM
    pub simulate_human: bool,
    /// Serve repeated scrapes from the TTL cache
    pub cache_enabled: bool,
    /// Cache entry lifetime in seconds
    pub cache_ttl_secs: u64,
    /// Offers kept per release
    pub max_offers_per_release: usize,
    /// Browser sessions allowed at once before backpressure kicks in
    pub max_concurrent_sessions: usize,
    /// Lower bound of the admission backoff
    pub admission_wait_min_ms: u64,
    /// Upper bound of the admission backoff
    pub admission_wait_max_ms: u64,
    /// Marketplace origin
    pub marketplace_url: String,
}

impl ScraperConfig {
    /// Scrape budget.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Cache entry lifetime.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Delay range between browser actions.
    #[must_use]
    pub fn delay_range(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.min_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1500,
            max_delay_ms: 4000,
            request_timeout_secs: 60,
            max_retries: 2,
            headless: true,
            rotate_fingerprint: true,
            simulate_human: true,
            cache_enabled: true,
            cache_ttl_secs: 3600,
            max_offers_per_release: 50,
            max_concurrent_sessions: 3,
            admission_wait_min_ms: 5000,
            admission_wait_max_ms: 10_000,
            marketplace_url: "https://www.discogs.com".to_string(),
        }
    }
}

/// Execution strategy for offer enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStrategy {
    /// One reused browser session, lower resource use
    Sequential,
    /// One session per worker, lower latency
    Parallel,
}

/// Offer enrichment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Sequential or parallel execution
    pub strategy: EnrichmentStrategy,
    /// Workers (and browser sessions) in parallel mode
    pub workers: usize,
    /// Stop once this many offers are enriched and confirmed available
    pub early_exit_after: usize,
    /// First page-load budget in seconds
    pub page_timeout_secs: u64,
    /// Budget of the single retry in seconds
    pub extended_timeout_secs: u64,
}

impl EnrichmentConfig {
    /// First page-load budget.
    #[must_use]
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    /// Retry budget.
    #[must_use]
    pub fn extended_timeout(&self) -> Duration {
        Duration::from_secs(self.extended_timeout_secs)
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            strategy: EnrichmentStrategy::Parallel,
            workers: 4,
            early_exit_after: 5,
            page_timeout_secs: 12,
            extended_timeout_secs: 30,
        }
    }
}

/// Provider endpoints and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Discogs API token (from env, never written to disk)
    #[serde(skip)]
    pub discogs_token: Option<String>,
    /// Discogs API origin
    pub discogs_api_url: String,
    /// Revibed origin
    pub revibed_url: String,
    /// Bandcamp origin
    pub bandcamp_url: String,
    /// Juno origin
    pub juno_url: String,
    /// iTunes Search API origin
    pub itunes_url: String,
    /// Storefront country for iTunes prices
    pub itunes_country: String,
    /// Deezer API origin
    pub deezer_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            discogs_token: None,
            discogs_api_url: "https://api.discogs.com".to_string(),
            revibed_url: "https://revibed.com".to_string(),
            bandcamp_url: "https://bandcamp.com".to_string(),
            juno_url: "https://www.juno.co.uk".to_string(),
            itunes_url: "https://itunes.apple.com".to_string(),
            itunes_country: "US".to_string(),
            deezer_url: "https://api.deezer.com".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    /// JSON-lines error log; `None` keeps records in memory only
    pub error_log_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,digger=debug".to_string(),
            error_log_path: None,
        }
    }
}
