//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::engine::{PageUrls, DEFAULT_MIN_LISTINGS, LISTING_TTL};
use crate::listing::SelectorSet;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use url::Url;

/// First results page harvested when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://www.avito.ru/chelyabinsk/kvartiry/sdam/na_dlitelnyy_srok-ASgBAgICAkSSA8gQ8AeQUg?context=H4sIAAAAAAAA_wEjANz_YToxOntzOjg6ImZyb21QYWdlIjtzOjc6ImNhdGFsb2ciO312FITcIwAAAA&district=16";

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Page-1 URL of the results listing
    pub base_url: String,

    /// Prefix for relative listing links; defaults to the origin of `base_url`
    pub site_origin: Option<String>,

    /// Redis connection URL
    pub redis_url: String,

    /// Proxy URL (e.g., socks5://host:port)
    pub proxy: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Wait after the load event before querying the page
    pub settle_delay_ms: u64,

    /// Attempts for each page check and page fetch
    pub retry_attempts: u32,

    /// Fixed delay between attempts
    pub retry_delay_ms: u64,

    /// Base delay between processed pages
    pub page_delay_ms: u64,

    /// Random jitter added to the page delay (0 to this value)
    pub delay_jitter_ms: u64,

    /// Delay between cycles
    pub cycle_delay_secs: u64,

    /// Listing elements required for a page to be valid
    pub min_listings: usize,

    /// Highest page number requested in one cycle
    pub max_pages: u32,

    /// Consecutive failed page checks before a cycle gives up
    pub max_failed_pages: u32,

    /// Lifetime of a persisted listing
    pub listing_ttl_secs: u64,

    /// Output format
    pub format: OutputFormat,

    /// Selector chain overrides
    pub selectors: SelectorSet,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            site_origin: None,
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            proxy: None,
            timeout_secs: 30,
            settle_delay_ms: 2000,
            retry_attempts: 3,
            retry_delay_ms: 2000,
            page_delay_ms: 2000,
            delay_jitter_ms: 1000,
            cycle_delay_secs: 60,
            min_listings: DEFAULT_MIN_LISTINGS,
            max_pages: 50,
            max_failed_pages: 10,
            listing_ttl_secs: LISTING_TTL.as_secs(),
            format: OutputFormat::Table,
            selectors: SelectorSet::default(),
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new("harvester.toml");
        if local_config.exists() {
            debug!("Found harvester.toml in current directory");
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("listing-harvester").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides. Unparseable values are ignored.
    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var("HARVEST_BASE_URL") {
            self.base_url = url;
        }

        if let Ok(origin) = std::env::var("HARVEST_SITE_ORIGIN") {
            self.site_origin = Some(origin);
        }

        if let Ok(url) = std::env::var("HARVEST_REDIS_URL") {
            self.redis_url = url;
        }

        if let Ok(proxy) = std::env::var("HARVEST_PROXY") {
            self.proxy = Some(proxy);
        }

        if let Some(secs) = env_number("HARVEST_TIMEOUT") {
            self.timeout_secs = secs;
        }

        if let Some(ms) = env_number("HARVEST_PAGE_DELAY") {
            self.page_delay_ms = ms;
        }

        if let Some(secs) = env_number("HARVEST_CYCLE_DELAY") {
            self.cycle_delay_secs = secs;
        }

        self
    }

    /// Origin used to absolutize relative listing links.
    pub fn origin(&self, urls: &PageUrls) -> Result<Url> {
        match &self.site_origin {
            Some(origin) => {
                Url::parse(origin).with_context(|| format!("Invalid site origin: {}", origin))
            }
            None => Ok(urls.origin()),
        }
    }
}

fn env_number(name: &str) -> Option<u64> {
    std::env::var(name).ok()?.trim().parse().ok()
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use: table, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
