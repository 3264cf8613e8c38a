//! Client configuration

use std::time::Duration;

/// Default quiet period before a debounced search fires
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 1000;

/// Default page size for searchable collections
pub const DEFAULT_PAGE_SIZE: i32 = 25;

/// Client configuration for connecting to the catalog API
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | PIM_API_URL | http://localhost:5000 | API base URL |
/// | PIM_API_TOKEN | - | Bearer token |
/// | PIM_REQUEST_TIMEOUT_SECS | 30 | Request timeout |
/// | PIM_SEARCH_DEBOUNCE_MS | 1000 | Debounce for free-text search |
/// | PIM_DEFAULT_PAGE_SIZE | 25 | Initial page size of collections |
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL (e.g., "http://localhost:5000/api")
    pub base_url: String,

    /// Bearer token for authentication
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Debounce period of `Searchable::delayed_load`, in milliseconds
    pub search_debounce_ms: u64,

    /// Initial page size of searchable collections
    pub default_page_size: i32,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: 30,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Load configuration from the environment (and a `.env` file if present)
    ///
    /// Unset or unparsable variables fall back to their defaults.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let mut config = Self::new(
            std::env::var("PIM_API_URL").unwrap_or_else(|_| "http://localhost:5000".into()),
        );
        config.token = std::env::var("PIM_API_TOKEN").ok().filter(|t| !t.is_empty());
        config.timeout = std::env::var("PIM_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.timeout);
        config.search_debounce_ms = std::env::var("PIM_SEARCH_DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.search_debounce_ms);
        config.default_page_size = std::env::var("PIM_DEFAULT_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|size: &i32| *size >= -1)
            .unwrap_or(config.default_page_size);
        config
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Set the search debounce period
    pub fn with_search_debounce(mut self, millis: u64) -> Self {
        self.search_debounce_ms = millis;
        self
    }

    /// Set the initial page size (`-1` = unbounded)
    pub fn with_default_page_size(mut self, page_size: i32) -> Self {
        self.default_page_size = page_size;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:5000")
    }
}
