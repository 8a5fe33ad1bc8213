use serde::Deserialize;

/// Main configuration structure for a harvest run
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub harvester: HarvesterConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub seeds: SeedConfig,
}

/// Harvest loop behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HarvesterConfig {
    /// Maximum number of item pipelines running at once
    pub workers: usize,

    /// Write a checkpoint to the sinks after this many completed items
    /// (0 disables checkpoints)
    pub checkpoint_every: usize,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            checkpoint_every: 10,
        }
    }
}

/// Fetch retry policy and HTTP transport settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FetcherConfig {
    /// Attempts per item before giving up
    pub max_attempts: u32,

    /// Timeout for each individual attempt (seconds)
    pub attempt_timeout_secs: u64,

    /// Pause between attempts (milliseconds)
    pub retry_delay_ms: u64,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Accept invalid or self-signed TLS certificates
    pub accept_invalid_certs: bool,

    /// Directory search URL with a `{query}` placeholder, used for query items
    pub search_url_template: Option<String>,

    /// Optional outbound proxy
    pub proxy: Option<ProxyConfig>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            attempt_timeout_secs: 120,
            retry_delay_ms: 1000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            accept_invalid_certs: true,
            search_url_template: None,
            proxy: None,
        }
    }
}

/// Outbound proxy; credentials come from the environment
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProxyConfig {
    /// Proxy URL, e.g. `http://proxy.example.net:33335`
    pub url: String,

    /// Environment variable holding the proxy user name
    pub username_env: Option<String>,

    /// Environment variable holding the proxy password
    pub password_env: Option<String>,
}

/// Budget gate limits for model calls
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BudgetConfig {
    pub tokens_per_window: u64,
    pub requests_per_window: u32,
    /// Length of the rolling window (seconds)
    pub window_secs: u64,
    /// Callers allowed inside the gate at once
    pub max_concurrent: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            tokens_per_window: 10_000,
            requests_per_window: 30,
            window_secs: 60,
            max_concurrent: 3,
        }
    }
}

/// External model used by the fallback extractor
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ModelConfig {
    /// Disable to run with structured extraction only
    pub enabled: bool,

    /// Base URL of an OpenAI-compatible API
    pub endpoint: String,

    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Total context window of the model (prompt + response tokens)
    pub context_tokens: u32,

    /// Tokens reserved for the response when budgeting a call
    pub response_reserve: u32,

    /// Upper bound on response tokens
    pub max_response_tokens: u32,

    /// Raw content is truncated to this many characters in prompts
    pub content_char_limit: usize,

    pub temperature: f32,

    /// Fields whose absence triggers a fallback call (category is always
    /// required)
    pub required_fields: Vec<String>,

    /// Per-request timeout for model calls (seconds)
    pub request_timeout_secs: u64,

    /// Ask the model for search phrasings of each (location, category)
    /// seed before the run starts
    pub expand_queries: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            context_tokens: 4096,
            response_reserve: 200,
            max_response_tokens: 1500,
            content_char_limit: 4000,
            temperature: 0.2,
            required_fields: vec!["category".to_string()],
            request_timeout_secs: 60,
            expand_queries: false,
        }
    }
}

/// Link discovery
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DiscoveryConfig {
    /// A discovered link is followed if it contains any of these keywords
    pub keywords: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            keywords: vec!["wellness".to_string()],
        }
    }
}

/// Optional overrides for the structured extractor's selector lists
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExtractionConfig {
    pub name_selectors: Option<Vec<String>>,
    pub phone_selectors: Option<Vec<String>>,
    pub email_selectors: Option<Vec<String>>,
    pub address_selectors: Option<Vec<String>>,
}

/// Output sinks; at least one path should be set for a useful run
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// Path of the CSV file rewritten at each checkpoint
    pub csv_path: Option<String>,

    /// Path of the SQLite database holding the `businesses` table
    pub database_path: Option<String>,
}

/// Initial work items
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SeedConfig {
    /// Page URLs to visit
    pub urls: Vec<String>,

    /// Locations crossed with `categories` to form directory queries
    pub locations: Vec<String>,

    pub categories: Vec<String>,
}

impl SeedConfig {
    /// Returns the number of seed items the config describes
    pub fn item_count(&self) -> usize {
        self.urls.len() + self.locations.len() * self.categories.len()
    }
}
