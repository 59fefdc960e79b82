use serde::Deserialize;

/// Main configuration structure for Telescroll
///
/// Every section and key is optional; an empty file yields the defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub scraping: ScrapingConfig,
    pub guard: GuardConfig,
}

/// Browser session configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run the browser without a window
    pub headless: bool,

    /// User agent presented to the site
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    #[serde(rename = "viewport-width")]
    pub viewport_width: u32,

    #[serde(rename = "viewport-height")]
    pub viewport_height: u32,

    /// Navigation timeout (milliseconds)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Browser binary to launch instead of the auto-detected one
    #[serde(rename = "executable-path")]
    pub executable_path: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            viewport_width: 1920,
            viewport_height: 1080,
            timeout_ms: 30_000,
            executable_path: None,
        }
    }
}

/// Scroll loop configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Settle delay after each scroll (milliseconds)
    #[serde(rename = "scroll-delay-ms")]
    pub scroll_delay_ms: u64,

    /// Maximum number of scroll iterations per crawl
    #[serde(rename = "max-scroll-attempts")]
    pub max_scroll_attempts: u32,

    /// How long to wait for the feed to appear after navigation (milliseconds)
    #[serde(rename = "wait-for-selector-ms")]
    pub wait_for_selector_ms: u64,

    /// Consecutive iterations without new posts before stopping
    #[serde(rename = "stall-limit")]
    pub stall_limit: u32,

    /// Iterations before an unchanged scroll position can stop the crawl
    #[serde(rename = "position-warmup")]
    pub position_warmup: u32,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            scroll_delay_ms: 1000,
            max_scroll_attempts: 50,
            wait_for_selector_ms: 5000,
            stall_limit: 3,
            position_warmup: 5,
        }
    }
}

/// Resource guard configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Resident memory above which the crawl stops (megabytes)
    #[serde(rename = "memory-limit-mb")]
    pub memory_limit_mb: u64,

    /// Sample memory every this many iterations
    #[serde(rename = "sample-interval")]
    pub sample_interval: u32,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            memory_limit_mb: 1500,
            sample_interval: 10,
        }
    }
}
