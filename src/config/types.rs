use serde::Deserialize;
use std::time::Duration;

/// Default desktop user agents rotated across browser pages
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
];

/// Main configuration structure for Menu-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub worker: WorkerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub queues: QueueConfig,
}

/// Headless browser configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    /// Run the browser without a visible window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Explicit path to a Chrome/Chromium binary (auto-detected when absent)
    #[serde(default)]
    pub executable: Option<String>,

    /// Upper bound for a single page navigation (milliseconds)
    #[serde(rename = "navigation-timeout-ms", default = "default_navigation_timeout")]
    pub navigation_timeout_ms: u64,

    /// How long to wait for the document body to appear (milliseconds)
    #[serde(rename = "body-timeout-ms", default = "default_body_timeout")]
    pub body_timeout_ms: u64,

    /// How long to wait for late-rendered menu files (milliseconds)
    #[serde(rename = "render-timeout-ms", default = "default_render_timeout")]
    pub render_timeout_ms: u64,

    /// Quiet period without new network resources before a page counts as loaded
    #[serde(rename = "network-idle-ms", default = "default_network_idle")]
    pub network_idle_ms: u64,

    /// Pool of user agents, one picked at random per page
    #[serde(rename = "user-agents", default = "default_user_agents")]
    pub user_agents: Vec<String>,
}

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Number of jobs processed concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// How many times a failed link may be queued again
    #[serde(rename = "max-link-attempts", default = "default_max_link_attempts")]
    pub max_link_attempts: u32,

    /// Sleep between polls of an empty queue (milliseconds)
    #[serde(rename = "poll-interval-ms", default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// How long a leased job stays invisible to other workers (seconds)
    #[serde(rename = "lease-seconds", default = "default_lease_seconds")]
    pub lease_seconds: u64,
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database holding the cache and the queues
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory under which harvested menu files are written
    #[serde(rename = "upload-root")]
    pub upload_root: String,

    /// Lifetime of strategy and link state entries (days)
    #[serde(rename = "cache-ttl-days", default = "default_cache_ttl_days")]
    pub cache_ttl_days: u32,
}

/// Queue names shared with the backend
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Inbound page jobs, also used for discovered subpages
    #[serde(default = "default_jobs_queue")]
    pub jobs: String,

    /// Outbound extraction results
    #[serde(default = "default_results_queue")]
    pub results: String,
}

impl BrowserSettings {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn body_timeout(&self) -> Duration {
        Duration::from_millis(self.body_timeout_ms)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    pub fn network_idle(&self) -> Duration {
        Duration::from_millis(self.network_idle_ms)
    }
}

impl WorkerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_seconds)
    }
}

impl StorageConfig {
    /// Cache entry lifetime as a duration
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.cache_ttl_days) * 24 * 60 * 60)
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            executable: None,
            navigation_timeout_ms: default_navigation_timeout(),
            body_timeout_ms: default_body_timeout(),
            render_timeout_ms: default_render_timeout(),
            network_idle_ms: default_network_idle(),
            user_agents: default_user_agents(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_link_attempts: default_max_link_attempts(),
            poll_interval_ms: default_poll_interval(),
            lease_seconds: default_lease_seconds(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs_queue(),
            results: default_results_queue(),
        }
    }
}

fn default_headless() -> bool {
    true
}

fn default_navigation_timeout() -> u64 {
    30_000
}

fn default_body_timeout() -> u64 {
    10_000
}

fn default_render_timeout() -> u64 {
    10_000
}

fn default_network_idle() -> u64 {
    500
}

fn default_user_agents() -> Vec<String> {
    DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect()
}

fn default_concurrency() -> u32 {
    4
}

fn default_max_link_attempts() -> u32 {
    3
}

fn default_poll_interval() -> u64 {
    500
}

fn default_lease_seconds() -> u64 {
    300
}

fn default_cache_ttl_days() -> u32 {
    30
}

fn default_jobs_queue() -> String {
    "scraper.page.queue".to_string()
}

fn default_results_queue() -> String {
    "backend.page.queue".to_string()
}
