//! Menu-Harvest: a restaurant menu scraping worker
//!
//! This crate consumes page jobs from a durable queue, renders each page in a
//! headless browser and tries a fixed pipeline of extraction methods against it:
//! an API hook, a DOM selector inference engine and a menu file harvester.
//! The winning method is remembered per hostname, same-host links are queued as
//! subpage jobs, and every outcome is published back to the results queue.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod job;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Menu-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Download of {url} failed with status {status}")]
    DownloadStatus { url: String, status: u16 },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid path in config: {0}")]
    InvalidPath(String),
}

/// Result type alias for Menu-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use extract::ExtractionMethod;
pub use job::{CrawlJob, ExtractionResult, JobKind};
pub use state::{ExtractionStrategy, LinkCrawlState, LinkStatus};
pub use url::{extract_domain, same_host};
