//! Configuration module for Menu-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section except `[storage]` may be omitted and falls back to defaults.
//!
//! # Example
//!
//! ```no_run
//! use menu_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("menu-harvest.toml")).unwrap();
//! println!("Jobs are read from: {}", config.queues.jobs);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrowserSettings, Config, QueueConfig, StorageConfig, WorkerConfig, DEFAULT_USER_AGENTS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
