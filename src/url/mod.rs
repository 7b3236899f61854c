//! URL handling module for Menu-Harvest
//!
//! Host extraction, same-host comparison and host pattern matching used by the
//! link discoverer and the file candidate filter.

mod domain;
mod matcher;

// Re-export main functions
pub use domain::{extract_domain, same_host};
pub use matcher::{matches_any_host_pattern, matches_host_pattern};
