//! Human-readable output for the CLI
//!
//! This module handles:
//! - Queue and cache statistics for the `status` command
//! - Offline page inspection for the `inspect` command

mod inspect;
pub mod stats;

pub use inspect::{inspect_html, print_inspection, InspectionReport};
pub use stats::{load_statistics, print_statistics, QueueStatistics};
