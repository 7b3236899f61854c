//! Statistics from the shared cache and queues
//!
//! This module provides functionality for extracting and displaying
//! the backlog and cache contents behind the `status` command.

use crate::config::QueueConfig;
use crate::state::{LINK_PREFIX, STRATEGY_PREFIX};
use crate::storage::{CacheStore, MessageQueue};
use crate::HarvestError;

/// Queue and cache summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStatistics {
    /// Name of the inbound job queue
    pub job_queue: String,

    /// Jobs waiting or leased on the job queue
    pub pending_jobs: u64,

    /// Name of the result queue
    pub result_queue: String,

    /// Results not yet consumed by the backend
    pub pending_results: u64,

    /// Hostnames with a cached extraction strategy
    pub cached_strategies: u64,

    /// Links with a recorded crawl state
    pub tracked_links: u64,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `cache` - The shared cache
/// * `queue` - The message queue
/// * `queues` - Names of the job and result queues
///
/// # Returns
///
/// * `Ok(QueueStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query storage
pub async fn load_statistics(
    cache: &dyn CacheStore,
    queue: &dyn MessageQueue,
    queues: &QueueConfig,
) -> Result<QueueStatistics, HarvestError> {
    Ok(QueueStatistics {
        job_queue: queues.jobs.clone(),
        pending_jobs: queue.depth(&queues.jobs).await?,
        result_queue: queues.results.clone(),
        pending_results: queue.depth(&queues.results).await?,
        cached_strategies: cache.count_prefix(STRATEGY_PREFIX).await?,
        tracked_links: cache.count_prefix(LINK_PREFIX).await?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &QueueStatistics) {
    println!("=== Menu-Harvest Status ===\n");

    println!("Queues:");
    println!("  {}: {} pending jobs", stats.job_queue, stats.pending_jobs);
    println!(
        "  {}: {} unconsumed results",
        stats.result_queue, stats.pending_results
    );
    println!();

    println!("Cache:");
    println!("  Hostname strategies: {}", stats.cached_strategies);
    println!("  Tracked links: {}", stats.tracked_links);
}
