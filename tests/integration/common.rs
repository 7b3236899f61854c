//! Shared fixtures

use menu_harvest::browser::SnapshotBrowser;
use menu_harvest::crawler::{Coordinator, CoordinatorSettings};
use menu_harvest::extract::{build_http_client, default_pipeline};
use menu_harvest::job::CrawlJob;
use menu_harvest::state::StateCache;
use menu_harvest::storage::{MemoryCache, MemoryQueue, MessageQueue};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const JOB_QUEUE: &str = "scraper.page.queue";
pub const RESULT_QUEUE: &str = "backend.page.queue";

pub struct TestWorker {
    pub coordinator: Coordinator,
    pub cache: Arc<MemoryCache>,
    pub queue: Arc<MemoryQueue>,
    pub browser: SnapshotBrowser,
}

/// Coordinator over a snapshot browser with the full extraction pipeline
pub fn test_worker(browser: SnapshotBrowser, upload_root: &Path) -> TestWorker {
    let cache = Arc::new(MemoryCache::new());
    let queue = Arc::new(MemoryQueue::new());
    let client = build_http_client(Duration::from_secs(5)).unwrap();
    let extractors = default_pipeline(client, upload_root.to_path_buf(), Duration::from_millis(100));

    let coordinator = Coordinator::new(
        Arc::new(browser.clone()),
        StateCache::new(cache.clone(), Duration::from_secs(30 * 24 * 3600)),
        queue.clone(),
        extractors,
        CoordinatorSettings::default(),
    );

    TestWorker {
        coordinator,
        cache,
        queue,
        browser,
    }
}

/// Leases and acknowledges every job waiting on the job queue
pub async fn drain_jobs(queue: &MemoryQueue) -> Vec<CrawlJob> {
    let mut jobs = Vec::new();
    while let Some(delivery) = queue.lease(JOB_QUEUE, Duration::from_secs(60)).await.unwrap() {
        queue.ack(delivery.id).await.unwrap();
        jobs.push(serde_json::from_str(&delivery.payload).unwrap());
    }
    jobs
}
