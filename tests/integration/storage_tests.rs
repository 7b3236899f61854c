//! SQLite-backed cache and queues, and a worker pool running on them

use crate::common::{JOB_QUEUE, RESULT_QUEUE};
use menu_harvest::browser::SnapshotBrowser;
use menu_harvest::config::QueueConfig;
use menu_harvest::crawler::{Coordinator, CoordinatorSettings, WorkerPool, WorkerSettings};
use menu_harvest::extract::{Extractor, HtmlExtractor};
use menu_harvest::job::{CrawlJob, ExtractionResult, PAGE_ADDED, PAGE_PROCESSED};
use menu_harvest::output::load_statistics;
use menu_harvest::state::StateCache;
use menu_harvest::storage::{open_storage, CacheStore, MessageQueue};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("data").join("harvest.db");

    {
        let store = open_storage(&db).unwrap();
        store.set("strategy:a.de", r#"{"method":"fileExtractor"}"#, None).await.unwrap();
        store.publish(JOB_QUEUE, PAGE_ADDED, "{}").await.unwrap();
    }

    let store = open_storage(&db).unwrap();
    assert_eq!(
        store.get("strategy:a.de").await.unwrap().as_deref(),
        Some(r#"{"method":"fileExtractor"}"#)
    );
    assert_eq!(store.depth(JOB_QUEUE).await.unwrap(), 1);
}

#[tokio::test]
async fn test_unacknowledged_job_is_redelivered() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_storage(&dir.path().join("harvest.db")).unwrap();
    store.publish(JOB_QUEUE, PAGE_ADDED, "{}").await.unwrap();

    let first = store.lease(JOB_QUEUE, Duration::from_millis(50)).await.unwrap().unwrap();
    assert!(store.lease(JOB_QUEUE, Duration::from_secs(60)).await.unwrap().is_none());

    tokio::time::sleep(Duration::from_millis(100)).await;

    let second = store.lease(JOB_QUEUE, Duration::from_secs(60)).await.unwrap().unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.deliveries, 2);

    store.ack(second.id).await.unwrap();
    assert_eq!(store.depth(JOB_QUEUE).await.unwrap(), 0);
}

#[tokio::test]
async fn test_worker_pool_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(open_storage(&dir.path().join("harvest.db")).unwrap());

    let browser = SnapshotBrowser::new().with_page(
        "https://cafe.de/",
        r#"<html><body><div><span>Kaffee 2,80</span><span>Wasser 2,20</span></div></body></html>"#,
    );
    let extractors: Vec<Arc<dyn Extractor>> = vec![Arc::new(HtmlExtractor)];
    let coordinator = Coordinator::new(
        Arc::new(browser),
        StateCache::new(store.clone(), Duration::from_secs(3600)),
        store.clone(),
        extractors,
        CoordinatorSettings::default(),
    );

    let job = serde_json::to_string(&CrawlJob::page("job-20", "https://cafe.de/")).unwrap();
    store.publish(JOB_QUEUE, PAGE_ADDED, &job).await.unwrap();
    store.publish(JOB_QUEUE, PAGE_ADDED, "{\"broken\":true}").await.unwrap();

    let settings = WorkerSettings {
        concurrency: 2,
        job_queue: JOB_QUEUE.to_string(),
        poll_interval: Duration::from_millis(10),
        lease: Duration::from_secs(60),
    };
    let pool = WorkerPool::new(Arc::new(coordinator), store.clone(), settings);
    let (tx, rx) = watch::channel(false);

    let stopper = async {
        for _ in 0..300 {
            if store.depth(JOB_QUEUE).await.unwrap() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tx.send(true).unwrap();
    };
    let (summary, _) = tokio::join!(pool.run(rx), stopper);

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.invalid, 1);

    let delivery = store.lease(RESULT_QUEUE, Duration::from_secs(60)).await.unwrap().unwrap();
    assert_eq!(delivery.pattern, PAGE_PROCESSED);
    let result: ExtractionResult = serde_json::from_str(&delivery.payload).unwrap();
    assert_eq!(result.data, vec!["Kaffee 2,80", "Wasser 2,20"]);

    let stats = load_statistics(store.as_ref(), store.as_ref(), &QueueConfig::default())
        .await
        .unwrap();
    assert_eq!(stats.cached_strategies, 1);
    assert_eq!(stats.tracked_links, 1);
}
