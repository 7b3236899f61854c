//! End-to-end job processing through the coordinator

use crate::common::{drain_jobs, test_worker, RESULT_QUEUE};
use menu_harvest::browser::SnapshotBrowser;
use menu_harvest::job::{CrawlJob, ExtractionResult, JobKind, PAGE_FAILED, PAGE_PROCESSED};
use menu_harvest::state::{ExtractionMethod, ExtractionStrategy, LinkStatus, StateCache};
use menu_harvest::storage::CacheStore;
use std::time::Duration;

const MENU_LIST_PAGE: &str = r#"<html><body>
    <header><a href="/">Home</a><a href="/mittagstisch">Mittagstisch</a></header>
    <main>
      <h1>Getränke</h1>
      <ul class="menu-list">
        <li>Mineralwasser 0,5l 2,50</li>
        <li>Cola 0,33l 3,00</li>
        <li>Apfelschorle 0,5l 3,20</li>
      </ul>
    </main>
    <footer><a href="https://instagram.com/trattoria">Instagram</a></footer>
</body></html>"#;

const LUNCH_PAGE: &str = r#"<html><body>
    <main>
      <ul class="lunch">
        <li>Spaghetti Carbonara 9,50</li>
        <li>Lasagne 10,50</li>
      </ul>
    </main>
</body></html>"#;

fn results(worker: &crate::common::TestWorker) -> Vec<(String, ExtractionResult)> {
    worker
        .queue
        .peek_all(RESULT_QUEUE)
        .into_iter()
        .map(|d| (d.pattern, serde_json::from_str(&d.payload).unwrap()))
        .collect()
}

#[tokio::test]
async fn test_menu_list_page_uses_html_extractor() {
    let uploads = tempfile::tempdir().unwrap();
    let browser = SnapshotBrowser::new().with_page("https://trattoria.de/", MENU_LIST_PAGE);
    let worker = test_worker(browser, uploads.path());

    let job = CrawlJob::page("job-1", "https://trattoria.de/");
    let result = worker.coordinator.process_job(&job).await.unwrap();

    assert_eq!(result.method, Some(ExtractionMethod::HtmlExtractor));
    assert_eq!(
        result.data,
        vec![
            "Mineralwasser 0,5l 2,50",
            "Cola 0,33l 3,00",
            "Apfelschorle 0,5l 3,20"
        ]
    );

    let published = results(&worker);
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, PAGE_PROCESSED);
    assert_eq!(published[0].1, result);

    let strategy_json = worker.cache.get("strategy:trattoria.de").await.unwrap().unwrap();
    let strategy: ExtractionStrategy = serde_json::from_str(&strategy_json).unwrap();
    assert_eq!(strategy.method, ExtractionMethod::HtmlExtractor);
    assert_eq!(strategy.resource.as_deref(), Some("main > ul > li"));
    assert_eq!(worker.browser.open_pages(), 0);
}

#[tokio::test]
async fn test_same_host_links_become_subpage_jobs() {
    let uploads = tempfile::tempdir().unwrap();
    let browser = SnapshotBrowser::new().with_page("https://trattoria.de/", MENU_LIST_PAGE);
    let worker = test_worker(browser, uploads.path());

    worker
        .coordinator
        .process_job(&CrawlJob::page("job-1", "https://trattoria.de/"))
        .await
        .unwrap();

    let jobs = drain_jobs(&worker.queue).await;
    assert_eq!(jobs.len(), 1, "home link is already processed, instagram is foreign");
    assert_eq!(jobs[0].url, "https://trattoria.de/mittagstisch");
    assert_eq!(jobs[0].kind, JobKind::Subpage);
    assert_eq!(jobs[0].job_id, "job-1");

    let raw = worker
        .cache
        .get("link:https://trattoria.de/mittagstisch")
        .await
        .unwrap()
        .unwrap();
    assert!(raw.contains("\"queued\""));
}

#[tokio::test]
async fn test_second_job_reuses_cached_selector() {
    let uploads = tempfile::tempdir().unwrap();
    let browser = SnapshotBrowser::new()
        .with_page("https://trattoria.de/", MENU_LIST_PAGE)
        .with_page("https://trattoria.de/mittagstisch", LUNCH_PAGE);
    let worker = test_worker(browser, uploads.path());

    worker
        .coordinator
        .process_job(&CrawlJob::page("job-1", "https://trattoria.de/"))
        .await
        .unwrap();

    let lunch = drain_jobs(&worker.queue).await.remove(0);
    let result = worker.coordinator.process_job(&lunch).await.unwrap();

    assert_eq!(result.method, Some(ExtractionMethod::HtmlExtractor));
    assert_eq!(result.data, vec!["Spaghetti Carbonara 9,50", "Lasagne 10,50"]);
    assert_eq!(result.kind, JobKind::Subpage);

    let state = StateCache::new(worker.cache.clone(), Duration::from_secs(60));
    let link = state
        .link_state("https://trattoria.de/mittagstisch")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(link.status, LinkStatus::Processed);
    assert_eq!(link.attempts, 1);
}

#[tokio::test]
async fn test_cached_strategy_without_data_gives_empty_result() {
    let uploads = tempfile::tempdir().unwrap();
    let browser = SnapshotBrowser::new().with_page(
        "https://trattoria.de/impressum",
        r#"<html><body><p>Wasser GmbH</p><p>Cola Str. 1</p><a href="/karte.pdf">Karte</a></body></html>"#,
    );
    let worker = test_worker(browser, uploads.path());

    let state = StateCache::new(worker.cache.clone(), Duration::from_secs(60));
    state
        .save_strategy(
            "trattoria.de",
            &ExtractionStrategy::new(ExtractionMethod::HtmlExtractor, Some("main > ul > li".into())),
        )
        .await
        .unwrap();

    let result = worker
        .coordinator
        .process_job(&CrawlJob::page("job-2", "https://trattoria.de/impressum"))
        .await
        .unwrap();

    assert_eq!(result.method, None);
    assert!(result.data.is_empty());
    assert!(!result.is_failure());
    assert_eq!(results(&worker)[0].0, PAGE_PROCESSED);

    let strategy = state.strategy("trattoria.de").await.unwrap().unwrap();
    assert_eq!(strategy.resource.as_deref(), Some("main > ul > li"));
}

#[tokio::test]
async fn test_navigation_failure_publishes_failed_result() {
    let uploads = tempfile::tempdir().unwrap();
    let worker = test_worker(SnapshotBrowser::new(), uploads.path());

    let result = worker
        .coordinator
        .process_job(&CrawlJob::page("job-3", "https://closed.example/"))
        .await
        .unwrap();

    assert!(result.is_failure());
    assert!(result.error.as_deref().unwrap().contains("closed.example"));

    let published = results(&worker);
    assert_eq!(published[0].0, PAGE_FAILED);
    let raw = worker.queue.peek_all(RESULT_QUEUE).remove(0).payload;
    assert!(!raw.contains("\"method\""));
    assert_eq!(worker.browser.open_pages(), 0);
}

#[tokio::test]
async fn test_failing_link_is_queued_three_times() {
    let uploads = tempfile::tempdir().unwrap();
    let browser = SnapshotBrowser::new().with_page(
        "https://pizzeria.de/",
        r#"<html><body><a href="/kaputt">Speisekarte</a></body></html>"#,
    );
    let worker = test_worker(browser, uploads.path());
    let state = StateCache::new(worker.cache.clone(), Duration::from_secs(60));
    let root = CrawlJob::page("job-4", "https://pizzeria.de/");

    let mut attempts_seen = Vec::new();
    for _ in 0..4 {
        worker.coordinator.process_job(&root).await.unwrap();

        let jobs = drain_jobs(&worker.queue).await;
        for job in &jobs {
            let queued = state.link_state(&job.url).await.unwrap().unwrap();
            assert_eq!(queued.status, LinkStatus::Queued);
            attempts_seen.push(queued.attempts);

            let result = worker.coordinator.process_job(job).await.unwrap();
            assert!(result.is_failure());
        }
    }

    assert_eq!(attempts_seen, vec![1, 2, 3]);

    let last = state.link_state("https://pizzeria.de/kaputt").await.unwrap().unwrap();
    assert_eq!(last.status, LinkStatus::Failed);
    assert_eq!(last.attempts, 3);
}
