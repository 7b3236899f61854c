//! Extraction orchestration for a single job
//!
//! For each job the coordinator:
//! - Opens a page and loads the job URL
//! - Runs the hostname's cached strategy, or the full pipeline on a miss
//! - Records the winning strategy and the link state of the job URL
//! - Queues newly discovered same-host links as subpage jobs
//! - Publishes exactly one result

use crate::browser::{navigate, Browser, NavigationOptions, Page};
use crate::config::Config;
use crate::crawler::links::{discover_page_links, link_key};
use crate::extract::{Extraction, Extractor, PageContext};
use crate::job::{CrawlJob, ExtractionResult, PAGE_ADDED};
use crate::state::{ExtractionMethod, ExtractionStrategy, LinkCrawlState, LinkDecision, StateCache};
use crate::storage::MessageQueue;
use crate::url::extract_domain;
use crate::HarvestError;
use std::sync::Arc;
use url::Url;

/// Queue names, timeouts and the link retry bound
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub navigation: NavigationOptions,
    pub job_queue: String,
    pub result_queue: String,
    pub max_link_attempts: u32,
}

impl CoordinatorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            navigation: NavigationOptions::from_settings(&config.browser),
            job_queue: config.queues.jobs.clone(),
            result_queue: config.queues.results.clone(),
            max_link_attempts: config.worker.max_link_attempts,
        }
    }
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            navigation: NavigationOptions::default(),
            job_queue: "scraper.page.queue".to_string(),
            result_queue: "backend.page.queue".to_string(),
            max_link_attempts: 3,
        }
    }
}

/// What a loaded page produced before it was closed
struct PageOutcome {
    result: ExtractionResult,
    links: Vec<Url>,
}

/// Runs jobs end to end; shared by every worker
pub struct Coordinator {
    browser: Arc<dyn Browser>,
    state: StateCache,
    queue: Arc<dyn MessageQueue>,
    extractors: Vec<Arc<dyn Extractor>>,
    settings: CoordinatorSettings,
}

impl Coordinator {
    /// Creates a coordinator
    ///
    /// # Arguments
    ///
    /// * `browser` - Source of pages
    /// * `state` - Strategy and link state cache
    /// * `queue` - Queue for results and subpage jobs
    /// * `extractors` - Extraction methods in pipeline order
    /// * `settings` - Queue names, timeouts and the link retry bound
    pub fn new(
        browser: Arc<dyn Browser>,
        state: StateCache,
        queue: Arc<dyn MessageQueue>,
        extractors: Vec<Arc<dyn Extractor>>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            browser,
            state,
            queue,
            extractors,
            settings,
        }
    }

    /// Processes one job and publishes its result
    ///
    /// Load and extraction errors become a `page.failed` result, and so does a
    /// job whose URL cannot be loaded at all. Only a job without id and a
    /// failure to publish are returned, so the caller can drop the former and
    /// leave the latter unacknowledged.
    ///
    /// # Returns
    ///
    /// * `Ok(ExtractionResult)` - The published result
    /// * `Err(HarvestError)` - The job has no id or a publish failed
    pub async fn process_job(&self, job: &CrawlJob) -> Result<ExtractionResult, HarvestError> {
        if job.job_id.trim().is_empty() {
            return Err(HarvestError::InvalidJob(format!("job for {} has no job id", job.url)));
        }

        let (job_url, hostname) = match job.validate() {
            Ok(url) => match extract_domain(&url) {
                Some(hostname) => (url, hostname),
                None => return self.reject(job, format!("url {} has no host", job.url)).await,
            },
            Err(e) => return self.reject(job, e.to_string()).await,
        };
        let key = link_key(&job_url);

        tracing::info!("Processing {} job {} for {}", job.kind, job.job_id, job.url);

        let result = match self.run_page(job, &job_url, &hostname).await {
            Ok(outcome) => {
                self.record_link(key.as_str(), |previous| LinkCrawlState::processed(previous))
                    .await;
                self.handle_links(job, &outcome.links).await?;
                outcome.result
            }
            Err(e) => {
                tracing::error!("Job {} failed for {}: {}", job.job_id, job.url, e);
                let message = e.to_string();
                self.record_link(key.as_str(), |previous| {
                    LinkCrawlState::failed(previous, message.clone())
                })
                .await;
                ExtractionResult::failure(job, message)
            }
        };

        self.publish_result(&result).await?;

        match result.method {
            Some(method) => tracing::info!(
                "Finished {} with {} ({} items)",
                job.url,
                method,
                result.data.len()
            ),
            None if result.is_failure() => tracing::info!("Finished {} with failure", job.url),
            None => tracing::info!("Finished {} without menu data", job.url),
        }

        Ok(result)
    }

    /// Publishes a failed result for a job that cannot be loaded
    async fn reject(&self, job: &CrawlJob, message: String) -> Result<ExtractionResult, HarvestError> {
        tracing::warn!("Rejecting job {}: {}", job.job_id, message);
        let result = ExtractionResult::failure(job, message);
        self.publish_result(&result).await?;
        Ok(result)
    }

    /// Opens a page, extracts and discovers links, and always closes the page
    async fn run_page(&self, job: &CrawlJob, job_url: &Url, hostname: &str) -> Result<PageOutcome, HarvestError> {
        let page = self.browser.open_page().await?;
        let outcome = self.load_and_extract(page.as_ref(), job, job_url, hostname).await;

        if let Err(e) = page.close().await {
            tracing::warn!("Failed to close page for {}: {}", job.url, e);
        }

        outcome
    }

    async fn load_and_extract(
        &self,
        page: &dyn Page,
        job: &CrawlJob,
        job_url: &Url,
        hostname: &str,
    ) -> Result<PageOutcome, HarvestError> {
        navigate(page, job_url.as_str(), &self.settings.navigation).await?;

        let page_url = current_url(page, job_url).await;
        let ctx = PageContext {
            job,
            page_url: &page_url,
            hostname,
            page,
        };

        let result = self.extract(&ctx).await?;

        let links = match discover_page_links(page, &page_url).await {
            Ok(links) => links,
            Err(e) => {
                tracing::warn!("Link discovery failed on {}: {}", page_url, e);
                Vec::new()
            }
        };

        Ok(PageOutcome { result, links })
    }

    /// Runs the cached strategy or, on a miss, the pipeline
    async fn extract(&self, ctx: &PageContext<'_>) -> Result<ExtractionResult, HarvestError> {
        let cached = match self.state.strategy(ctx.hostname).await {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!("Strategy lookup failed for {}: {}", ctx.hostname, e);
                None
            }
        };

        if let Some(strategy) = cached {
            match self.extractor_for(strategy.method) {
                Some(extractor) => return self.run_cached(ctx, extractor, &strategy).await,
                None => tracing::warn!(
                    "Cached method {} for {} is not available, running the pipeline",
                    strategy.method,
                    ctx.hostname
                ),
            }
        }

        self.run_pipeline(ctx).await
    }

    async fn run_cached(
        &self,
        ctx: &PageContext<'_>,
        extractor: &dyn Extractor,
        strategy: &ExtractionStrategy,
    ) -> Result<ExtractionResult, HarvestError> {
        tracing::debug!(
            "Using cached {} for {} (resource: {:?})",
            strategy.method,
            ctx.hostname,
            strategy.resource
        );

        match extractor.try_extract(ctx, strategy.resource.as_deref()).await? {
            Some(Extraction { data, .. }) => Ok(ExtractionResult::success(ctx.job, strategy.method, data)),
            None => {
                tracing::debug!("Cached {} found nothing on {}", strategy.method, ctx.page_url);
                Ok(ExtractionResult::empty(ctx.job))
            }
        }
    }

    async fn run_pipeline(&self, ctx: &PageContext<'_>) -> Result<ExtractionResult, HarvestError> {
        for extractor in &self.extractors {
            let method = extractor.method();
            tracing::debug!("Trying {} on {}", method, ctx.page_url);

            let Some(Extraction { data, resource }) = extractor.try_extract(ctx, None).await? else {
                continue;
            };
            if data.is_empty() {
                continue;
            }

            let strategy = ExtractionStrategy::new(method, resource);
            if let Err(e) = self.state.save_strategy(ctx.hostname, &strategy).await {
                tracing::warn!("Failed to cache strategy for {}: {}", ctx.hostname, e);
            } else {
                tracing::debug!("Cached {} as strategy for {}", method, ctx.hostname);
            }

            return Ok(ExtractionResult::success(ctx.job, method, data));
        }

        Ok(ExtractionResult::empty(ctx.job))
    }

    fn extractor_for(&self, method: ExtractionMethod) -> Option<&dyn Extractor> {
        self.extractors
            .iter()
            .find(|e| e.method() == method)
            .map(|e| e.as_ref())
    }

    /// Updates the link state of a URL, logging cache failures
    async fn record_link<F>(&self, url: &str, next: F)
    where
        F: FnOnce(Option<&LinkCrawlState>) -> LinkCrawlState,
    {
        let previous = match self.state.link_state(url).await {
            Ok(previous) => previous,
            Err(e) => {
                tracing::warn!("Link state lookup failed for {}: {}", url, e);
                None
            }
        };

        let state = next(previous.as_ref());
        if let Some(previous) = &previous {
            if !previous.status.can_transition_to(state.status) {
                tracing::debug!(
                    "Keeping {} as {}, not moving it to {}",
                    url,
                    previous.status,
                    state.status
                );
                return;
            }
        }

        if let Err(e) = self.state.save_link_state(url, &state).await {
            tracing::warn!("Failed to record {} as {}: {}", url, state.status, e);
        }
    }

    /// Queues every discovered link the retry bound still allows
    async fn handle_links(&self, job: &CrawlJob, links: &[Url]) -> Result<(), HarvestError> {
        let mut queued = 0;

        for link in links {
            let key = link.as_str();
            let existing = match self.state.link_state(key).await {
                Ok(existing) => existing,
                Err(e) => {
                    tracing::warn!("Link state lookup failed for {}: {}", key, e);
                    None
                }
            };

            match LinkCrawlState::decide(existing.as_ref(), self.settings.max_link_attempts) {
                LinkDecision::Enqueue { attempts } => {
                    let subpage = CrawlJob::subpage_of(job, link);
                    let payload = serde_json::to_string(&subpage)?;
                    self.queue
                        .publish(&self.settings.job_queue, PAGE_ADDED, &payload)
                        .await?;

                    if let Err(e) = self
                        .state
                        .save_link_state(key, &LinkCrawlState::queued(attempts))
                        .await
                    {
                        tracing::warn!("Failed to record {} as queued: {}", key, e);
                    }

                    tracing::debug!("Queued {} (attempt {})", key, attempts);
                    queued += 1;
                }
                LinkDecision::AlreadyHandled(status) => {
                    tracing::debug!("Skipping {}: already {}", key, status);
                }
                LinkDecision::Exhausted { attempts } => {
                    tracing::debug!("Skipping {}: gave up after {} attempts", key, attempts);
                }
            }
        }

        if queued > 0 {
            tracing::info!("Queued {} of {} links from {}", queued, links.len(), job.url);
        }

        Ok(())
    }

    async fn publish_result(&self, result: &ExtractionResult) -> Result<(), HarvestError> {
        let payload = serde_json::to_string(result)?;
        self.queue
            .publish(&self.settings.result_queue, result.pattern(), &payload)
            .await?;
        Ok(())
    }
}

/// URL of the loaded document, falling back to the job URL
async fn current_url(page: &dyn Page, job_url: &Url) -> Url {
    match page.url().await {
        Ok(Some(raw)) => Url::parse(&raw).unwrap_or_else(|_| job_url.clone()),
        Ok(None) => job_url.clone(),
        Err(e) => {
            tracing::debug!("Could not read page URL, using {}: {}", job_url, e);
            job_url.clone()
        }
    }
}
