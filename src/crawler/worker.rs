//! Worker pool draining the job queue
//!
//! Each worker leases one job at a time, runs it through the coordinator and
//! acknowledges it. A job is left unacknowledged only when its result could not
//! be published; the lease then runs out and the queue hands it out again.

use crate::config::Config;
use crate::crawler::coordinator::Coordinator;
use crate::job::{CrawlJob, PAGE_ADDED};
use crate::storage::{Delivery, MessageQueue};
use crate::HarvestError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Pool size and queue timing
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub concurrency: usize,
    pub job_queue: String,
    pub poll_interval: Duration,
    pub lease: Duration,
}

impl WorkerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency: config.worker.concurrency as usize,
            job_queue: config.queues.jobs.clone(),
            poll_interval: config.worker.poll_interval(),
            lease: config.worker.lease(),
        }
    }
}

/// Counters shared by all workers of a pool
#[derive(Debug, Default)]
pub struct WorkerStatistics {
    completed: AtomicU64,
    failed: AtomicU64,
    invalid: AtomicU64,
    redelivered: AtomicU64,
}

/// Point-in-time copy of the worker counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    /// Jobs published as `page.processed`
    pub completed: u64,

    /// Jobs published as `page.failed`
    pub failed: u64,

    /// Messages dropped as unreadable or invalid
    pub invalid: u64,

    /// Jobs left unacknowledged for redelivery
    pub redelivered: u64,
}

impl WorkerStatistics {
    pub fn snapshot(&self) -> WorkerSummary {
        WorkerSummary {
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            redelivered: self.redelivered.load(Ordering::Relaxed),
        }
    }
}

/// What happened to one delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Completed,
    Failed,
    Invalid,
    /// Not acknowledged; the queue will deliver it again
    Redeliver,
}

impl DeliveryOutcome {
    fn should_ack(&self) -> bool {
        !matches!(self, Self::Redeliver)
    }
}

/// N workers sharing one coordinator and one queue
pub struct WorkerPool {
    coordinator: Arc<Coordinator>,
    queue: Arc<dyn MessageQueue>,
    settings: WorkerSettings,
    stats: Arc<WorkerStatistics>,
}

impl WorkerPool {
    pub fn new(coordinator: Arc<Coordinator>, queue: Arc<dyn MessageQueue>, settings: WorkerSettings) -> Self {
        Self {
            coordinator,
            queue,
            settings,
            stats: Arc::new(WorkerStatistics::default()),
        }
    }

    /// Runs the workers until the shutdown signal turns true
    ///
    /// In-flight jobs are finished before a worker stops.
    ///
    /// # Arguments
    ///
    /// * `shutdown` - Receiver of the shutdown flag
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> WorkerSummary {
        let concurrency = self.settings.concurrency.max(1);
        tracing::info!(
            "Starting {} workers on queue '{}'",
            concurrency,
            self.settings.job_queue
        );

        let workers: Vec<_> = (0..concurrency)
            .map(|id| {
                let worker = Worker {
                    id,
                    coordinator: self.coordinator.clone(),
                    queue: self.queue.clone(),
                    settings: self.settings.clone(),
                    stats: self.stats.clone(),
                };
                tokio::spawn(worker.run(shutdown.clone()))
            })
            .collect();

        for result in futures::future::join_all(workers).await {
            if let Err(e) = result {
                tracing::error!("Worker task ended abnormally: {}", e);
            }
        }

        let summary = self.stats.snapshot();
        tracing::info!(
            "Workers stopped: {} completed, {} failed, {} invalid, {} left for redelivery",
            summary.completed,
            summary.failed,
            summary.invalid,
            summary.redelivered
        );
        summary
    }
}

struct Worker {
    id: usize,
    coordinator: Arc<Coordinator>,
    queue: Arc<dyn MessageQueue>,
    settings: WorkerSettings,
    stats: Arc<WorkerStatistics>,
}

impl Worker {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::debug!("Worker {} started", self.id);

        loop {
            if *shutdown.borrow() {
                break;
            }

            let delivery = match self.queue.lease(&self.settings.job_queue, self.settings.lease).await {
                Ok(Some(delivery)) => delivery,
                Ok(None) => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.settings.poll_interval) => {}
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                    continue;
                }
                Err(e) => {
                    tracing::error!("Worker {} failed to lease a job: {}", self.id, e);
                    tokio::time::sleep(self.settings.poll_interval).await;
                    continue;
                }
            };

            let outcome = handle_delivery(&self.coordinator, &delivery).await;
            self.count(outcome);

            if outcome.should_ack() {
                if let Err(e) = self.queue.ack(delivery.id).await {
                    tracing::warn!("Failed to acknowledge message {}: {}", delivery.id, e);
                }
            }
        }

        tracing::debug!("Worker {} stopped", self.id);
    }

    fn count(&self, outcome: DeliveryOutcome) {
        let counter = match outcome {
            DeliveryOutcome::Completed => &self.stats.completed,
            DeliveryOutcome::Failed => &self.stats.failed,
            DeliveryOutcome::Invalid => &self.stats.invalid,
            DeliveryOutcome::Redeliver => &self.stats.redelivered,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Decodes a delivery and runs its job
///
/// A job whose URL cannot be loaded still gets a `page.failed` result; only
/// messages that cannot carry a result are dropped as invalid.
///
/// # Returns
///
/// Whether the job completed, failed, was invalid or must be redelivered
pub async fn handle_delivery(coordinator: &Coordinator, delivery: &Delivery) -> DeliveryOutcome {
    if delivery.pattern != PAGE_ADDED {
        tracing::warn!(
            "Dropping message {} with unexpected pattern '{}'",
            delivery.id,
            delivery.pattern
        );
        return DeliveryOutcome::Invalid;
    }

    let job: CrawlJob = match serde_json::from_str(&delivery.payload) {
        Ok(job) => job,
        Err(e) => {
            tracing::warn!("Dropping unreadable message {}: {}", delivery.id, e);
            return DeliveryOutcome::Invalid;
        }
    };

    if delivery.deliveries > 1 {
        tracing::info!(
            "Job {} for {} delivered {} times",
            job.job_id,
            job.url,
            delivery.deliveries
        );
    }

    match coordinator.process_job(&job).await {
        Ok(result) if result.is_failure() => DeliveryOutcome::Failed,
        Ok(_) => DeliveryOutcome::Completed,
        Err(HarvestError::InvalidJob(message)) => {
            tracing::warn!("Dropping message {}: {}", delivery.id, message);
            DeliveryOutcome::Invalid
        }
        Err(e) => {
            tracing::error!(
                "Job {} for {} not acknowledged, will be redelivered: {}",
                job.job_id,
                job.url,
                e
            );
            DeliveryOutcome::Redeliver
        }
    }
}
