//! Crawl orchestration
//!
//! This module contains the job-level logic:
//! - Same-host link discovery on loaded pages
//! - The coordinator running one job through the extraction pipeline
//! - The worker pool draining the job queue

mod coordinator;
mod links;
mod worker;

pub use coordinator::{Coordinator, CoordinatorSettings};
pub use links::{discover_links, discover_page_links};
pub use worker::{handle_delivery, DeliveryOutcome, WorkerPool, WorkerSettings, WorkerStatistics, WorkerSummary};
