//! Queue message payloads
//!
//! `CrawlJob` is what the backend (and the worker itself, for subpages) puts on
//! the jobs queue. `ExtractionResult` is what the worker publishes back.

use crate::state::ExtractionMethod;
use crate::HarvestError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Pattern of inbound page jobs, including discovered subpages
pub const PAGE_ADDED: &str = "page.added";

/// Pattern of results for pages that were loaded and run through the pipeline
pub const PAGE_PROCESSED: &str = "page.processed";

/// Pattern of results for pages that failed to load or extract
pub const PAGE_FAILED: &str = "page.failed";

/// Whether a job was submitted directly or discovered as a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    #[default]
    Page,
    Subpage,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Page => "page",
            Self::Subpage => "subpage",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of work: one page to scrape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlJob {
    /// Backend job id; subpage jobs inherit the id of the page they were found on
    pub job_id: String,

    pub url: String,

    #[serde(default, alias = "type")]
    pub kind: JobKind,
}

impl CrawlJob {
    pub fn page(job_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            url: url.into(),
            kind: JobKind::Page,
        }
    }

    /// Creates a subpage job found while processing `parent`
    pub fn subpage_of(parent: &CrawlJob, url: &Url) -> Self {
        Self {
            job_id: parent.job_id.clone(),
            url: url.to_string(),
            kind: JobKind::Subpage,
        }
    }

    /// Checks the job and returns its parsed URL
    ///
    /// # Returns
    ///
    /// * `Ok(Url)` - The job URL, an absolute http(s) URL with a host
    /// * `Err(HarvestError::InvalidJob)` - Empty job id or unusable URL
    pub fn validate(&self) -> Result<Url, HarvestError> {
        if self.job_id.trim().is_empty() {
            return Err(HarvestError::InvalidJob(format!(
                "job for {} has no job id",
                self.url
            )));
        }

        let url = Url::parse(&self.url)
            .map_err(|e| HarvestError::InvalidJob(format!("invalid url '{}': {}", self.url, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(HarvestError::InvalidJob(format!(
                "unsupported scheme '{}' in {}",
                url.scheme(),
                self.url
            )));
        }

        if url.host_str().is_none() {
            return Err(HarvestError::InvalidJob(format!(
                "url {} has no host",
                self.url
            )));
        }

        Ok(url)
    }
}

/// The outcome of one job, published to the results queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub job_id: String,

    pub url: String,

    pub kind: JobKind,

    /// Method that produced the data; absent when nothing was found or the job failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<ExtractionMethod>,

    /// Extracted menu item texts or saved file paths
    #[serde(default)]
    pub data: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResult {
    /// A result carrying data from `method`
    pub fn success(job: &CrawlJob, method: ExtractionMethod, data: Vec<String>) -> Self {
        Self {
            job_id: job.job_id.clone(),
            url: job.url.clone(),
            kind: job.kind,
            method: Some(method),
            data,
            error: None,
        }
    }

    /// A result for a page that loaded but where no method found anything
    pub fn empty(job: &CrawlJob) -> Self {
        Self {
            job_id: job.job_id.clone(),
            url: job.url.clone(),
            kind: job.kind,
            method: None,
            data: Vec::new(),
            error: None,
        }
    }

    /// A result for a page that failed
    pub fn failure(job: &CrawlJob, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::empty(job)
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    /// The queue pattern this result is published under
    pub fn pattern(&self) -> &'static str {
        if self.is_failure() {
            PAGE_FAILED
        } else {
            PAGE_PROCESSED
        }
    }
}
