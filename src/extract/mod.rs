//! Extraction methods
//!
//! Each method implements `Extractor` and is tried in pipeline order
//! (API, HTML, file) until one yields data. The method and the resource it
//! used (a CSS selector, for HTML) become the hostname's cached strategy.

pub mod api;
pub mod download;
pub mod file;
pub mod html;
pub mod selector;

pub use crate::state::ExtractionMethod;
pub use api::ApiExtractor;
pub use download::{build_http_client, download, DownloadedFile};
pub use file::{collect_candidates, FileExtractor};
pub use html::HtmlExtractor;
pub use selector::{extract_data, infer_selector};

use crate::browser::Page;
use crate::job::CrawlJob;
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// The loaded page a method works on
pub struct PageContext<'a> {
    pub job: &'a CrawlJob,

    /// URL of the loaded document, after redirects
    pub page_url: &'a Url,

    /// Hostname the strategy is cached under
    pub hostname: &'a str,

    pub page: &'a dyn Page,
}

/// Data produced by a successful method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub data: Vec<String>,

    /// Method-specific resource to cache with the strategy
    pub resource: Option<String>,
}

/// One extraction method
#[async_trait]
pub trait Extractor: Send + Sync {
    fn method(&self) -> ExtractionMethod;

    /// Tries the method on a loaded page
    ///
    /// # Arguments
    ///
    /// * `ctx` - The loaded page and its job
    /// * `resource` - Resource from a cached strategy, if any
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Extraction))` - The method produced data
    /// * `Ok(None)` - The method does not apply to this page
    /// * `Err(HarvestError)` - The method failed
    async fn try_extract(
        &self,
        ctx: &PageContext<'_>,
        resource: Option<&str>,
    ) -> Result<Option<Extraction>, HarvestError>;
}

/// Builds the API, HTML and file extractors in pipeline order
pub fn default_pipeline(client: Client, upload_root: PathBuf, render_timeout: Duration) -> Vec<Arc<dyn Extractor>> {
    vec![
        Arc::new(ApiExtractor),
        Arc::new(HtmlExtractor),
        Arc::new(FileExtractor::new(client, upload_root, render_timeout)),
    ]
}
