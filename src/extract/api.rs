//! API extraction hook
//!
//! Some ordering platforms expose menus through a JSON API. No platform is
//! supported yet, so the method never applies and the pipeline moves on.

use crate::extract::{Extraction, Extractor, PageContext};
use crate::state::ExtractionMethod;
use crate::HarvestError;
use async_trait::async_trait;

/// Menu API extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiExtractor;

#[async_trait]
impl Extractor for ApiExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::ApiExtractor
    }

    async fn try_extract(
        &self,
        ctx: &PageContext<'_>,
        _resource: Option<&str>,
    ) -> Result<Option<Extraction>, HarvestError> {
        tracing::trace!("No menu API known for {}", ctx.hostname);
        Ok(None)
    }
}
