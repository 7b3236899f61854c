//! Menu text from the rendered DOM
//!
//! With a cached selector the items are read directly. Otherwise the selector
//! is inferred from the snapshot first and returned as the strategy resource.

use crate::extract::selector::{extract_data, infer_selector};
use crate::extract::{Extraction, Extractor, PageContext};
use crate::state::ExtractionMethod;
use crate::HarvestError;
use async_trait::async_trait;

/// DOM selector extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

/// Runs the HTML method on a serialized document
///
/// # Arguments
///
/// * `html` - Serialized DOM of the page
/// * `cached_selector` - Selector from the hostname's strategy, if any
///
/// # Returns
///
/// `None` if no selector could be inferred or it selected nothing
pub fn extract_from_html(html: &str, cached_selector: Option<&str>) -> Option<Extraction> {
    let selector = match cached_selector {
        Some(selector) => selector.to_string(),
        None => infer_selector(html)?,
    };

    let data = extract_data(html, &selector);
    if data.is_empty() {
        return None;
    }

    Some(Extraction {
        data,
        resource: Some(selector),
    })
}

#[async_trait]
impl Extractor for HtmlExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::HtmlExtractor
    }

    async fn try_extract(
        &self,
        ctx: &PageContext<'_>,
        resource: Option<&str>,
    ) -> Result<Option<Extraction>, HarvestError> {
        let html = ctx.page.content().await?;
        let extraction = extract_from_html(&html, resource);

        match &extraction {
            Some(found) => tracing::debug!(
                "Selector '{}' matched {} items on {}",
                found.resource.as_deref().unwrap_or_default(),
                found.data.len(),
                ctx.page_url
            ),
            None => tracing::debug!("No menu block found in the DOM of {}", ctx.page_url),
        }

        Ok(extraction)
    }
}
