//! Browser session management
//!
//! Pages are driven through the `Page` trait, a thin remote-procedure boundary:
//! navigation, waiting and a handful of small evaluations run inside the
//! browser, everything else (selector inference, candidate collection, link
//! discovery) works host-side on the HTML snapshot returned by `content()`.
//!
//! Two implementations exist:
//! - `ChromeBrowser`: one lazily launched headless Chrome shared by all workers
//! - `SnapshotBrowser`: serves fixed HTML documents, used by `inspect` and tests

mod chrome;
mod identity;
mod snapshot;

pub use chrome::ChromeBrowser;
pub use identity::pick_user_agent;
pub use snapshot::{SnapshotBrowser, SnapshotDocument, SNAPSHOT_USER_AGENT};

use crate::config::BrowserSettings;
use crate::HarvestError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by browser implementations
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("DevTools protocol error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("Script evaluation failed: {0}")]
    Evaluation(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("No page loaded")]
    NoDocument,
}

/// Result type for browser operations
pub type BrowserResult<T> = Result<T, BrowserError>;

/// Rendered pixel size of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A single browser tab
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigates to the URL and waits until the network is idle
    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<()>;

    /// Waits for an element matching the selector, returning false on timeout
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> BrowserResult<bool>;

    /// Waits for late-rendered content, returning false on timeout
    async fn wait_for_render(&self, timeout: Duration) -> BrowserResult<bool>;

    /// Serialized HTML of the current document
    async fn content(&self) -> BrowserResult<String>;

    /// URL of the current document, after redirects
    async fn url(&self) -> BrowserResult<Option<String>>;

    /// URLs of all resources the page loaded so far
    async fn resource_entries(&self) -> BrowserResult<Vec<String>>;

    /// Rendered size of the first `<img>` whose resolved source is `src`
    async fn image_size(&self, src: &str) -> BrowserResult<Option<ImageSize>>;

    /// The user agent this page presents
    fn user_agent(&self) -> &str;

    /// Closes the tab
    async fn close(&self) -> BrowserResult<()>;
}

/// A source of fresh pages
#[async_trait]
pub trait Browser: Send + Sync {
    /// Opens a new page with a randomly chosen user agent
    async fn open_page(&self) -> BrowserResult<Box<dyn Page>>;

    /// Releases the browser; later `open_page` calls start a new one
    async fn shutdown(&self);
}

/// Timeouts applied when loading a job URL
#[derive(Debug, Clone, Copy)]
pub struct NavigationOptions {
    pub navigation_timeout: Duration,
    pub body_timeout: Duration,
}

impl NavigationOptions {
    pub fn from_settings(settings: &BrowserSettings) -> Self {
        Self {
            navigation_timeout: settings.navigation_timeout(),
            body_timeout: settings.body_timeout(),
        }
    }
}

impl Default for NavigationOptions {
    fn default() -> Self {
        Self::from_settings(&BrowserSettings::default())
    }
}

/// Loads a URL into the page and waits for the body
///
/// A navigation failure is fatal for the job. A missing `<body>` after the
/// body timeout is only logged; extraction proceeds on whatever rendered.
///
/// # Arguments
///
/// * `page` - The page to navigate
/// * `url` - The absolute URL to load
/// * `options` - Navigation and body timeouts
///
/// # Returns
///
/// * `Ok(())` - The page loaded
/// * `Err(HarvestError::Navigation)` - The page could not be loaded
pub async fn navigate(page: &dyn Page, url: &str, options: &NavigationOptions) -> Result<(), HarvestError> {
    if let Err(e) = page.goto(url, options.navigation_timeout).await {
        tracing::error!("Navigation failed for {}: {}", url, e);
        return Err(HarvestError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        });
    }

    match page.wait_for_selector("body", options.body_timeout).await {
        Ok(true) => {}
        Ok(false) => tracing::warn!("No <body> rendered for {} within {:?}", url, options.body_timeout),
        Err(e) => tracing::warn!("Waiting for <body> failed for {}: {}", url, e),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_navigate_known_page() {
        let browser = SnapshotBrowser::new().with_page("https://a.com/", "<html><body>hi</body></html>");
        let page = browser.open_page().await.unwrap();

        navigate(page.as_ref(), "https://a.com/", &NavigationOptions::default())
            .await
            .unwrap();

        assert_eq!(page.url().await.unwrap().as_deref(), Some("https://a.com/"));
    }

    #[tokio::test]
    async fn test_navigate_unknown_page_is_navigation_error() {
        let browser = SnapshotBrowser::new();
        let page = browser.open_page().await.unwrap();

        let result = navigate(page.as_ref(), "https://missing.com/", &NavigationOptions::default()).await;
        assert!(matches!(result, Err(HarvestError::Navigation { .. })));
    }

    #[test]
    fn test_options_from_settings() {
        let settings = BrowserSettings {
            navigation_timeout_ms: 12_000,
            body_timeout_ms: 3_000,
            ..BrowserSettings::default()
        };
        let options = NavigationOptions::from_settings(&settings);
        assert_eq!(options.navigation_timeout, Duration::from_secs(12));
        assert_eq!(options.body_timeout, Duration::from_secs(3));
    }
}
