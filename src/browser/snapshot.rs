//! Fixed-document browser
//!
//! Serves pre-recorded HTML for known URLs. Image sizes and resource entries,
//! which a real browser would measure, are declared per document.

use crate::browser::{Browser, BrowserError, BrowserResult, ImageSize, Page};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// User agent reported by snapshot pages
pub const SNAPSHOT_USER_AGENT: &str = "menu-harvest-snapshot/1.0";

/// A recorded page
#[derive(Debug, Clone, Default)]
pub struct SnapshotDocument {
    html: String,
    resources: Vec<String>,
    images: Vec<(String, ImageSize)>,
}

impl SnapshotDocument {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            ..Self::default()
        }
    }

    /// Declares the rendered size of an image, by `src` as written or absolute
    pub fn with_image(mut self, src: impl Into<String>, width: u32, height: u32) -> Self {
        self.images.push((src.into(), ImageSize::new(width, height)));
        self
    }

    /// Declares a resource the page loaded
    pub fn with_resource(mut self, url: impl Into<String>) -> Self {
        self.resources.push(url.into());
        self
    }
}

#[derive(Debug, Default)]
struct SnapshotLog {
    pages_opened: usize,
    pages_closed: usize,
    visited: Vec<String>,
}

/// Browser over a fixed set of documents
#[derive(Debug, Clone, Default)]
pub struct SnapshotBrowser {
    documents: Arc<HashMap<String, SnapshotDocument>>,
    log: Arc<Mutex<SnapshotLog>>,
}

fn document_key(url: &str) -> String {
    Url::parse(url).map(|u| u.to_string()).unwrap_or_else(|_| url.to_string())
}

impl SnapshotBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plain HTML page
    pub fn with_page(self, url: &str, html: impl Into<String>) -> Self {
        self.with_document(url, SnapshotDocument::new(html))
    }

    /// Adds a document with declared images and resources
    pub fn with_document(mut self, url: &str, document: SnapshotDocument) -> Self {
        Arc::make_mut(&mut self.documents).insert(document_key(url), document);
        self
    }

    /// URLs navigated to so far, in order
    pub fn visited(&self) -> Vec<String> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).visited.clone()
    }

    /// Number of pages opened and not yet closed
    pub fn open_pages(&self) -> usize {
        let log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        log.pages_opened - log.pages_closed
    }
}

#[async_trait]
impl Browser for SnapshotBrowser {
    async fn open_page(&self) -> BrowserResult<Box<dyn Page>> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).pages_opened += 1;
        Ok(Box::new(SnapshotPage {
            documents: self.documents.clone(),
            log: self.log.clone(),
            current: Mutex::new(None),
        }))
    }

    async fn shutdown(&self) {}
}

struct SnapshotPage {
    documents: Arc<HashMap<String, SnapshotDocument>>,
    log: Arc<Mutex<SnapshotLog>>,
    current: Mutex<Option<String>>,
}

impl SnapshotPage {
    fn current_url(&self) -> Option<String> {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn current_document(&self) -> BrowserResult<(String, &SnapshotDocument)> {
        let url = self.current_url().ok_or(BrowserError::NoDocument)?;
        let document = self.documents.get(&url).ok_or(BrowserError::NoDocument)?;
        Ok((url, document))
    }
}

fn has_match(html: &str, selector: &str) -> BrowserResult<bool> {
    let selector = Selector::parse(selector)
        .map_err(|e| BrowserError::Evaluation(format!("invalid selector '{}': {:?}", selector, e)))?;
    let document = Html::parse_document(html);
    let found = document.select(&selector).next().is_some();
    Ok(found)
}

#[async_trait]
impl Page for SnapshotPage {
    async fn goto(&self, url: &str, _timeout: Duration) -> BrowserResult<()> {
        let key = document_key(url);
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .visited
            .push(key.clone());

        if !self.documents.contains_key(&key) {
            return Err(BrowserError::Navigation(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)));
        }

        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(key);
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> BrowserResult<bool> {
        match self.current_document() {
            Ok((_, document)) => has_match(&document.html, selector),
            Err(_) => Ok(false),
        }
    }

    async fn wait_for_render(&self, _timeout: Duration) -> BrowserResult<bool> {
        Ok(self.current_document().is_ok())
    }

    async fn content(&self) -> BrowserResult<String> {
        let (_, document) = self.current_document()?;
        Ok(document.html.clone())
    }

    async fn url(&self) -> BrowserResult<Option<String>> {
        Ok(self.current_url())
    }

    async fn resource_entries(&self) -> BrowserResult<Vec<String>> {
        let (_, document) = self.current_document()?;
        Ok(document.resources.clone())
    }

    async fn image_size(&self, src: &str) -> BrowserResult<Option<ImageSize>> {
        let (url, document) = self.current_document()?;
        let base = Url::parse(&url).map_err(|e| BrowserError::Evaluation(e.to_string()))?;
        let target = base.join(src).map(|u| u.to_string()).ok();

        Ok(document
            .images
            .iter()
            .find(|(declared, _)| {
                declared == src || base.join(declared).map(|u| u.to_string()).ok() == target
            })
            .map(|(_, size)| *size))
    }

    fn user_agent(&self) -> &str {
        SNAPSHOT_USER_AGENT
    }

    async fn close(&self) -> BrowserResult<()> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).pages_closed += 1;
        Ok(())
    }
}
