//! Menu file harvesting
//!
//! Many restaurants publish their menu as a PDF or as a photo of the printed
//! card. This extractor collects candidate files from the page, filters them
//! with URL, size and dimension rules and stores the survivors on disk.

use crate::browser::{ImageSize, Page};
use crate::extract::download::{download, DownloadedFile};
use crate::extract::{Extraction, Extractor, PageContext};
use crate::state::ExtractionMethod;
use crate::url::{extract_domain, matches_any_host_pattern};
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Smallest image accepted, to skip icons and logos
pub const MIN_FILE_SIZE: usize = 30 * 1024;

/// Hosts serving shared assets, never restaurant menus
pub const IGNORED_HOSTS: &[&str] = &[
    "*.gstatic.com",
    "*.google.com",
    "*.googleapis.com",
    "cdn.",
    "*.akamaihd.net",
    "*.cloudflare.com",
    "*.fbcdn.net",
    "*.twimg.com",
    "*.fastly.net",
    "*.yimg.com",
];

/// At least one must appear in the path of a non-PDF candidate
pub const MENU_KEYWORDS: &[&str] = &["menu", "speisekarte", "karte", "food", "dishes"];

const FILE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".pdf"];

const CANDIDATE_SELECTOR: &str = "a[href], img[src], source[src], object[data], embed[src]";

/// Why a candidate was turned down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    IgnoredHost,
    NoMenuKeyword,
    NotAnImage,
    TooSmall { bytes: usize },
    NotRendered,
    BadDimensions { width: u32, height: u32 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IgnoredHost => write!(f, "host is on the ignore list"),
            Self::NoMenuKeyword => write!(f, "path has no menu keyword"),
            Self::NotAnImage => write!(f, "content type is not an image"),
            Self::TooSmall { bytes } => write!(f, "only {} bytes", bytes),
            Self::NotRendered => write!(f, "no matching <img> on the page"),
            Self::BadDimensions { width, height } => {
                write!(f, "{}x{} does not look like a menu", width, height)
            }
        }
    }
}

/// Verdict on a candidate URL before anything is downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screening {
    /// The path names a PDF; accepted once downloaded
    Pdf,
    /// Passed the URL rules; the download decides
    Inspect,
    Reject(Rejection),
}

/// Applies the URL rules: PDF paths first, then ignore list and keywords
pub fn screen_url(url: &Url) -> Screening {
    let path = url.path().to_lowercase();
    if path.ends_with(".pdf") {
        return Screening::Pdf;
    }

    let host = extract_domain(url).unwrap_or_default();
    if matches_any_host_pattern(IGNORED_HOSTS, &host) {
        return Screening::Reject(Rejection::IgnoredHost);
    }

    if !MENU_KEYWORDS.iter().any(|keyword| path.contains(keyword)) {
        return Screening::Reject(Rejection::NoMenuKeyword);
    }

    Screening::Inspect
}

/// Returns true for pixel sizes typical of a photographed or scanned menu page
pub fn is_menu_sized(size: ImageSize) -> bool {
    if size.width <= 300 || size.height <= 400 {
        return false;
    }
    let ratio = f64::from(size.width) / f64::from(size.height);
    ratio > 0.5 && ratio < 2.5
}

/// Applies the image rules to a downloaded candidate
///
/// # Arguments
///
/// * `file` - The downloaded candidate
/// * `rendered` - Natural size of the matching `<img>`, if the page shows it
pub fn judge_image(file: &DownloadedFile, rendered: Option<ImageSize>) -> Result<(), Rejection> {
    if !file.is_image() {
        return Err(Rejection::NotAnImage);
    }
    if file.body.len() < MIN_FILE_SIZE {
        return Err(Rejection::TooSmall {
            bytes: file.body.len(),
        });
    }
    let size = rendered.ok_or(Rejection::NotRendered)?;
    if !is_menu_sized(size) {
        return Err(Rejection::BadDimensions {
            width: size.width,
            height: size.height,
        });
    }
    Ok(())
}

fn has_file_extension(url: &Url) -> bool {
    let path = url.path().to_lowercase();
    FILE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Collects candidate file URLs from the DOM snapshot and the resource entries
///
/// Only absolute http(s) URLs ending in a menu file extension are kept.
/// Duplicates are removed; document order comes first, then load order.
pub fn collect_candidates(html: &str, page_url: &Url, resource_entries: &[String]) -> Vec<Url> {
    let mut raw: Vec<String> = Vec::new();

    if let Ok(selector) = Selector::parse(CANDIDATE_SELECTOR) {
        let document = Html::parse_document(html);
        for element in document.select(&selector) {
            let attr = match element.value().name() {
                "a" => "href",
                "object" => "data",
                _ => "src",
            };
            if let Some(value) = element.value().attr(attr) {
                raw.push(value.trim().to_string());
            }
        }
    }
    raw.extend(resource_entries.iter().cloned());

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for value in raw {
        let Ok(mut url) = page_url.join(&value) else {
            continue;
        };
        if !matches!(url.scheme(), "http" | "https") || !has_file_extension(&url) {
            continue;
        }
        url.set_fragment(None);
        if seen.insert(url.to_string()) {
            candidates.push(url);
        }
    }
    candidates
}

/// Location of a saved file: the source hostname and the last path segment
pub fn storage_path(url: &Url) -> Option<(String, String)> {
    let host = extract_domain(url)?;
    let filename = url.path_segments()?.next_back()?.to_string();
    if filename.is_empty() || filename == "." || filename == ".." || filename.contains('\\') {
        return None;
    }
    Some((host, filename))
}

/// Adds a short hash of the source URL to a file name, before its extension
fn disambiguate(filename: &str, url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    let digest = hex::encode(hasher.finalize());
    let tag = &digest[..8];

    match filename.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => format!("{}-{}.{}", stem, tag, extension),
        _ => format!("{}-{}", filename, tag),
    }
}

/// A candidate that passed every rule
#[derive(Debug, Clone)]
pub struct AcceptedFile {
    pub url: Url,
    pub body: Vec<u8>,
}

/// Accepted candidates of one job, keyed by absolute URL
#[derive(Debug, Default)]
pub struct AcceptedFiles {
    files: Vec<AcceptedFile>,
}

impl AcceptedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a file; returns false if the URL was already recorded
    pub fn record(&mut self, url: Url, body: Vec<u8>) -> bool {
        if self.files.iter().any(|f| f.url == url) {
            return false;
        }
        self.files.push(AcceptedFile { url, body });
        true
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Writes every file to `<upload_root>/<hostname>/<filename>`
    ///
    /// A file whose name another file of this batch already took gets a
    /// hash of its URL added to the name.
    ///
    /// # Returns
    ///
    /// The saved paths relative to the upload root. Files whose name is
    /// unusable or whose write fails are logged and left out.
    pub async fn save_files(&self, upload_root: &Path) -> Vec<String> {
        let mut saved = Vec::new();
        let mut taken = HashSet::new();

        for file in &self.files {
            let Some((host, mut filename)) = storage_path(&file.url) else {
                tracing::warn!("No usable file name in {}, skipping", file.url);
                continue;
            };
            if !taken.insert(format!("{}/{}", host, filename)) {
                filename = disambiguate(&filename, &file.url);
                taken.insert(format!("{}/{}", host, filename));
            }

            let dir = upload_root.join(&host);
            if let Err(e) = tokio::fs::create_dir_all(&dir).await {
                tracing::warn!("Cannot create {}: {}", dir.display(), e);
                continue;
            }

            let target = dir.join(&filename);
            match tokio::fs::write(&target, &file.body).await {
                Ok(()) => {
                    tracing::debug!("Saved {} to {}", file.url, target.display());
                    saved.push(format!("{}/{}", host, filename));
                }
                Err(e) => tracing::warn!("Failed to write {}: {}", target.display(), e),
            }
        }

        saved
    }
}

/// Harvests menu PDFs and images
pub struct FileExtractor {
    client: Client,
    upload_root: PathBuf,
    render_timeout: Duration,
}

impl FileExtractor {
    pub fn new(client: Client, upload_root: PathBuf, render_timeout: Duration) -> Self {
        Self {
            client,
            upload_root,
            render_timeout,
        }
    }

    /// Runs the acceptance rules on one candidate
    ///
    /// # Returns
    ///
    /// * `Ok(Some(body))` - Accepted
    /// * `Ok(None)` - Rejected by a rule
    /// * `Err(HarvestError)` - The download failed
    async fn evaluate(&self, page: &dyn Page, url: &Url) -> Result<Option<Vec<u8>>, HarvestError> {
        let screening = screen_url(url);
        if let Screening::Reject(reason) = screening {
            tracing::debug!("Rejected {}: {}", url, reason);
            return Ok(None);
        }

        let file = download(&self.client, url, page.user_agent()).await?;
        if screening == Screening::Pdf || file.is_pdf() {
            return Ok(Some(file.body));
        }

        let rendered = if file.is_image() && file.body.len() >= MIN_FILE_SIZE {
            match page.image_size(url.as_str()).await {
                Ok(size) => size,
                Err(e) => {
                    tracing::warn!("Could not measure {} on the page: {}", url, e);
                    None
                }
            }
        } else {
            None
        };

        match judge_image(&file, rendered) {
            Ok(()) => Ok(Some(file.body)),
            Err(reason) => {
                tracing::debug!("Rejected {}: {}", url, reason);
                Ok(None)
            }
        }
    }

    /// Evaluates every candidate, isolating per-candidate failures
    pub async fn accept_candidates(&self, page: &dyn Page, candidates: Vec<Url>) -> AcceptedFiles {
        let mut accepted = AcceptedFiles::new();
        for url in candidates {
            match self.evaluate(page, &url).await {
                Ok(Some(body)) => {
                    tracing::info!("Accepted menu file {}", url);
                    accepted.record(url, body);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Candidate {} failed: {}", url, e),
            }
        }
        accepted
    }
}

#[async_trait]
impl Extractor for FileExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::FileExtractor
    }

    async fn try_extract(
        &self,
        ctx: &PageContext<'_>,
        _resource: Option<&str>,
    ) -> Result<Option<Extraction>, HarvestError> {
        match ctx.page.wait_for_render(self.render_timeout).await {
            Ok(true) => {}
            Ok(false) => tracing::debug!(
                "Render wait timed out for {}, using what is there",
                ctx.page_url
            ),
            Err(e) => tracing::warn!("Render wait failed for {}: {}", ctx.page_url, e),
        }

        let html = ctx.page.content().await?;
        let entries = ctx.page.resource_entries().await.unwrap_or_else(|e| {
            tracing::warn!("No resource entries for {}: {}", ctx.page_url, e);
            Vec::new()
        });

        let candidates = collect_candidates(&html, ctx.page_url, &entries);
        tracing::debug!("{} file candidates on {}", candidates.len(), ctx.page_url);
        if candidates.is_empty() {
            return Ok(None);
        }

        let accepted = self.accept_candidates(ctx.page, candidates).await;
        if accepted.is_empty() {
            return Ok(None);
        }

        let saved = accepted.save_files(&self.upload_root).await;
        if saved.is_empty() {
            return Ok(None);
        }

        Ok(Some(Extraction {
            data: saved,
            resource: None,
        }))
    }
}
