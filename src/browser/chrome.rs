//! Headless Chrome over the DevTools protocol
//!
//! One browser process is shared by every worker. It is launched on first use,
//! relaunched if its event handler dies, and closed by `shutdown`.

use crate::browser::identity::pick_user_agent;
use crate::browser::{Browser, BrowserError, BrowserResult, ImageSize, Page};
use crate::config::BrowserSettings;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page as CdpPage;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Extra Chrome switches for running inside containers and looking less automated
const LAUNCH_ARGS: &[&str] = &[
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-blink-features=AutomationControlled",
];

const HIDE_WEBDRIVER_JS: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

const RENDER_PROBE_SELECTOR: &str = "a[href], img[src], source[src], object[data], embed[src]";

const POLL_INTERVAL: Duration = Duration::from_millis(100);

struct Session {
    browser: Arc<CdpBrowser>,
    handler: JoinHandle<()>,
}

/// Lazily launched Chrome shared by all workers
pub struct ChromeBrowser {
    settings: BrowserSettings,
    session: Mutex<Option<Session>>,
}

impl ChromeBrowser {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            session: Mutex::new(None),
        }
    }

    /// Returns the running browser, launching it if needed
    ///
    /// Concurrent callers are serialized on the session lock so only one
    /// process is ever started.
    pub async fn acquire(&self) -> BrowserResult<Arc<CdpBrowser>> {
        let mut session = self.session.lock().await;

        if let Some(existing) = session.as_ref() {
            if !existing.handler.is_finished() {
                return Ok(existing.browser.clone());
            }
            tracing::warn!("Browser connection lost, relaunching");
            *session = None;
        }

        let launched = self.launch().await?;
        let browser = launched.browser.clone();
        *session = Some(launched);
        Ok(browser)
    }

    async fn launch(&self) -> BrowserResult<Session> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .args(LAUNCH_ARGS.iter().copied())
            .request_timeout(self.settings.navigation_timeout());

        if !self.settings.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &self.settings.executable {
            builder = builder.chrome_executable(executable);
        }

        let config = builder.build().map_err(BrowserError::Launch)?;
        let (browser, mut handler) = CdpBrowser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler event error: {}", e);
                }
            }
        });

        tracing::info!(
            "Browser launched (headless: {})",
            self.settings.headless
        );

        Ok(Session {
            browser: Arc::new(browser),
            handler,
        })
    }

    async fn prepare_page(page: &CdpPage, user_agent: &str) -> BrowserResult<()> {
        page.set_user_agent(SetUserAgentOverrideParams::new(user_agent))
            .await?;
        page.evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(
            HIDE_WEBDRIVER_JS,
        ))
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Browser for ChromeBrowser {
    async fn open_page(&self) -> BrowserResult<Box<dyn Page>> {
        let browser = self.acquire().await?;
        let user_agent = pick_user_agent(&self.settings.user_agents)
            .ok_or_else(|| BrowserError::Launch("empty user agent pool".to_string()))?
            .to_string();

        let page = browser.new_page("about:blank").await?;
        if let Err(e) = Self::prepare_page(&page, &user_agent).await {
            if let Err(close_err) = page.close().await {
                tracing::debug!("Failed to close half-initialized page: {}", close_err);
            }
            return Err(e);
        }

        tracing::debug!("Opened page with user agent: {}", user_agent);

        Ok(Box::new(ChromePage {
            page,
            user_agent,
            network_idle: self.settings.network_idle(),
        }))
    }

    async fn shutdown(&self) {
        let Some(session) = self.session.lock().await.take() else {
            return;
        };

        match Arc::try_unwrap(session.browser) {
            Ok(mut browser) => {
                if let Err(e) = browser.close().await {
                    tracing::warn!("Failed to close browser: {}", e);
                }
                if let Err(e) = browser.wait().await {
                    tracing::warn!("Failed to reap browser process: {}", e);
                }
            }
            Err(_) => {
                tracing::warn!("Browser still in use at shutdown, dropping it");
            }
        }

        session.handler.abort();
        tracing::info!("Browser shut down");
    }
}

#[derive(Debug, Deserialize)]
struct LoadState {
    complete: bool,
    resources: usize,
}

struct ChromePage {
    page: CdpPage,
    user_agent: String,
    network_idle: Duration,
}

impl ChromePage {
    /// Evaluates a function body in the page and decodes its JSON-encoded result
    async fn evaluate_json<T: DeserializeOwned>(&self, body: &str) -> BrowserResult<T> {
        let expression = format!("JSON.stringify((() => {{ {} }})() ?? null)", body);
        let raw: String = self
            .page
            .evaluate(expression.as_str())
            .await?
            .into_value()
            .map_err(|e| BrowserError::Evaluation(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| BrowserError::Evaluation(e.to_string()))
    }

    /// Polls a boolean expression until it holds or the timeout passes
    async fn poll_until(&self, body: &str, timeout: Duration) -> BrowserResult<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.evaluate_json::<bool>(body).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Waits until the document is complete and no new resource appeared for the idle window
    async fn wait_for_network_idle(&self) -> BrowserResult<()> {
        let mut last_count = None;
        let mut quiet_since = Instant::now();

        loop {
            let state: LoadState = self
                .evaluate_json(
                    "return { complete: document.readyState === 'complete', \
                     resources: performance.getEntriesByType('resource').length };",
                )
                .await?;

            let now = Instant::now();
            if last_count != Some(state.resources) {
                last_count = Some(state.resources);
                quiet_since = now;
            }
            if state.complete && now.duration_since(quiet_since) >= self.network_idle {
                return Ok(());
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

fn js_string(value: &str) -> BrowserResult<String> {
    serde_json::to_string(value).map_err(|e| BrowserError::Evaluation(e.to_string()))
}

#[async_trait]
impl Page for ChromePage {
    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<()> {
        let load = async {
            self.page.goto(url).await?;
            self.wait_for_network_idle().await
        };

        match tokio::time::timeout(timeout, load).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::Timeout(format!(
                "navigation to {} after {:?}",
                url, timeout
            ))),
        }
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> BrowserResult<bool> {
        let body = format!("return document.querySelector({}) !== null;", js_string(selector)?);
        self.poll_until(&body, timeout).await
    }

    async fn wait_for_render(&self, timeout: Duration) -> BrowserResult<bool> {
        let body = format!(
            "return document.querySelector({}) !== null;",
            js_string(RENDER_PROBE_SELECTOR)?
        );
        self.poll_until(&body, timeout).await
    }

    async fn content(&self) -> BrowserResult<String> {
        Ok(self.page.content().await?)
    }

    async fn url(&self) -> BrowserResult<Option<String>> {
        Ok(self.page.url().await?)
    }

    async fn resource_entries(&self) -> BrowserResult<Vec<String>> {
        self.evaluate_json("return performance.getEntriesByType('resource').map(e => e.name);")
            .await
    }

    async fn image_size(&self, src: &str) -> BrowserResult<Option<ImageSize>> {
        let body = format!(
            "const target = new URL({}, document.baseURI).href; \
             const img = Array.from(document.images).find(i => i.currentSrc === target || i.src === target); \
             return img ? {{ width: img.naturalWidth || img.width, height: img.naturalHeight || img.height }} : null;",
            js_string(src)?
        );
        self.evaluate_json(&body).await
    }

    fn user_agent(&self) -> &str {
        &self.user_agent
    }

    async fn close(&self) -> BrowserResult<()> {
        self.page.clone().close().await?;
        Ok(())
    }
}
