//! Chromium browser provider using chromiumoxide.
//!
//! Every session launches its own browser process with a single page, so
//! discovery and harvesting never share cookies or navigation state.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::EventResponseReceived;
use chromiumoxide::element::Element;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::{Future, StreamExt};
use review_harvest::{BrowserProvider, BrowserSession, ElementHandle, SessionProfile, Target};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Environment variable naming an explicit Chromium binary.
pub const CHROMIUM_PATH_ENV: &str = "REVIEW_HARVEST_CHROMIUM_PATH";

/// Interval between checks while waiting for an element or a response.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(CHROMIUM_PATH_ENV) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // Chrome for Testing unpacked under ~/.cache/review-harvest/
    if let Some(cache) = dirs::cache_dir() {
        let root = cache.join("review-harvest/chromium");
        let candidates = if cfg!(target_os = "macos") {
            vec![
                root.join("chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                root.join("chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
            ]
        } else {
            vec![root.join("chrome-linux64/chrome"), root.join("chrome")]
        };
        if let Some(found) = candidates.into_iter().find(|c| c.exists()) {
            return Some(found);
        }
    }

    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launches one Chromium process per session.
#[derive(Debug, Clone)]
pub struct ChromiumProvider {
    executable: PathBuf,
}

impl ChromiumProvider {
    /// Locate Chromium up front so a missing browser fails before any
    /// product is attempted.
    pub fn new() -> Result<Self> {
        let executable = find_chromium()
            .with_context(|| format!("Chromium not found; set {CHROMIUM_PATH_ENV}"))?;
        Ok(Self::with_executable(executable))
    }

    pub fn with_executable(executable: PathBuf) -> Self {
        Self { executable }
    }

    fn browser_config(&self, profile: &SessionProfile) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .chrome_executable(&self.executable)
            .window_size(profile.viewport_width, profile.viewport_height)
            .viewport(None::<Viewport>)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if !profile.headless {
            builder = builder.with_head();
        }
        builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))
    }
}

#[async_trait]
impl BrowserProvider for ChromiumProvider {
    async fn open_session(&self, profile: &SessionProfile) -> Result<Box<dyn BrowserSession>> {
        let (browser, mut handler) = Browser::launch(self.browser_config(profile)?)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("browser handler: {e}");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;
        if let Some(user_agent) = &profile.user_agent {
            page.set_user_agent(user_agent.as_str())
                .await
                .context("failed to set user agent")?;
        }

        // Response URLs feed `await_response`; CDP delivers them as events.
        let responses = Arc::new(Mutex::new(Vec::new()));
        let mut events = page
            .event_listener::<EventResponseReceived>()
            .await
            .context("failed to subscribe to network responses")?;
        let log = Arc::clone(&responses);
        let listener = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let Ok(mut log) = log.lock() {
                    log.push(event.response.url.clone());
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            page,
            responses,
            tasks: vec![handler, listener],
        }))
    }
}

/// One browser process and its page.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    responses: Arc<Mutex<Vec<String>>>,
    tasks: Vec<JoinHandle<()>>,
}

impl ChromiumSession {
    async fn find(&self, target: &Target) -> Result<Vec<Element>> {
        let elements = self
            .page
            .find_elements(target.selector())
            .await
            .with_context(|| format!("failed to query {target}"))?;
        filter_by_label(elements, target).await
    }

    /// Poll until `target` matches at least one element.
    async fn wait_for_elements(&self, target: &Target, timeout: Duration) -> Result<Vec<Element>> {
        let what = target.to_string();
        poll_until(timeout, &what, || async move {
            let found = self.find(target).await?;
            Ok::<_, anyhow::Error>((!found.is_empty()).then_some(found))
        })
        .await
    }

    fn take_response(
        &self,
        matches: &(dyn for<'u> Fn(&'u str) -> bool + Send + Sync),
    ) -> Result<Option<String>> {
        let log = self
            .responses
            .lock()
            .map_err(|_| anyhow!("response log poisoned"))?;
        Ok(log.iter().find(|url| matches(url.as_str())).cloned())
    }
}

/// Run `attempt` every [`POLL_INTERVAL`] until it yields a value or
/// `timeout` passes. Failed attempts are retried; the last failure is
/// attached to the timeout error.
async fn poll_until<T, F, Fut>(timeout: Duration, what: &str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + timeout;
    let mut last_error = None;
    loop {
        match attempt().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => last_error = None,
            Err(e) => last_error = Some(e),
        }
        if Instant::now() >= deadline {
            let message = format!("timed out after {}ms waiting for {what}", timeout.as_millis());
            return Err(match last_error {
                Some(e) => e.context(message),
                None => anyhow!(message),
            });
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Keep elements whose text contains the target's label, if it has one.
/// Matching is case-insensitive.
async fn filter_by_label(elements: Vec<Element>, target: &Target) -> Result<Vec<Element>> {
    let Some(label) = target.label() else {
        return Ok(elements);
    };
    let label = label.to_lowercase();
    let mut kept = Vec::new();
    for element in elements {
        let text = element.inner_text().await?.unwrap_or_default();
        if text.to_lowercase().contains(&label) {
            kept.push(element);
        }
    }
    Ok(kept)
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let page = &self.page;
        let load = async move {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        };
        match tokio::time::timeout(timeout, load).await {
            Ok(loaded) => loaded.with_context(|| format!("navigation to {url} failed")),
            Err(_) => bail!("navigation timed out after {}ms", timeout.as_millis()),
        }
    }

    async fn reset_responses(&mut self) -> Result<()> {
        self.responses
            .lock()
            .map_err(|_| anyhow!("response log poisoned"))?
            .clear();
        Ok(())
    }

    async fn click(&mut self, target: &Target, timeout: Duration) -> Result<()> {
        let elements = self.wait_for_elements(target, timeout).await?;
        let element = elements
            .first()
            .with_context(|| format!("{target} disappeared before click"))?;
        element
            .click()
            .await
            .with_context(|| format!("failed to click {target}"))?;
        Ok(())
    }

    async fn query(&self, target: &Target) -> Result<Vec<Box<dyn ElementHandle>>> {
        Ok(self
            .find(target)
            .await?
            .into_iter()
            .map(|element| Box::new(ChromiumElement { element }) as Box<dyn ElementHandle>)
            .collect())
    }

    async fn wait_for(&self, target: &Target, timeout: Duration) -> Result<()> {
        self.wait_for_elements(target, timeout).await.map(|_| ())
    }

    async fn scroll(&mut self, dx: f64, dy: f64) -> Result<()> {
        let script = format!("window.scrollBy({dx}, {dy})");
        self.page
            .evaluate(script.as_str())
            .await
            .context("scroll failed")?;
        Ok(())
    }

    async fn await_response(
        &mut self,
        matches: &(dyn for<'u> Fn(&'u str) -> bool + Send + Sync),
        timeout: Duration,
    ) -> Result<String> {
        let this = &*self;
        poll_until(timeout, "a matching response", || async move {
            this.take_response(matches)
        })
        .await
    }

    async fn current_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let ChromiumSession {
            mut browser,
            page,
            tasks,
            ..
        } = *self;
        let _ = page.close().await;
        let closed = browser.close().await;
        let _ = browser.wait().await;
        for task in tasks {
            task.abort();
        }
        closed.context("failed to close Chromium")?;
        Ok(())
    }
}

/// An element on a Chromium page.
pub struct ChromiumElement {
    element: Element,
}

#[async_trait]
impl ElementHandle for ChromiumElement {
    async fn text(&self) -> Result<String> {
        Ok(self
            .element
            .inner_text()
            .await
            .context("failed to read element text")?
            .unwrap_or_default())
    }

    async fn query(&self, target: &Target) -> Result<Option<Box<dyn ElementHandle>>> {
        let children = self
            .element
            .find_elements(target.selector())
            .await
            .with_context(|| format!("failed to query {target}"))?;
        let children = filter_by_label(children, target).await?;
        Ok(children
            .into_iter()
            .next()
            .map(|element| Box::new(ChromiumElement { element }) as Box<dyn ElementHandle>))
    }

    async fn click(&self) -> Result<()> {
        self.element.click().await.context("click failed")?;
        Ok(())
    }
}
