//! Browser automation abstraction.
//!
//! Defines the `BrowserProvider`, `BrowserSession` and `ElementHandle` traits
//! the harvester drives. The engine assumes nothing about the browser beyond
//! these capabilities; the CLI crate implements them on Chromium and tests
//! implement them in memory.

use crate::locator::Target;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Browser settings requested when opening a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProfile {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Override for the browser's user agent.
    pub user_agent: Option<String>,
}

/// A browser engine that can open isolated sessions.
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    /// Open a new browser session. The caller must `close` it.
    async fn open_session(&self, profile: &SessionProfile) -> Result<Box<dyn BrowserSession>>;
}

/// A single browser session (one page).
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate to a URL and wait for the load to complete.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<()>;
    /// Wait for the first element matching `target`, then click it.
    async fn click(&mut self, target: &Target, timeout: Duration) -> Result<()>;
    /// All elements currently matching `target`, in document order.
    async fn query(&self, target: &Target) -> Result<Vec<Box<dyn ElementHandle>>>;
    /// Wait until at least one element matches `target`.
    async fn wait_for(&self, target: &Target, timeout: Duration) -> Result<()>;
    /// Scroll the page by a pixel offset.
    async fn scroll(&mut self, dx: f64, dy: f64) -> Result<()>;
    /// Forget every network response observed so far.
    async fn reset_responses(&mut self) -> Result<()>;
    /// Wait for a network response whose URL satisfies `matches` and return
    /// that URL. Only responses received since the last
    /// [`reset_responses`](Self::reset_responses) (or since the session
    /// opened) count.
    async fn await_response(
        &mut self,
        matches: &(dyn for<'u> Fn(&'u str) -> bool + Send + Sync),
        timeout: Duration,
    ) -> Result<String>;
    /// URL of the page currently loaded.
    async fn current_url(&self) -> Result<String>;
    /// Release the session and everything it holds.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A handle to one element in a session's page.
#[async_trait]
pub trait ElementHandle: Send + Sync {
    /// Rendered text of the element.
    async fn text(&self) -> Result<String>;
    /// First descendant matching `target`, if any.
    async fn query(&self, target: &Target) -> Result<Option<Box<dyn ElementHandle>>>;
    /// Click the element.
    async fn click(&self) -> Result<()>;
}
