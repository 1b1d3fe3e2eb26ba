//! Harvester configuration.
//!
//! Every knob the engine reads lives here and is passed in at construction.
//! Defaults reproduce the timings the harvester was tuned with against the
//! live storefront; tests swap in [`HarvestConfig::instant`] so fake content
//! surfaces run without real pauses.

use crate::locator::LocatorTable;
use crate::provider::SessionProfile;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Run the browser without a visible window.
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Budget for a page navigation to complete.
    #[serde(default = "default_page_timeout_ms")]
    pub page_timeout_ms: u64,
    /// Budget for an element to appear or become clickable.
    #[serde(default = "default_element_timeout_ms")]
    pub element_timeout_ms: u64,
    /// Budget for the review-panel redirect during entry-point discovery.
    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,
    /// Consecutive cycles without growth before pagination stops.
    #[serde(default = "default_max_stall_attempts")]
    pub max_stall_attempts: u32,
    /// Pause after each scroll gesture.
    #[serde(default = "default_scroll_settle_ms")]
    pub scroll_settle_ms: u64,
    /// Pause after activating the load-more control.
    #[serde(default = "default_load_more_settle_ms")]
    pub load_more_settle_ms: u64,
    /// Pause between opening the rating menu and picking a filter.
    #[serde(default = "default_filter_menu_settle_ms")]
    pub filter_menu_settle_ms: u64,
    /// Vertical scroll distance per gesture, in pixels.
    #[serde(default = "default_scroll_delta")]
    pub scroll_delta: f64,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Path fragment identifying the review panel's URL.
    #[serde(default = "default_review_path_marker")]
    pub review_path_marker: String,
    #[serde(default)]
    pub locators: LocatorTable,
}

fn default_headless() -> bool {
    false
}

fn default_page_timeout_ms() -> u64 {
    60_000
}

fn default_element_timeout_ms() -> u64 {
    10_000
}

fn default_discovery_timeout_ms() -> u64 {
    10_000
}

fn default_max_stall_attempts() -> u32 {
    10
}

fn default_scroll_settle_ms() -> u64 {
    1_000
}

fn default_load_more_settle_ms() -> u64 {
    2_000
}

fn default_filter_menu_settle_ms() -> u64 {
    1_000
}

fn default_scroll_delta() -> f64 {
    500.0
}

fn default_viewport_width() -> u32 {
    1366
}

fn default_viewport_height() -> u32 {
    768
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}

fn default_review_path_marker() -> String {
    "/catalog/reviews/".to_string()
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            page_timeout_ms: default_page_timeout_ms(),
            element_timeout_ms: default_element_timeout_ms(),
            discovery_timeout_ms: default_discovery_timeout_ms(),
            max_stall_attempts: default_max_stall_attempts(),
            scroll_settle_ms: default_scroll_settle_ms(),
            load_more_settle_ms: default_load_more_settle_ms(),
            filter_menu_settle_ms: default_filter_menu_settle_ms(),
            scroll_delta: default_scroll_delta(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            user_agent: default_user_agent(),
            review_path_marker: default_review_path_marker(),
            locators: LocatorTable::default(),
        }
    }
}

impl HarvestConfig {
    /// Configuration with every settle pause set to zero and short timeouts.
    /// Intended for fake providers.
    pub fn instant() -> Self {
        Self {
            headless: true,
            page_timeout_ms: 100,
            element_timeout_ms: 100,
            discovery_timeout_ms: 100,
            scroll_settle_ms: 0,
            load_more_settle_ms: 0,
            filter_menu_settle_ms: 0,
            ..Self::default()
        }
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    pub fn load_more_settle(&self) -> Duration {
        Duration::from_millis(self.load_more_settle_ms)
    }

    pub fn filter_menu_settle(&self) -> Duration {
        Duration::from_millis(self.filter_menu_settle_ms)
    }

    /// Browser settings requested from the provider for each session.
    pub fn session_profile(&self) -> SessionProfile {
        SessionProfile {
            headless: self.headless,
            viewport_width: self.viewport_width,
            viewport_height: self.viewport_height,
            user_agent: Some(self.user_agent.clone()),
        }
    }
}
