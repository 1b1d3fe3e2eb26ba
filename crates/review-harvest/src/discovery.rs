//! Entry-point discovery.
//!
//! The product page does not link to the review panel directly: activating
//! its "reviews" link triggers a redirect to the panel. Discovery follows that
//! redirect and returns the panel URL, which every rating tier needs.

use crate::config::HarvestConfig;
use crate::locator::Locator;
use crate::provider::BrowserSession;
use crate::types::{HarvestError, HarvestResult};
use std::time::Duration;
use tokio::time::Instant;

/// Interval between page-URL checks while the redirect commits.
const URL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Resolve the review-panel URL for a product page.
///
/// Any failure (navigation, missing link, no redirect within the discovery
/// timeout) is an [`HarvestError::EntryPointNotFound`].
pub async fn discover_entry_point(
    session: &mut dyn BrowserSession,
    product_url: &str,
    config: &HarvestConfig,
) -> HarvestResult<String> {
    let not_found = |reason: String| HarvestError::EntryPointNotFound {
        url: product_url.to_string(),
        reason,
    };

    tracing::info!(url = product_url, "opening product page");
    session
        .navigate(product_url, config.page_timeout())
        .await
        .map_err(|e| not_found(format!("navigation failed: {e:#}")))?;

    // Responses from the product page itself (embedded widgets, prefetches)
    // must not stand in for the redirect the link triggers.
    session
        .reset_responses()
        .await
        .map_err(|e| not_found(format!("could not reset response log: {e:#}")))?;

    let link = config.locators.locate(Locator::ReviewsLink);
    tracing::debug!(link = %link, "activating reviews link");
    session
        .click(&link, config.element_timeout())
        .await
        .map_err(|e| not_found(format!("reviews link not activated: {e:#}")))?;

    let marker = config.review_path_marker.as_str();
    let deadline = Instant::now() + config.discovery_timeout();
    let response_url = session
        .await_response(&|url: &str| url.contains(marker), config.discovery_timeout())
        .await
        .map_err(|e| not_found(format!("no response under {marker}: {e:#}")))?;

    let entry_point = match committed_url(session, marker, deadline).await {
        Some(url) => url,
        None => {
            tracing::debug!(
                response = %response_url,
                "page URL never reached the review panel, using response URL"
            );
            response_url
        }
    };

    tracing::info!(entry_point = %entry_point, "review panel resolved");
    Ok(entry_point)
}

/// Poll the page URL until it contains `marker` or `deadline` passes.
async fn committed_url(
    session: &mut dyn BrowserSession,
    marker: &str,
    deadline: Instant,
) -> Option<String> {
    loop {
        match session.current_url().await {
            Ok(url) if url.contains(marker) => return Some(url),
            Ok(_) => {}
            Err(e) => tracing::debug!("could not read page URL after redirect: {e:#}"),
        }
        if Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(URL_POLL_INTERVAL).await;
    }
}
