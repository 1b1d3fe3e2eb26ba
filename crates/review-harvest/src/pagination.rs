//! Stall-detection pagination.
//!
//! The review panel loads reviews lazily: scrolling and the "load more"
//! control append items asynchronously. The [`Paginator`] keeps scrolling
//! until the visible item count has failed to grow for `max_attempts`
//! consecutive cycles.
//!
//! # Cycle
//!
//! 1. Scroll once, then wait `scroll_settle`.
//! 2. Count the visible items.
//! 3. No growth: bump the stall counter, and if a load-more control is
//!    present activate it and wait `load_more_settle`. Clicking does not reset
//!    the counter; only observed growth does.
//! 4. Growth: reset the stall counter and remember the new count.
//!
//! There is no cap on the total number of items. Settle pauses that are too
//! short under-collect silently, so they are configuration, not constants.

use crate::config::HarvestConfig;
use crate::locator::{Locator, Target};
use crate::provider::BrowserSession;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Something that grows when scrolled.
#[async_trait]
pub trait ContentSurface: Send {
    /// Number of items currently visible.
    async fn item_count(&mut self) -> Result<usize>;
    /// Perform one scroll gesture.
    async fn scroll(&mut self) -> Result<()>;
    /// Activate the load-more control if one is present.
    /// Returns `false` when there is no such control.
    async fn load_more(&mut self) -> Result<bool>;
}

/// Statistics from one pagination run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationOutcome {
    /// Scroll cycles performed.
    pub cycles: u32,
    /// Item count when the loop stopped.
    pub final_count: usize,
    /// Cycles in which the item count grew.
    pub growth_events: u32,
    /// Cycle number (1-based) of the last growth, if any.
    pub last_growth_cycle: Option<u32>,
    /// Successful activations of the load-more control.
    pub load_more_clicks: u32,
}

impl PaginationOutcome {
    /// Consecutive stalled cycles at the end of the run.
    pub fn trailing_stalls(&self) -> u32 {
        self.cycles - self.last_growth_cycle.unwrap_or(0)
    }
}

/// The stall-detection loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    pub max_attempts: u32,
    pub scroll_settle: Duration,
    pub load_more_settle: Duration,
}

impl Paginator {
    pub fn new(max_attempts: u32, scroll_settle: Duration, load_more_settle: Duration) -> Self {
        Self {
            max_attempts,
            scroll_settle,
            load_more_settle,
        }
    }

    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(
            config.max_stall_attempts,
            config.scroll_settle(),
            config.load_more_settle(),
        )
    }

    /// Load everything the surface will give.
    ///
    /// Errors from scrolling or counting abort the run; a load-more control
    /// that fails to activate is logged and treated as absent for that cycle.
    pub async fn exhaust<S>(&self, surface: &mut S) -> Result<PaginationOutcome>
    where
        S: ContentSurface + ?Sized,
    {
        let mut outcome = PaginationOutcome::default();
        let mut stall = 0u32;
        let mut last_count = 0usize;

        while stall < self.max_attempts {
            outcome.cycles += 1;
            surface.scroll().await?;
            settle(self.scroll_settle).await;

            let current_count = surface.item_count().await?;
            if current_count == last_count {
                stall += 1;
                match surface.load_more().await {
                    Ok(true) => {
                        outcome.load_more_clicks += 1;
                        tracing::debug!(attempt = stall, "load-more control activated");
                        settle(self.load_more_settle).await;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(attempt = stall, "could not activate load-more control: {e:#}");
                    }
                }
            } else {
                tracing::debug!(
                    cycle = outcome.cycles,
                    from = last_count,
                    to = current_count,
                    "items grew"
                );
                stall = 0;
                last_count = current_count;
                outcome.growth_events += 1;
                outcome.last_growth_cycle = Some(outcome.cycles);
            }
        }

        outcome.final_count = last_count;
        Ok(outcome)
    }
}

async fn settle(pause: Duration) {
    if !pause.is_zero() {
        tokio::time::sleep(pause).await;
    }
}

/// [`ContentSurface`] over a live browser session.
pub struct PageSurface<'a> {
    session: &'a mut dyn BrowserSession,
    item: Target,
    load_more: Target,
    scroll_delta: f64,
}

impl<'a> PageSurface<'a> {
    pub fn new(session: &'a mut dyn BrowserSession, config: &HarvestConfig) -> Self {
        Self {
            session,
            item: config.locators.locate(Locator::CommentItem),
            load_more: config.locators.locate(Locator::LoadMoreButton),
            scroll_delta: config.scroll_delta,
        }
    }
}

#[async_trait]
impl<'a> ContentSurface for PageSurface<'a> {
    async fn item_count(&mut self) -> Result<usize> {
        Ok(self.session.query(&self.item).await?.len())
    }

    async fn scroll(&mut self) -> Result<()> {
        self.session.scroll(0.0, self.scroll_delta).await
    }

    async fn load_more(&mut self) -> Result<bool> {
        let controls = self.session.query(&self.load_more).await?;
        match controls.first() {
            Some(control) => {
                control.click().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    /// Surface whose count follows a script, one entry per count read; the
    /// last entry repeats forever.
    struct ScriptedSurface {
        counts: Vec<usize>,
        reads: usize,
        scrolls: u32,
        has_load_more: bool,
        load_more_clicks: u32,
        fail_load_more: bool,
    }

    impl ScriptedSurface {
        fn new(counts: Vec<usize>) -> Self {
            Self {
                counts,
                reads: 0,
                scrolls: 0,
                has_load_more: false,
                load_more_clicks: 0,
                fail_load_more: false,
            }
        }
    }

    #[async_trait]
    impl ContentSurface for ScriptedSurface {
        async fn item_count(&mut self) -> Result<usize> {
            let idx = self.reads.min(self.counts.len() - 1);
            self.reads += 1;
            Ok(self.counts[idx])
        }

        async fn scroll(&mut self) -> Result<()> {
            self.scrolls += 1;
            Ok(())
        }

        async fn load_more(&mut self) -> Result<bool> {
            if self.fail_load_more {
                bail!("control detached");
            }
            if self.has_load_more {
                self.load_more_clicks += 1;
            }
            Ok(self.has_load_more)
        }
    }

    fn paginator(max_attempts: u32) -> Paginator {
        Paginator::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_empty_surface_stops_after_max_attempts() {
        let mut surface = ScriptedSurface::new(vec![0]);
        let outcome = paginator(10).exhaust(&mut surface).await.unwrap();
        assert_eq!(outcome.cycles, 10);
        assert_eq!(surface.scrolls, 10);
        assert_eq!(outcome.final_count, 0);
        assert_eq!(outcome.last_growth_cycle, None);
    }

    #[tokio::test]
    async fn test_static_surface_stops_after_max_stalls() {
        let mut surface = ScriptedSurface::new(vec![7]);
        let outcome = paginator(10).exhaust(&mut surface).await.unwrap();
        // First read is growth from zero; the next ten reads stall.
        assert_eq!(outcome.last_growth_cycle, Some(1));
        assert_eq!(outcome.trailing_stalls(), 10);
        assert_eq!(outcome.cycles, 11);
        assert_eq!(outcome.final_count, 7);
    }

    #[tokio::test]
    async fn test_growth_after_three_stalls_resets_counter() {
        // 5 items, three stalls, growth to 9, then static.
        let mut surface = ScriptedSurface::new(vec![5, 5, 5, 5, 9]);
        let outcome = paginator(10).exhaust(&mut surface).await.unwrap();
        assert_eq!(outcome.growth_events, 2);
        assert_eq!(outcome.last_growth_cycle, Some(5));
        assert_eq!(outcome.trailing_stalls(), 10);
        assert_eq!(outcome.cycles, 15);
        assert_eq!(outcome.final_count, 9);
    }

    #[tokio::test]
    async fn test_load_more_does_not_reset_stall() {
        let mut surface = ScriptedSurface::new(vec![3]);
        surface.has_load_more = true;
        let outcome = paginator(4).exhaust(&mut surface).await.unwrap();
        assert_eq!(outcome.cycles, 5);
        assert_eq!(outcome.load_more_clicks, 4);
        assert_eq!(surface.load_more_clicks, 4);
    }

    #[tokio::test]
    async fn test_failed_load_more_is_not_fatal() {
        let mut surface = ScriptedSurface::new(vec![2]);
        surface.fail_load_more = true;
        let outcome = paginator(3).exhaust(&mut surface).await.unwrap();
        assert_eq!(outcome.cycles, 4);
        assert_eq!(outcome.load_more_clicks, 0);
    }

    #[tokio::test]
    async fn test_zero_attempts_never_scrolls() {
        let mut surface = ScriptedSurface::new(vec![4]);
        let outcome = paginator(0).exhaust(&mut surface).await.unwrap();
        assert_eq!(outcome.cycles, 0);
        assert_eq!(surface.scrolls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_pauses_are_honored() {
        let mut surface = ScriptedSurface::new(vec![0]);
        surface.has_load_more = true;
        let paginator = Paginator::new(2, Duration::from_secs(1), Duration::from_secs(2));
        let start = tokio::time::Instant::now();
        paginator.exhaust(&mut surface).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }
}
