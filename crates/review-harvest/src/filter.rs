//! Rating filter controller.
//!
//! Walks the panel through the five rating tiers, highest first. Each tier
//! goes through the same phases:
//!
//! 1. **Apply**: open the rating menu, wait for it to settle, pick the
//!    tier's filter, then wait for the first review to appear.
//! 2. **Paginate**: load every review for the filter.
//! 3. **Extract**: turn the loaded items into records.
//!
//! A tier that fails at any phase is reported unavailable and skipped; the
//! remaining tiers still run.

use crate::aggregate::CollectedReviews;
use crate::config::HarvestConfig;
use crate::extractor::{ExtractionBatch, RecordExtractor};
use crate::locator::Locator;
use crate::pagination::{PageSurface, PaginationOutcome, Paginator};
use crate::progress::{Progress, ProgressEventKind};
use crate::provider::BrowserSession;
use crate::report::{TierLedger, TierReport, TierStatus};
use crate::types::{HarvestError, HarvestResult, RatingTier};

/// Result of one successfully processed tier.
#[derive(Debug, Clone)]
pub struct TierHarvest {
    pub tier: RatingTier,
    pub pagination: PaginationOutcome,
    /// Items present when extraction started.
    pub loaded: usize,
    pub batch: ExtractionBatch,
}

/// Drives the rating tiers of one review panel.
pub struct FilterController<'a> {
    config: &'a HarvestConfig,
    paginator: Paginator,
    extractor: RecordExtractor,
}

impl<'a> FilterController<'a> {
    pub fn new(config: &'a HarvestConfig) -> Self {
        Self {
            config,
            paginator: Paginator::from_config(config),
            extractor: RecordExtractor::new(&config.locators),
        }
    }

    /// Process every tier, appending records to `collected` and outcomes to
    /// `ledger`.
    pub async fn run(
        &self,
        session: &mut dyn BrowserSession,
        collected: &mut CollectedReviews,
        ledger: &mut TierLedger,
        progress: &mut Progress,
    ) {
        for tier in RatingTier::ALL {
            tracing::info!(%tier, "processing tier");
            progress.emit(ProgressEventKind::TierStarted { tier });

            match self.harvest_tier(session, tier).await {
                Ok(harvest) => {
                    let records = harvest.batch.records.len();
                    tracing::info!(%tier, loaded = harvest.loaded, records, "tier collected");
                    progress.emit(ProgressEventKind::TierCompleted {
                        tier,
                        loaded: harvest.loaded,
                        records,
                    });
                    ledger.tiers.push(TierReport {
                        tier,
                        status: TierStatus::Collected {
                            loaded: harvest.loaded,
                            records,
                            pagination: harvest.pagination,
                        },
                    });
                    ledger.skipped_items.extend(harvest.batch.skipped);
                    ledger.raw_dates += harvest.batch.raw_dates;
                    collected.append(harvest.batch.records);
                }
                Err(error) => {
                    let reason = match error {
                        HarvestError::TierUnavailable { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    tracing::warn!(%tier, %reason, "tier unavailable, skipping");
                    progress.emit(ProgressEventKind::TierSkipped {
                        tier,
                        reason: reason.clone(),
                    });
                    ledger.record_unavailable(tier, reason);
                }
            }
        }
    }

    /// Apply, paginate and extract a single tier.
    pub async fn harvest_tier(
        &self,
        session: &mut dyn BrowserSession,
        tier: RatingTier,
    ) -> HarvestResult<TierHarvest> {
        let unavailable = |reason: String| HarvestError::TierUnavailable { tier, reason };

        self.apply_filter(session, tier).await?;

        let pagination = {
            let mut surface = PageSurface::new(&mut *session, self.config);
            self.paginator
                .exhaust(&mut surface)
                .await
                .map_err(|e| unavailable(format!("pagination failed: {e:#}")))?
        };

        let items = session
            .query(&self.config.locators.locate(Locator::CommentItem))
            .await
            .map_err(|e| unavailable(format!("could not list reviews: {e:#}")))?;

        let loaded = items.len();
        let batch = self.extractor.extract_all(&items, tier).await;

        Ok(TierHarvest {
            tier,
            pagination,
            loaded,
            batch,
        })
    }

    /// Select the tier's filter and wait for its first review.
    pub async fn apply_filter(
        &self,
        session: &mut dyn BrowserSession,
        tier: RatingTier,
    ) -> HarvestResult<()> {
        let unavailable = |reason: String| HarvestError::TierUnavailable { tier, reason };
        let locators = &self.config.locators;
        let timeout = self.config.element_timeout();

        session
            .click(&locators.locate(Locator::RatingMenu), timeout)
            .await
            .map_err(|e| unavailable(format!("rating menu not opened: {e:#}")))?;

        let pause = self.config.filter_menu_settle();
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }

        session
            .click(&locators.locate(Locator::RatingFilter(tier)), timeout)
            .await
            .map_err(|e| unavailable(format!("filter not applied: {e:#}")))?;

        session
            .wait_for(&locators.locate(Locator::CommentItem), timeout)
            .await
            .map_err(|e| unavailable(format!("no reviews appeared: {e:#}")))?;

        Ok(())
    }
}
