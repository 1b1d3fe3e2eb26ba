//! The harvester: runs products through discovery, tier harvesting and the
//! persistence handoff, one product at a time.

use crate::aggregate::{hand_off, CollectedReviews, ReviewSink};
use crate::config::HarvestConfig;
use crate::discovery::discover_entry_point;
use crate::filter::FilterController;
use crate::locator::Locator;
use crate::progress::{self, Progress, ProgressEventKind, ProgressReceiver, ProgressSender};
use crate::provider::{BrowserProvider, BrowserSession};
use crate::report::{HarvestReport, ProductOutcome, ProductReport, TierLedger};
use crate::session::{Session, SessionPhase};
use crate::types::{HarvestError, HarvestResult, Product};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::Instrument;

/// Review harvester over a browser provider and a persistence sink.
pub struct Harvester<P, S> {
    config: HarvestConfig,
    provider: P,
    sink: S,
    progress: Option<ProgressSender>,
}

impl<P, S> Harvester<P, S>
where
    P: BrowserProvider,
    S: ReviewSink,
{
    pub fn new(config: HarvestConfig, provider: P, sink: S) -> Self {
        Self {
            config,
            provider,
            sink,
            progress: None,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Subscribe to progress events. The channel is created on first use.
    pub fn subscribe(&mut self) -> ProgressReceiver {
        match &self.progress {
            Some(tx) => tx.subscribe(),
            None => {
                let (tx, rx) = progress::channel();
                self.progress = Some(tx);
                rx
            }
        }
    }

    /// Harvest every product in order. Products never run concurrently and a
    /// failed product does not stop the run.
    pub async fn harvest_all(&self, products: &[Product]) -> HarvestReport {
        let mut report = HarvestReport::default();
        for product in products {
            report.products.push(self.harvest_product(product).await);
        }
        report
    }

    /// Harvest one product from discovery to handoff.
    pub async fn harvest_product(&self, product: &Product) -> ProductReport {
        let span = tracing::info_span!("product", name = %product.name);
        self.run_product(product).instrument(span).await
    }

    async fn run_product(&self, product: &Product) -> ProductReport {
        let mut progress = Progress::new(self.progress.clone(), product.name.as_str());
        let mut ledger = TierLedger::default();
        tracing::info!(url = %product.url, "harvesting product");
        progress.emit(ProgressEventKind::ProductStarted {
            url: product.url.clone(),
        });

        let entry_point = match self.discover(&product.url).await {
            Ok(url) => url,
            Err(error) => return self.fail(product, None, ledger, error, &mut progress),
        };
        progress.emit(ProgressEventKind::EntryPointResolved {
            url: entry_point.clone(),
        });

        let collected = match self
            .harvest_panel(&entry_point, &mut ledger, &mut progress)
            .await
        {
            Ok(collected) => collected,
            Err(error) => {
                return self.fail(product, Some(entry_point), ledger, error, &mut progress)
            }
        };

        match hand_off(&product.name, collected, &self.sink).await {
            Ok((location, records)) => {
                progress.emit(ProgressEventKind::ProductPersisted {
                    location: location.clone(),
                    records,
                });
                ProductReport::new(
                    product.name.as_str(),
                    Some(entry_point),
                    ledger,
                    ProductOutcome::Persisted { location, records },
                )
            }
            Err(error) => self.fail(product, Some(entry_point), ledger, error, &mut progress),
        }
    }

    /// Resolve a product page's review-panel URL in its own session.
    pub async fn discover(&self, product_url: &str) -> HarvestResult<String> {
        let profile = self.config.session_profile();
        let mut session = Session::acquire(&self.provider, &profile, SessionPhase::Discovery)
            .await
            .map_err(|e| HarvestError::EntryPointNotFound {
                url: product_url.to_string(),
                reason: e.to_string(),
            })?;

        let outcome =
            AssertUnwindSafe(discover_entry_point(session.browser(), product_url, &self.config))
                .catch_unwind()
                .await;
        session.finish(outcome).await
    }

    /// Run every tier against the review panel in its own session.
    async fn harvest_panel(
        &self,
        entry_point: &str,
        ledger: &mut TierLedger,
        progress: &mut Progress,
    ) -> HarvestResult<CollectedReviews> {
        let profile = self.config.session_profile();
        let mut session =
            Session::acquire(&self.provider, &profile, SessionPhase::Harvest).await?;

        let outcome = AssertUnwindSafe(self.run_tiers(
            session.browser(),
            entry_point,
            ledger,
            progress,
        ))
        .catch_unwind()
        .await;
        session.finish(outcome).await
    }

    async fn run_tiers(
        &self,
        browser: &mut dyn BrowserSession,
        entry_point: &str,
        ledger: &mut TierLedger,
        progress: &mut Progress,
    ) -> HarvestResult<CollectedReviews> {
        browser
            .navigate(entry_point, self.config.page_timeout())
            .await
            .map_err(|e| HarvestError::SessionUnavailable {
                reason: format!("could not open review panel: {e:#}"),
            })?;

        // The panel may legitimately start empty; each tier waits for its own
        // reviews, so this is only a diagnostic.
        let item = self.config.locators.locate(Locator::CommentItem);
        if let Err(e) = browser.wait_for(&item, self.config.element_timeout()).await {
            tracing::warn!("no reviews visible before filtering: {e:#}");
        }

        let mut collected = CollectedReviews::new();
        FilterController::new(&self.config)
            .run(browser, &mut collected, ledger, progress)
            .await;
        tracing::info!(total = collected.len(), "all tiers processed");
        Ok(collected)
    }

    fn fail(
        &self,
        product: &Product,
        entry_point: Option<String>,
        ledger: TierLedger,
        error: HarvestError,
        progress: &mut Progress,
    ) -> ProductReport {
        tracing::error!("product failed: {error}");
        progress.emit(ProgressEventKind::ProductFailed {
            error: error.to_string(),
        });
        ProductReport::new(
            product.name.as_str(),
            entry_point,
            ledger,
            ProductOutcome::Failed { error },
        )
    }
}
