//! Structured run reports.
//!
//! Every failure the harvester recovers from (unavailable tier, skipped item,
//! raw date) is recorded here instead of being swallowed, so callers and
//! tests can see exactly what a run lost.

use crate::pagination::PaginationOutcome;
use crate::types::{HarvestError, RatingTier};
use serde::{Deserialize, Serialize};

/// Why an item produced no record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The review text was absent or blank.
    MissingText,
    /// A sub-element could not be read.
    ExtractionFailed { message: String },
}

/// An item that produced no record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSkip {
    pub tier: RatingTier,
    /// Position of the item among the tier's loaded items.
    pub index: usize,
    pub reason: SkipReason,
}

/// What happened to one rating tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TierStatus {
    Collected {
        /// Items loaded after pagination.
        loaded: usize,
        /// Records extracted from them.
        records: usize,
        pagination: PaginationOutcome,
    },
    Unavailable {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierReport {
    pub tier: RatingTier,
    #[serde(flatten)]
    pub status: TierStatus,
}

/// Final state of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ProductOutcome {
    /// Records were handed to the sink.
    Persisted { location: String, records: usize },
    Failed { error: HarvestError },
}

/// Tier and item bookkeeping accumulated while a product is harvested.
#[derive(Debug, Clone, Default)]
pub struct TierLedger {
    pub tiers: Vec<TierReport>,
    pub skipped_items: Vec<ItemSkip>,
    pub raw_dates: usize,
}

impl TierLedger {
    pub fn record_unavailable(&mut self, tier: RatingTier, reason: String) {
        self.tiers.push(TierReport {
            tier,
            status: TierStatus::Unavailable { reason },
        });
    }
}

/// Everything known about one product after its run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductReport {
    pub product: String,
    pub entry_point: Option<String>,
    pub tiers: Vec<TierReport>,
    pub skipped_items: Vec<ItemSkip>,
    /// Records whose date could not be canonicalized.
    pub raw_dates: usize,
    pub outcome: ProductOutcome,
}

impl ProductReport {
    pub fn new(
        product: impl Into<String>,
        entry_point: Option<String>,
        ledger: TierLedger,
        outcome: ProductOutcome,
    ) -> Self {
        Self {
            product: product.into(),
            entry_point,
            tiers: ledger.tiers,
            skipped_items: ledger.skipped_items,
            raw_dates: ledger.raw_dates,
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ProductOutcome::Persisted { .. })
    }

    pub fn error(&self) -> Option<&HarvestError> {
        match &self.outcome {
            ProductOutcome::Failed { error } => Some(error),
            ProductOutcome::Persisted { .. } => None,
        }
    }

    /// Records handed to the sink (0 for failed products).
    pub fn records(&self) -> usize {
        match self.outcome {
            ProductOutcome::Persisted { records, .. } => records,
            ProductOutcome::Failed { .. } => 0,
        }
    }

    pub fn unavailable_tiers(&self) -> Vec<RatingTier> {
        self.tiers
            .iter()
            .filter(|t| matches!(t.status, TierStatus::Unavailable { .. }))
            .map(|t| t.tier)
            .collect()
    }
}

/// Reports for every product of a run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestReport {
    pub products: Vec<ProductReport>,
}

impl HarvestReport {
    pub fn succeeded(&self) -> usize {
        self.products.iter().filter(|p| p.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.products.len() - self.succeeded()
    }

    pub fn total_records(&self) -> usize {
        self.products.iter().map(ProductReport::records).sum()
    }
}
