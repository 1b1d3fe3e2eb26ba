//! Review aggregation and the persistence handoff.

use crate::types::{HarvestError, HarvestResult, ReviewRecord};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Ordered, append-only collection of one product's reviews.
///
/// Records keep extraction order within a tier and tiers are concatenated in
/// processing order. Nothing is deduplicated.
#[derive(Debug, Clone, Default)]
pub struct CollectedReviews {
    records: Vec<ReviewRecord>,
}

impl CollectedReviews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tier's records.
    pub fn append(&mut self, records: Vec<ReviewRecord>) {
        self.records.extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn as_slice(&self) -> &[ReviewRecord] {
        &self.records
    }

    pub fn into_vec(self) -> Vec<ReviewRecord> {
        self.records
    }
}

/// Persistence collaborator receiving a product's complete collection.
#[async_trait]
pub trait ReviewSink: Send + Sync {
    /// Store all of a product's reviews as one unit and return where they
    /// went (a path, a key, ...).
    async fn persist(&self, product: &str, reviews: &[ReviewRecord]) -> Result<String>;
}

/// Hand the collection to the sink.
///
/// An empty collection is never handed off: it fails with
/// [`HarvestError::EmptyResultSet`]. Returns the sink's location and the
/// number of records written.
pub async fn hand_off(
    product: &str,
    collected: CollectedReviews,
    sink: &dyn ReviewSink,
) -> HarvestResult<(String, usize)> {
    if collected.is_empty() {
        return Err(HarvestError::EmptyResultSet {
            product: product.to_string(),
        });
    }

    let count = collected.len();
    let location = sink
        .persist(product, collected.as_slice())
        .await
        .map_err(|e| HarvestError::Persistence {
            product: product.to_string(),
            reason: format!("{e:#}"),
        })?;

    tracing::info!(product, records = count, location = %location, "reviews persisted");
    Ok((location, count))
}

/// Sink that keeps everything in memory, keyed by product.
#[derive(Debug, Default)]
pub struct MemorySink {
    stored: Mutex<Vec<(String, Vec<ReviewRecord>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every handoff so far, in order.
    pub async fn stored(&self) -> Vec<(String, Vec<ReviewRecord>)> {
        self.stored.lock().await.clone()
    }

    /// Records handed off for `product`, if any.
    pub async fn get(&self, product: &str) -> Option<Vec<ReviewRecord>> {
        self.stored
            .lock()
            .await
            .iter()
            .find(|(name, _)| name == product)
            .map(|(_, records)| records.clone())
    }
}

#[async_trait]
impl ReviewSink for MemorySink {
    async fn persist(&self, product: &str, reviews: &[ReviewRecord]) -> Result<String> {
        self.stored
            .lock()
            .await
            .push((product.to_string(), reviews.to_vec()));
        Ok(format!("memory://{product}"))
    }
}
