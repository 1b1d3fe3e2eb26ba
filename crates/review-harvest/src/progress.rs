//! Progress events and broadcast channel for operator-visible harvesting
//! telemetry.
//!
//! The harvester emits `ProgressEvent`s as it moves through products and
//! tiers. They flow through a `tokio::sync::broadcast` channel to every
//! subscriber (CLI progress output, tests). When nobody subscribes, events
//! are dropped.

use crate::types::RatingTier;
use serde::{Deserialize, Serialize};

/// A progress event emitted while harvesting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Product the event belongs to.
    pub product: String,
    /// Monotonically increasing per product.
    pub seq: u64,
    pub event: ProgressEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEventKind {
    ProductStarted { url: String },
    EntryPointResolved { url: String },
    TierStarted { tier: RatingTier },
    /// The tier's filter could not be applied or showed no items.
    TierSkipped { tier: RatingTier, reason: String },
    TierCompleted {
        tier: RatingTier,
        loaded: usize,
        records: usize,
    },
    ProductPersisted { location: String, records: usize },
    ProductFailed { error: String },
}

pub type ProgressSender = tokio::sync::broadcast::Sender<ProgressEvent>;

pub type ProgressReceiver = tokio::sync::broadcast::Receiver<ProgressEvent>;

/// Create a progress channel. 256 events covers a full product (a handful of
/// events per tier) with plenty of slack for slow subscribers.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(256)
}

/// Per-product emitter that numbers events.
#[derive(Debug)]
pub struct Progress {
    tx: Option<ProgressSender>,
    product: String,
    seq: u64,
}

impl Progress {
    pub fn new(tx: Option<ProgressSender>, product: impl Into<String>) -> Self {
        Self {
            tx,
            product: product.into(),
            seq: 0,
        }
    }

    /// Emit an event, ignoring the error raised when no receiver listens.
    pub fn emit(&mut self, event: ProgressEventKind) {
        if let Some(ref sender) = self.tx {
            self.seq += 1;
            let _ = sender.send(ProgressEvent {
                product: self.product.clone(),
                seq: self.seq,
                event,
            });
        }
    }
}
