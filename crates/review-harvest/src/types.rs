//! Core data types for harvested reviews, rating tiers, and errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Date value stored when a review carries no date element.
pub const MISSING_DATE: &str = "N/A";

/// A single harvested review.
///
/// Records are immutable once built. The `rating` always comes from the
/// rating filter that was active when the record was extracted, never from
/// the review markup itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecordFields")]
pub struct ReviewRecord {
    text: String,
    rating: u8,
    date: String,
    useful_votes: u32,
}

impl ReviewRecord {
    /// Build a record for the given tier.
    ///
    /// Returns `None` when `text` is empty after trimming: a review without
    /// text is never emitted, not even partially.
    pub fn new(
        text: &str,
        tier: RatingTier,
        date: impl Into<String>,
        useful_votes: u32,
    ) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            rating: tier.stars(),
            date: date.into(),
            useful_votes,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }

    /// Canonical `YYYY-MM-DD`, the raw source text, or [`MISSING_DATE`].
    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn useful_votes(&self) -> u32 {
        self.useful_votes
    }
}

/// Wire shape of a [`ReviewRecord`]; deserialized records go through
/// [`ReviewRecord::new`] so they obey the same rules as harvested ones.
#[derive(Deserialize)]
struct RecordFields {
    text: String,
    rating: RatingTier,
    date: String,
    useful_votes: u32,
}

impl TryFrom<RecordFields> for ReviewRecord {
    type Error = String;

    fn try_from(fields: RecordFields) -> Result<Self, Self::Error> {
        ReviewRecord::new(&fields.text, fields.rating, fields.date, fields.useful_votes)
            .ok_or_else(|| "review text must not be empty".to_string())
    }
}

/// One of the five star-rating partitions of the review panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RatingTier {
    Five,
    Four,
    Three,
    Two,
    One,
}

impl RatingTier {
    /// All tiers in processing order, highest rating first.
    pub const ALL: [RatingTier; 5] = [
        RatingTier::Five,
        RatingTier::Four,
        RatingTier::Three,
        RatingTier::Two,
        RatingTier::One,
    ];

    /// Star value of the tier (1..=5).
    pub fn stars(self) -> u8 {
        match self {
            Self::Five => 5,
            Self::Four => 4,
            Self::Three => 3,
            Self::Two => 2,
            Self::One => 1,
        }
    }

    /// Identifier of the panel's filter control for this tier.
    ///
    /// The panel numbers its filters top-down, so five stars is filter 1 and
    /// one star is filter 5.
    pub fn filter_id(self) -> u8 {
        6 - self.stars()
    }

    pub fn from_stars(stars: u8) -> Option<Self> {
        match stars {
            5 => Some(Self::Five),
            4 => Some(Self::Four),
            3 => Some(Self::Three),
            2 => Some(Self::Two),
            1 => Some(Self::One),
            _ => None,
        }
    }
}

impl TryFrom<u8> for RatingTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_stars(value).ok_or_else(|| format!("rating must be 1..=5, got {value}"))
    }
}

impl From<RatingTier> for u8 {
    fn from(tier: RatingTier) -> Self {
        tier.stars()
    }
}

impl fmt::Display for RatingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stars() {
            1 => write!(f, "1 star"),
            n => write!(f, "{n} stars"),
        }
    }
}

/// A product to harvest: operator-facing display name plus product page URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub url: String,
}

impl Product {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Errors raised while harvesting.
///
/// Only product-level variants (see [`HarvestError::is_product_fatal`]) stop
/// a product. Tier and item variants are recovered locally and recorded in
/// the product report.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HarvestError {
    #[error("Entry point not found for {url}: {reason}")]
    EntryPointNotFound { url: String, reason: String },

    #[error("Tier {tier} unavailable: {reason}")]
    TierUnavailable { tier: RatingTier, reason: String },

    #[error("Failed to extract item {index}: {reason}")]
    ElementExtractionError { index: usize, reason: String },

    #[error("No reviews collected for {product}")]
    EmptyResultSet { product: String },

    #[error("Browser session unavailable: {reason}")]
    SessionUnavailable { reason: String },

    #[error("Persistence failed for {product}: {reason}")]
    Persistence { product: String, reason: String },
}

impl HarvestError {
    /// Whether this error ends the product it was raised for.
    pub fn is_product_fatal(&self) -> bool {
        !matches!(
            self,
            HarvestError::TierUnavailable { .. } | HarvestError::ElementExtractionError { .. }
        )
    }
}

/// Convenience result type.
pub type HarvestResult<T> = Result<T, HarvestError>;
