//! Review record extraction.
//!
//! Turns item elements of the review panel into [`ReviewRecord`]s. Every
//! item is read independently and every sub-field degrades on its own:
//!
//! | field          | absent            | malformed                  |
//! |----------------|-------------------|----------------------------|
//! | `text`         | item skipped      | (blank) item skipped       |
//! | `date`         | `"N/A"`           | raw text kept unchanged    |
//! | `useful_votes` | `0`               | `0` when the label has no digits |
//!
//! A failure reading any sub-element skips that one item and is recorded with
//! its position; the rest of the batch continues.

use crate::locator::{Locator, LocatorTable, Target};
use crate::provider::ElementHandle;
use crate::report::{ItemSkip, SkipReason};
use crate::types::{HarvestError, RatingTier, ReviewRecord, MISSING_DATE};
use anyhow::Result;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

// ── Field parsing ────────────────────────────────────────────────────────────

/// Outcome of reading a review's date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateField {
    /// Reparsed into `YYYY-MM-DD`.
    Canonical(String),
    /// Present but not in the expected format; kept verbatim.
    Raw(String),
    /// No date element.
    Missing,
}

impl DateField {
    pub fn is_raw(&self) -> bool {
        matches!(self, DateField::Raw(_))
    }

    /// Value stored in the record.
    pub fn into_value(self) -> String {
        match self {
            DateField::Canonical(s) | DateField::Raw(s) => s,
            DateField::Missing => MISSING_DATE.to_string(),
        }
    }
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(\d{1,2})\s+(\p{L}+)\.\s+(\d{4})\s*$").expect("date regex is valid")
    })
}

fn digits_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+").expect("digits regex is valid"))
}

/// Month number for a Spanish or English month abbreviation.
fn month_number(token: &str) -> Option<u32> {
    let month = match token.to_lowercase().as_str() {
        "ene" | "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "abr" | "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "ago" | "aug" => 8,
        "sep" | "sept" => 9,
        "oct" => 10,
        "nov" => 11,
        "dic" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Reparse `day month. year` (e.g. `15 Ene. 2024`) into `YYYY-MM-DD`.
///
/// Anything that does not match, including impossible dates, is returned as
/// [`DateField::Raw`] with the input untouched.
pub fn canonicalize_date(raw: &str) -> DateField {
    let parsed = date_pattern().captures(raw).and_then(|caps| {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let year: i32 = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    });

    match parsed {
        Some(date) => DateField::Canonical(date.format("%Y-%m-%d").to_string()),
        None => DateField::Raw(raw.to_string()),
    }
}

/// First run of digits in a "useful" label, or 0 when there is none.
pub fn parse_useful_votes(label: &str) -> u32 {
    digits_pattern()
        .find(label)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

// ── Extraction ───────────────────────────────────────────────────────────────

/// Records extracted from one tier, plus what was skipped.
#[derive(Debug, Clone, Default)]
pub struct ExtractionBatch {
    pub records: Vec<ReviewRecord>,
    pub skipped: Vec<ItemSkip>,
    /// Records whose date was kept raw.
    pub raw_dates: usize,
}

/// Reads review items using the locator table.
#[derive(Debug, Clone)]
pub struct RecordExtractor {
    content: Target,
    date: Target,
    useful: Target,
}

impl RecordExtractor {
    pub fn new(locators: &LocatorTable) -> Self {
        Self {
            content: locators.locate(Locator::CommentContent),
            date: locators.locate(Locator::CommentDate),
            useful: locators.locate(Locator::LikeButton),
        }
    }

    /// Extract every item for the given tier. Never fails: per-item problems
    /// end up in [`ExtractionBatch::skipped`].
    pub async fn extract_all(
        &self,
        items: &[Box<dyn ElementHandle>],
        tier: RatingTier,
    ) -> ExtractionBatch {
        let mut batch = ExtractionBatch::default();
        tracing::debug!(%tier, items = items.len(), "extracting reviews");

        for (index, item) in items.iter().enumerate() {
            match self.read_item(item.as_ref(), tier).await {
                Ok(Some((record, date))) => {
                    if date.is_raw() {
                        batch.raw_dates += 1;
                    }
                    batch.records.push(record);
                }
                Ok(None) => {
                    tracing::debug!(%tier, index, "item has no review text, skipped");
                    batch.skipped.push(ItemSkip {
                        tier,
                        index,
                        reason: SkipReason::MissingText,
                    });
                }
                Err(e) => {
                    let error = HarvestError::ElementExtractionError {
                        index,
                        reason: format!("{e:#}"),
                    };
                    tracing::warn!(%tier, index, "{error}");
                    batch.skipped.push(ItemSkip {
                        tier,
                        index,
                        reason: SkipReason::ExtractionFailed {
                            message: error.to_string(),
                        },
                    });
                }
            }
        }

        batch
    }

    /// Read one item. `Ok(None)` means the item has no usable text.
    pub async fn read_item(
        &self,
        item: &dyn ElementHandle,
        tier: RatingTier,
    ) -> Result<Option<(ReviewRecord, DateField)>> {
        let Some(content) = item.query(&self.content).await? else {
            return Ok(None);
        };
        let text = content.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }

        let date = match item.query(&self.date).await? {
            Some(el) => canonicalize_date(&el.text().await?),
            None => DateField::Missing,
        };

        let useful_votes = match item.query(&self.useful).await? {
            Some(el) => parse_useful_votes(&el.text().await?),
            None => 0,
        };

        Ok(ReviewRecord::new(&text, tier, date.clone().into_value(), useful_votes)
            .map(|record| (record, date)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use async_trait::async_trait;

    #[derive(Clone, Default)]
    struct FakeItem {
        content: Option<String>,
        date: Option<String>,
        useful: Option<String>,
        broken_date: bool,
    }

    struct FakeText(String);

    #[async_trait]
    impl ElementHandle for FakeText {
        async fn text(&self) -> Result<String> {
            Ok(self.0.clone())
        }
        async fn query(&self, _target: &Target) -> Result<Option<Box<dyn ElementHandle>>> {
            Ok(None)
        }
        async fn click(&self) -> Result<()> {
            Ok(())
        }
    }

    struct Detached;

    #[async_trait]
    impl ElementHandle for Detached {
        async fn text(&self) -> Result<String> {
            bail!("node is detached from document")
        }
        async fn query(&self, _target: &Target) -> Result<Option<Box<dyn ElementHandle>>> {
            bail!("node is detached from document")
        }
        async fn click(&self) -> Result<()> {
            bail!("node is detached from document")
        }
    }

    #[async_trait]
    impl ElementHandle for FakeItem {
        async fn text(&self) -> Result<String> {
            Ok(String::new())
        }
        async fn query(&self, target: &Target) -> Result<Option<Box<dyn ElementHandle>>> {
            let table = LocatorTable::default();
            let field = if *target == table.comment_content {
                &self.content
            } else if *target == table.comment_date {
                if self.broken_date {
                    return Ok(Some(Box::new(Detached)));
                }
                &self.date
            } else if *target == table.like_button {
                &self.useful
            } else {
                return Ok(None);
            };
            Ok(field
                .clone()
                .map(|t| Box::new(FakeText(t)) as Box<dyn ElementHandle>))
        }
        async fn click(&self) -> Result<()> {
            Ok(())
        }
    }

    fn item(content: &str, date: Option<&str>, useful: Option<&str>) -> Box<dyn ElementHandle> {
        Box::new(FakeItem {
            content: Some(content.to_string()),
            date: date.map(str::to_string),
            useful: useful.map(str::to_string),
            broken_date: false,
        })
    }

    #[test]
    fn test_canonicalize_spanish_date() {
        assert_eq!(
            canonicalize_date("15 Ene. 2024"),
            DateField::Canonical("2024-01-15".into())
        );
        assert_eq!(
            canonicalize_date("3 dic. 2023"),
            DateField::Canonical("2023-12-03".into())
        );
        assert_eq!(
            canonicalize_date("7 Sept. 2022"),
            DateField::Canonical("2022-09-07".into())
        );
    }

    #[test]
    fn test_canonicalize_keeps_raw_on_mismatch() {
        for raw in ["15 Ene 2024", "hace 3 días", "31 Feb. 2024", "15 Xyz. 2024", ""] {
            assert_eq!(canonicalize_date(raw), DateField::Raw(raw.to_string()));
        }
    }

    #[test]
    fn test_useful_votes() {
        assert_eq!(parse_useful_votes("12 personas"), 12);
        assert_eq!(parse_useful_votes("Útil"), 0);
        assert_eq!(parse_useful_votes("Es útil 3 7"), 3);
        assert_eq!(parse_useful_votes("99999999999999999999"), 0);
    }

    #[tokio::test]
    async fn test_full_item() {
        let extractor = RecordExtractor::new(&LocatorTable::default());
        let items = vec![item("Great phone", Some("15 Ene. 2024"), Some("12 personas"))];
        let batch = extractor.extract_all(&items, RatingTier::Five).await;
        assert_eq!(batch.records.len(), 1);
        let record = &batch.records[0];
        assert_eq!(record.text(), "Great phone");
        assert_eq!(record.rating(), 5);
        assert_eq!(record.date(), "2024-01-15");
        assert_eq!(record.useful_votes(), 12);
        assert_eq!(batch.raw_dates, 0);
    }

    #[tokio::test]
    async fn test_optional_fields_degrade() {
        let extractor = RecordExtractor::new(&LocatorTable::default());
        let items = vec![
            item("Sin fecha", None, None),
            item("Fecha rara", Some("15 Ene 2024"), Some("Útil")),
        ];
        let batch = extractor.extract_all(&items, RatingTier::Three).await;
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0].date(), MISSING_DATE);
        assert_eq!(batch.records[0].useful_votes(), 0);
        assert_eq!(batch.records[1].date(), "15 Ene 2024");
        assert_eq!(batch.records[1].useful_votes(), 0);
        assert_eq!(batch.raw_dates, 1);
        assert!(batch.records.iter().all(|r| r.rating() == 3));
    }

    #[tokio::test]
    async fn test_missing_text_skips_item() {
        let extractor = RecordExtractor::new(&LocatorTable::default());
        let items: Vec<Box<dyn ElementHandle>> = vec![
            Box::new(FakeItem::default()),
            item("   ", Some("15 Ene. 2024"), None),
            item("ok", None, None),
        ];
        let batch = extractor.extract_all(&items, RatingTier::Two).await;
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.skipped.len(), 2);
        assert_eq!(batch.skipped[0].index, 0);
        assert_eq!(batch.skipped[1].index, 1);
        assert!(batch
            .skipped
            .iter()
            .all(|s| s.reason == SkipReason::MissingText));
    }

    #[tokio::test]
    async fn test_read_failure_skips_only_that_item() {
        let extractor = RecordExtractor::new(&LocatorTable::default());
        let broken = FakeItem {
            content: Some("texto".into()),
            broken_date: true,
            ..Default::default()
        };
        let items: Vec<Box<dyn ElementHandle>> = vec![
            item("first", None, None),
            Box::new(broken),
            Box::new(Detached),
            item("last", None, Some("2")),
        ];
        let batch = extractor.extract_all(&items, RatingTier::One).await;
        let texts: Vec<&str> = batch.records.iter().map(|r| r.text()).collect();
        assert_eq!(texts, vec!["first", "last"]);
        let indices: Vec<usize> = batch.skipped.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert!(matches!(
            batch.skipped[0].reason,
            SkipReason::ExtractionFailed { .. }
        ));
    }
}
