//! Human-readable output: live progress lines and the end-of-run summary.

use review_harvest::{HarvestReport, ProductOutcome, ProgressEvent, ProgressEventKind, TierStatus};
use std::fmt::Write;

/// One progress line for stderr.
pub fn progress_line(event: &ProgressEvent) -> String {
    let body = match &event.event {
        ProgressEventKind::ProductStarted { url } => format!("started {url}"),
        ProgressEventKind::EntryPointResolved { url } => format!("review panel at {url}"),
        ProgressEventKind::TierStarted { tier } => format!("{tier}: filtering"),
        ProgressEventKind::TierSkipped { tier, reason } => {
            format!("{tier}: unavailable ({reason})")
        }
        ProgressEventKind::TierCompleted {
            tier,
            loaded,
            records,
        } => format!("{tier}: {records} of {loaded} reviews extracted"),
        ProgressEventKind::ProductPersisted { location, records } => {
            format!("saved {records} reviews to {location}")
        }
        ProgressEventKind::ProductFailed { error } => format!("failed: {error}"),
    };
    format!("[{}] {body}", event.product)
}

/// Per-product summary table.
pub fn render_summary(report: &HarvestReport) -> String {
    let mut out = String::new();
    for product in &report.products {
        let status = match &product.outcome {
            ProductOutcome::Persisted { location, records } => {
                format!("ok      {records:>5} reviews  {location}")
            }
            ProductOutcome::Failed { error } => format!("FAILED  {error}"),
        };
        let _ = writeln!(out, "{:<20} {status}", product.product);

        for tier in &product.tiers {
            let line = match &tier.status {
                TierStatus::Collected {
                    loaded, records, ..
                } => format!("{records} of {loaded}"),
                TierStatus::Unavailable { reason } => format!("unavailable: {reason}"),
            };
            let _ = writeln!(out, "    {:<8} {line}", tier.tier.to_string());
        }
        if !product.skipped_items.is_empty() {
            let _ = writeln!(out, "    skipped items: {}", product.skipped_items.len());
        }
        if product.raw_dates > 0 {
            let _ = writeln!(out, "    unparsed dates: {}", product.raw_dates);
        }
    }
    let _ = writeln!(
        out,
        "{} succeeded, {} failed, {} reviews",
        report.succeeded(),
        report.failed(),
        report.total_records()
    );
    out
}
