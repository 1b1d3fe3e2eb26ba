//! Review Harvest: pagination and extraction engine for storefront review
//! panels partitioned by star rating.
//!
//! The engine drives a browser through a product's review panel: it resolves
//! the panel URL, applies each rating filter, scrolls until no more reviews
//! load, and extracts every review into a [`ReviewRecord`]. Browsers and
//! storage are collaborators behind the [`BrowserProvider`] and
//! [`ReviewSink`] traits.

pub mod aggregate;
pub mod config;
pub mod discovery;
pub mod extractor;
pub mod filter;
pub mod harvester;
pub mod locator;
pub mod pagination;
pub mod progress;
pub mod provider;
pub mod report;
pub mod session;
pub mod types;

pub use aggregate::{hand_off, CollectedReviews, MemorySink, ReviewSink};
pub use config::HarvestConfig;
pub use discovery::discover_entry_point;
pub use extractor::{canonicalize_date, parse_useful_votes, DateField, RecordExtractor};
pub use filter::FilterController;
pub use harvester::Harvester;
pub use locator::{Locator, LocatorTable, Target};
pub use pagination::{ContentSurface, PageSurface, PaginationOutcome, Paginator};
pub use progress::{ProgressEvent, ProgressEventKind, ProgressReceiver};
pub use provider::{BrowserProvider, BrowserSession, ElementHandle, SessionProfile};
pub use report::{HarvestReport, ItemSkip, ProductOutcome, ProductReport, SkipReason, TierStatus};
pub use session::{Session, SessionPhase};
pub use types::*;
