//! Review Harvest CLI: Chromium provider, product catalog, configuration
//! and JSON output for the review-harvest engine.

pub mod catalog;
pub mod chromium;
pub mod config;
pub mod sink;
pub mod summary;

pub use catalog::{default_catalog, load_catalog, parse_product_arg};
pub use chromium::ChromiumProvider;
pub use config::{resolve_config_path, CliConfig, Overrides};
pub use sink::JsonFileSink;
