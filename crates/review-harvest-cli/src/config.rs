//! Configuration loading and resolution.
//!
//! Settings come from, in increasing precedence: built-in defaults, the
//! config file, `REVIEW_HARVEST_*` environment variables, then command-line
//! flags.

use anyhow::{bail, Context, Result};
use review_harvest::{HarvestConfig, Product};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "REVIEW_HARVEST_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "review-harvest.json";

const HEADLESS_ENV: &str = "REVIEW_HARVEST_HEADLESS";
const PAGE_TIMEOUT_ENV: &str = "REVIEW_HARVEST_PAGE_TIMEOUT_MS";
const ELEMENT_TIMEOUT_ENV: &str = "REVIEW_HARVEST_ELEMENT_TIMEOUT_MS";
const MAX_STALL_ENV: &str = "REVIEW_HARVEST_MAX_STALL_ATTEMPTS";
const OUTPUT_DIR_ENV: &str = "REVIEW_HARVEST_OUTPUT_DIR";

/// Everything the CLI needs for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Directory receiving `reviews_<product>.json` files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Products to harvest. Empty means the built-in catalog.
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(flatten)]
    pub harvest: HarvestConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/raw")
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            products: Vec::new(),
            harvest: HarvestConfig::default(),
        }
    }
}

/// Command-line overrides, applied last.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub headless: bool,
    pub output_dir: Option<PathBuf>,
    pub max_stall_attempts: Option<u32>,
    pub page_timeout_ms: Option<u64>,
    pub element_timeout_ms: Option<u64>,
}

/// Resolve the config file path.
///
/// An explicit path wins, then `REVIEW_HARVEST_CONFIG`, then
/// `./review-harvest.json` when it exists. `None` means defaults only.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }

    let cwd_config = PathBuf::from(DEFAULT_CONFIG_FILE);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    None
}

impl CliConfig {
    /// Load the effective configuration: file, then process environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(explicit) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&raw)
            .with_context(|| format!("invalid config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Apply `REVIEW_HARVEST_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(HEADLESS_ENV) {
            self.harvest.headless = parse_flag(HEADLESS_ENV, &value)?;
        }
        if let Some(value) = lookup(PAGE_TIMEOUT_ENV) {
            self.harvest.page_timeout_ms = parse_number(PAGE_TIMEOUT_ENV, &value)?;
        }
        if let Some(value) = lookup(ELEMENT_TIMEOUT_ENV) {
            self.harvest.element_timeout_ms = parse_number(ELEMENT_TIMEOUT_ENV, &value)?;
        }
        if let Some(value) = lookup(MAX_STALL_ENV) {
            self.harvest.max_stall_attempts = parse_number(MAX_STALL_ENV, &value)?;
        }
        if let Some(value) = lookup(OUTPUT_DIR_ENV) {
            self.output_dir = PathBuf::from(value);
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if overrides.headless {
            self.harvest.headless = true;
        }
        if let Some(dir) = &overrides.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(attempts) = overrides.max_stall_attempts {
            self.harvest.max_stall_attempts = attempts;
        }
        if let Some(ms) = overrides.page_timeout_ms {
            self.harvest.page_timeout_ms = ms;
        }
        if let Some(ms) = overrides.element_timeout_ms {
            self.harvest.element_timeout_ms = ms;
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("{key}: expected a boolean, got {other:?}"),
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("{key}: invalid value {value:?}: {e}"))
}
