//! JSON file persistence.

use anyhow::{Context, Result};
use async_trait::async_trait;
use review_harvest::{ReviewRecord, ReviewSink};
use std::path::{Path, PathBuf};

/// Writes each product to `<dir>/reviews_<product>.json`.
///
/// The array is written to a hidden temporary file first and renamed into
/// place, so an existing output is replaced whole or not at all.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Output path for a product.
    pub fn path_for(&self, product: &str) -> PathBuf {
        self.dir.join(format!("reviews_{}.json", file_stem(product)))
    }
}

/// Product names become file names; path separators would escape the
/// output directory.
fn file_stem(product: &str) -> String {
    product
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect()
}

#[async_trait]
impl ReviewSink for JsonFileSink {
    async fn persist(&self, product: &str, reviews: &[ReviewRecord]) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create {}", self.dir.display()))?;

        let path = self.path_for(product);
        let tmp = self
            .dir
            .join(format!(".reviews_{}.json.tmp", file_stem(product)));

        let body = serde_json::to_vec_pretty(reviews).context("failed to serialize reviews")?;
        tokio::fs::write(&tmp, &body)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("failed to move output into {}", path.display()))?;

        tracing::debug!(path = %path.display(), bytes = body.len(), "reviews written");
        Ok(path.display().to_string())
    }
}
