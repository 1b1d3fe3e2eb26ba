//! Edge case integration tests for review-harvest-cli.
//!
//! Covers configuration files, catalogs and the JSON output written through
//! the engine's persistence handoff.

use std::path::Path;

use review_harvest::{hand_off, CollectedReviews, HarvestError, RatingTier, ReviewRecord};
use review_harvest_cli::catalog::{load_catalog, select};
use review_harvest_cli::{CliConfig, JsonFileSink};

// ─────────────────────── helpers ───────────────────────

fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

fn collected(texts: &[(&str, RatingTier)]) -> CollectedReviews {
    let mut collected = CollectedReviews::new();
    collected.append(
        texts
            .iter()
            .map(|(text, tier)| ReviewRecord::new(text, *tier, "N/A", 0).unwrap())
            .collect(),
    );
    collected
}

// ═══════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════

#[test]
fn test_01_config_with_locator_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "review-harvest.json",
        r#"{
            "headless": true,
            "locators": {
                "load_more_button": {"by": "text", "selector": "button", "label": "Show more"}
            }
        }"#,
    );

    let config = CliConfig::load(Some(path.as_path())).unwrap();
    assert!(config.harvest.headless);
    assert_eq!(
        config.harvest.locators.load_more_button,
        review_harvest::Target::text("button", "Show more")
    );
    // Untouched locators keep their defaults.
    assert_eq!(
        config.harvest.locators.comment_item,
        review_harvest::LocatorTable::default().comment_item
    );
}

#[test]
fn test_02_missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = CliConfig::load(Some(dir.path().join("absent.json").as_path())).unwrap_err();
    assert!(err.to_string().contains("failed to read config"));
}

#[test]
fn test_03_config_round_trips_through_json() {
    let config = CliConfig::default();
    let json = serde_json::to_string_pretty(&config).unwrap();
    let back: CliConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

// ═══════════════════════════════════════════════════════
// CATALOG
// ═══════════════════════════════════════════════════════

#[test]
fn test_04_catalog_with_unicode_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "catalog.json",
        r#"[{"name": "Teléfono_Ñandú", "url": "https://shop.test/p/1"}]"#,
    );

    let products = load_catalog(&path).unwrap();
    let picked = select(products, &["Teléfono_Ñandú".to_string()]).unwrap();
    assert_eq!(picked[0].url, "https://shop.test/p/1");
}

#[test]
fn test_05_catalog_must_be_an_array() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "catalog.json", r#"{"name": "A"}"#);
    assert!(load_catalog(&path).is_err());
}

// ═══════════════════════════════════════════════════════
// OUTPUT
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_06_handoff_writes_ordered_file() {
    let dir = tempfile::tempdir().unwrap();
    let sink = JsonFileSink::new(dir.path().join("data/raw"));

    let (location, count) = hand_off(
        "Motorola_G32",
        collected(&[
            ("Excelente", RatingTier::Five),
            ("Regular", RatingTier::Three),
            ("Excelente", RatingTier::Three),
        ]),
        &sink,
    )
    .await
    .unwrap();

    assert_eq!(count, 3);
    let raw = std::fs::read_to_string(&location).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let rows: Vec<(String, u64)> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|r| {
            (
                r["text"].as_str().unwrap().to_string(),
                r["rating"].as_u64().unwrap(),
            )
        })
        .collect();
    // Duplicates are kept and order is preserved.
    assert_eq!(
        rows,
        vec![
            ("Excelente".to_string(), 5),
            ("Regular".to_string(), 3),
            ("Excelente".to_string(), 3)
        ]
    );
}

#[tokio::test]
async fn test_07_empty_collection_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let sink = JsonFileSink::new(dir.path());

    let err = hand_off("Samsung_A15", CollectedReviews::new(), &sink)
        .await
        .unwrap_err();

    assert!(matches!(err, HarvestError::EmptyResultSet { .. }));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_08_unwritable_output_is_a_persistence_error() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the output directory should be.
    let blocker = write(dir.path(), "data", "not a directory");
    let sink = JsonFileSink::new(&blocker);

    let err = hand_off("Motorola_G32", collected(&[("x", RatingTier::One)]), &sink)
        .await
        .unwrap_err();

    assert!(matches!(err, HarvestError::Persistence { .. }));
}
