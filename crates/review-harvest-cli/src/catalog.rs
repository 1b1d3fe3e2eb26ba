//! Product catalog: the built-in products, `NAME=URL` arguments and catalog
//! files.

use anyhow::{bail, Context, Result};
use review_harvest::Product;
use std::path::Path;

/// Products harvested when nothing else is configured.
pub fn default_catalog() -> Vec<Product> {
    vec![
        Product::new(
            "Motorola_G32",
            "https://www.mercadolibre.com.ar/motorola-moto-g32-128-gb-gris-6-gb-ram/p/MLA26924818",
        ),
        Product::new(
            "Samsung_A15",
            "https://www.mercadolibre.com.ar/samsung-galaxy-a15-128-gb-negro-azulado-4-gb-ram/p/MLA32427104",
        ),
    ]
}

/// Parse a `NAME=URL` argument.
pub fn parse_product_arg(arg: &str) -> Result<Product> {
    let Some((name, url)) = arg.split_once('=') else {
        bail!("expected NAME=URL, got {arg:?}");
    };
    let (name, url) = (name.trim(), url.trim());
    if name.is_empty() {
        bail!("product name is empty in {arg:?}");
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("product URL must be http(s), got {url:?}");
    }
    Ok(Product::new(name, url))
}

/// Load a JSON array of `{"name", "url"}` objects.
pub fn load_catalog(path: &Path) -> Result<Vec<Product>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    let products: Vec<Product> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid catalog {}", path.display()))?;
    Ok(products)
}

/// Keep only the named products, in catalog order. An empty `only` keeps
/// everything; an unknown name is an error.
pub fn select(products: Vec<Product>, only: &[String]) -> Result<Vec<Product>> {
    if only.is_empty() {
        return Ok(products);
    }
    if let Some(missing) = only
        .iter()
        .find(|name| !products.iter().any(|p| &p.name == *name))
    {
        let known: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
        bail!("unknown product {missing:?} (known: {})", known.join(", "));
    }
    Ok(products
        .into_iter()
        .filter(|p| only.contains(&p.name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog() {
        let names: Vec<String> = default_catalog().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Motorola_G32", "Samsung_A15"]);
    }

    #[test]
    fn test_parse_product_arg() {
        let product = parse_product_arg("Moto = https://example.com/p/MLA1").unwrap();
        assert_eq!(product, Product::new("Moto", "https://example.com/p/MLA1"));

        // The URL itself may contain '='.
        let product = parse_product_arg("X=https://example.com/p?id=3").unwrap();
        assert_eq!(product.url, "https://example.com/p?id=3");
    }

    #[test]
    fn test_parse_product_arg_rejects_malformed() {
        assert!(parse_product_arg("https://example.com").is_err());
        assert!(parse_product_arg("=https://example.com").is_err());
        assert!(parse_product_arg("Moto=example.com").is_err());
    }

    #[test]
    fn test_load_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"[{"name": "A", "url": "https://a.test"}, {"name": "B", "url": "https://b.test"}]"#,
        )
        .unwrap();

        let products = load_catalog(&path).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[1].name, "B");
    }

    #[test]
    fn test_select() {
        let picked = select(default_catalog(), &["Samsung_A15".to_string()]).unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].name, "Samsung_A15");

        assert_eq!(select(default_catalog(), &[]).unwrap().len(), 2);

        let err = select(default_catalog(), &["Nokia".to_string()]).unwrap_err();
        assert!(err.to_string().contains("Motorola_G32"));
    }
}
