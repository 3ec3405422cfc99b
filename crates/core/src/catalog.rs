use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::config::CatalogConfig;
use crate::domain::product::{EnrichedProduct, Product, ProductId};
use crate::pricing::{compute_price, to_five_scale};

const EMBEDDED_PRODUCTS: &str = include_str!("../data/products.json");
const DEFAULT_PRODUCTS_FILE: &str = "products.json";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read product file `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse products from {origin}: {source}")]
    Parse { origin: String, source: serde_json::Error },
    #[error("configured product file was not found: `{0}`")]
    MissingFile(PathBuf),
    #[error("product `{product}` is invalid: {reason}")]
    Invalid { product: String, reason: String },
}

/// Where the running catalog was loaded from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "path")]
pub enum CatalogSource {
    File(PathBuf),
    Embedded,
}

#[derive(Debug, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for product in &products {
            validate_product(product)?;
            if !seen.insert(&product.id) {
                return Err(CatalogError::Invalid {
                    product: product.id.0.clone(),
                    reason: "duplicate product id".to_string(),
                });
            }
        }
        Ok(Self { products })
    }

    pub fn from_json_str(raw: &str, origin: &str) -> Result<Self, CatalogError> {
        let products: Vec<Product> = serde_json::from_str(raw)
            .map_err(|source| CatalogError::Parse { origin: origin.to_string(), source })?;
        Self::new(products)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| CatalogError::Read { path: path.to_path_buf(), source })?;
        Self::from_json_str(&raw, &format!("`{}`", path.display()))
    }

    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json_str(EMBEDDED_PRODUCTS, "embedded catalog")
    }

    /// Loads the configured file, else `products.json` in the working directory, else the
    /// catalog compiled into the binary.
    pub fn resolve(config: &CatalogConfig) -> Result<(Self, CatalogSource), CatalogError> {
        if let Some(path) = &config.products_path {
            if !path.exists() {
                return Err(CatalogError::MissingFile(path.clone()));
            }
            return Ok((Self::load(path)?, CatalogSource::File(path.clone())));
        }

        let local = PathBuf::from(DEFAULT_PRODUCTS_FILE);
        if local.exists() {
            return Ok((Self::load(&local)?, CatalogSource::File(local)));
        }

        Ok((Self::embedded()?, CatalogSource::Embedded))
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn find(&self, product_id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|product| &product.id == product_id)
    }

    pub fn enrich(&self, spot_price_per_gram: f64) -> Vec<EnrichedProduct> {
        enrich(&self.products, spot_price_per_gram)
    }
}

/// Prices every product against one shared spot price, keeping input order.
pub fn enrich(products: &[Product], spot_price_per_gram: f64) -> Vec<EnrichedProduct> {
    products
        .iter()
        .map(|product| EnrichedProduct {
            price: compute_price(product, spot_price_per_gram),
            popularity_five_scale: to_five_scale(product.popularity_score),
            image_urls: product.image_urls(),
            product: product.clone(),
        })
        .collect()
}

fn validate_product(product: &Product) -> Result<(), CatalogError> {
    let invalid = |reason: String| CatalogError::Invalid { product: product.id.0.clone(), reason };

    if product.id.0.trim().is_empty() {
        return Err(CatalogError::Invalid {
            product: product.name.clone(),
            reason: "id must not be empty".to_string(),
        });
    }
    if !product.popularity_score.is_finite() || !(0.0..=1.0).contains(&product.popularity_score) {
        return Err(invalid(format!(
            "popularityScore must be within [0, 1] (got {})",
            product.popularity_score
        )));
    }
    if !product.weight.is_finite() || product.weight <= 0.0 {
        return Err(invalid(format!(
            "weight must be a positive number of grams (got {})",
            product.weight
        )));
    }
    if product.images.is_empty() {
        return Err(invalid("at least one image variant is required".to_string()));
    }

    Ok(())
}
