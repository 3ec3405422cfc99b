use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

/// Static catalog entry as shipped in `products.json`.
///
/// `images` maps a color variant to its image URL and keeps the order the variants were
/// written in, which is the swatch order shown to shoppers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub popularity_score: f64,
    /// Grams.
    pub weight: f64,
    pub images: IndexMap<String, String>,
}

impl Product {
    pub fn image_urls(&self) -> Vec<String> {
        self.images.values().cloned().collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedProduct {
    #[serde(flatten)]
    pub product: Product,
    pub price: f64,
    pub popularity_five_scale: f64,
    #[serde(rename = "imageURLs")]
    pub image_urls: Vec<String>,
}
