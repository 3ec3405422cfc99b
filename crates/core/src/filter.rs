use serde::{Deserialize, Serialize};

use crate::domain::product::EnrichedProduct;
use crate::errors::FilterError;

/// Inclusive range bounds over enriched products; `None` leaves that side open.
///
/// Bounds are already-parsed numbers. Turning raw query strings into criteria is
/// [`FilterQuery::parse`]'s job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub popularity_min: Option<f64>,
    pub popularity_max: Option<f64>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.price_min.is_none()
            && self.price_max.is_none()
            && self.popularity_min.is_none()
            && self.popularity_max.is_none()
    }

    pub fn matches(&self, product: &EnrichedProduct) -> bool {
        within(product.price, self.price_min, self.price_max)
            && within(product.popularity_five_scale, self.popularity_min, self.popularity_max)
    }
}

fn within(value: f64, min: Option<f64>, max: Option<f64>) -> bool {
    min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max)
}

/// Keeps the products that satisfy every present bound, in their original order.
pub fn filter(products: Vec<EnrichedProduct>, criteria: &FilterCriteria) -> Vec<EnrichedProduct> {
    if criteria.is_empty() {
        return products;
    }
    products.into_iter().filter(|product| criteria.matches(product)).collect()
}

/// Raw `GET /api/products` query parameters.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterQuery {
    pub price_min: Option<String>,
    pub price_max: Option<String>,
    pub popularity_min: Option<String>,
    pub popularity_max: Option<String>,
}

impl FilterQuery {
    /// Blank values count as absent. Anything else must be a finite number.
    pub fn parse(&self) -> Result<FilterCriteria, FilterError> {
        Ok(FilterCriteria {
            price_min: parse_bound("priceMin", self.price_min.as_deref())?,
            price_max: parse_bound("priceMax", self.price_max.as_deref())?,
            popularity_min: parse_bound("popularityMin", self.popularity_min.as_deref())?,
            popularity_max: parse_bound("popularityMax", self.popularity_max.as_deref())?,
        })
    }
}

fn parse_bound(parameter: &'static str, raw: Option<&str>) -> Result<Option<f64>, FilterError> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(FilterError::InvalidFilterInput { parameter, value: raw.to_string() }),
    }
}
