use std::sync::Arc;

use tracing::info;

use crate::catalog::Catalog;
use crate::domain::product::EnrichedProduct;
use crate::errors::SpotPriceError;
use crate::filter::{filter, FilterCriteria};
use crate::spot::{SpotPriceOutcome, SpotPriceProvider};

#[derive(Clone, Debug, PartialEq)]
pub struct CatalogListing {
    pub products: Vec<EnrichedProduct>,
    pub spot: SpotPriceOutcome,
}

/// Runs the pricing pipeline: one spot price lookup, enrichment, then filtering.
#[derive(Clone)]
pub struct StorefrontRuntime {
    catalog: Arc<Catalog>,
    provider: Arc<SpotPriceProvider>,
}

impl StorefrontRuntime {
    pub fn new(catalog: Arc<Catalog>, provider: Arc<SpotPriceProvider>) -> Self {
        Self { catalog, provider }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn provider(&self) -> &SpotPriceProvider {
        &self.provider
    }

    pub async fn list(
        &self,
        criteria: &FilterCriteria,
        correlation_id: &str,
    ) -> Result<CatalogListing, SpotPriceError> {
        let spot = self.provider.spot_price().await?;
        let enriched = self.catalog.enrich(spot.value());
        let total = enriched.len();
        let products = filter(enriched, criteria);

        info!(
            event_name = "catalog.listing.built",
            correlation_id,
            spot_source = ?spot.source(),
            price_per_gram = spot.value(),
            total,
            returned = products.len(),
            "catalog listing priced"
        );

        Ok(CatalogListing { products, spot })
    }
}
