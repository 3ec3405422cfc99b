use std::sync::Arc;

use aurum_core::config::{AppConfig, ConfigError};
use aurum_core::{Catalog, CatalogError, CatalogSource, SpotPriceProvider, StorefrontRuntime};
use axum::Router;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::{catalog, health};

pub struct Application {
    pub config: AppConfig,
    pub catalog_source: CatalogSource,
    pub runtime: StorefrontRuntime,
    catalog: Arc<Catalog>,
    provider: Arc<SpotPriceProvider>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("spot price http client could not be built: {0}")]
    HttpClient(String),
}

impl Application {
    /// Storefront API, health probe and permissive CORS for the browser client.
    pub fn router(&self) -> Router {
        catalog::router(self.runtime.clone())
            .merge(health::router(
                self.catalog.clone(),
                self.provider.clone(),
                self.config.spot_price.has_api_key(),
            ))
            .layer(CorsLayer::permissive())
    }
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let (catalog, catalog_source) = Catalog::resolve(&config.catalog)?;
    info!(
        event_name = "system.bootstrap.catalog_loaded",
        correlation_id = "bootstrap",
        products = catalog.len(),
        source = ?catalog_source,
        "product catalog loaded"
    );

    if !config.spot_price.has_api_key() {
        warn!(
            event_name = "system.bootstrap.spot_price_key_missing",
            correlation_id = "bootstrap",
            fallback_price_per_gram = ?config.spot_price.fallback(),
            "no spot price api key configured; live pricing disabled"
        );
    }

    let provider = SpotPriceProvider::from_config(&config.spot_price)
        .map_err(|error| BootstrapError::HttpClient(error.to_string()))?;
    info!(
        event_name = "system.bootstrap.spot_price_ready",
        correlation_id = "bootstrap",
        base_url = %config.spot_price.base_url,
        commodity = %config.spot_price.commodity,
        cache_ttl_secs = config.spot_price.cache_ttl_secs,
        "spot price provider initialized"
    );

    let catalog = Arc::new(catalog);
    let provider = Arc::new(provider);

    Ok(Application {
        runtime: StorefrontRuntime::new(catalog.clone(), provider.clone()),
        config,
        catalog_source,
        catalog,
        provider,
    })
}
