use std::sync::Arc;

use anyhow::Context;
use aurum_core::config::{AppConfig, LoadOptions};
use aurum_core::{
    Catalog, EnrichedProduct, FilterQuery, SpotPriceOutcome, SpotPriceProvider, SpotPriceSource,
    StorefrontRuntime,
};
use serde::Serialize;
use tokio::runtime::Runtime;

use super::{
    escape_json, CommandResult, EXIT_CATALOG, EXIT_CONFIG, EXIT_INVALID_FILTER,
    EXIT_PRICE_UNAVAILABLE, EXIT_RUNTIME,
};

const COMMAND: &str = "catalog";

#[derive(Debug, Serialize)]
struct SpotSummary {
    price_per_gram: f64,
    source: SpotPriceSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    fetched_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct CatalogReport {
    command: &'static str,
    status: &'static str,
    spot: SpotSummary,
    products: Vec<EnrichedProduct>,
}

pub fn run(query: FilterQuery) -> CommandResult {
    let criteria = match query.parse() {
        Ok(criteria) => criteria,
        Err(error) => {
            let message = error.to_string();
            return CommandResult::failure(COMMAND, "invalid_filter", message, EXIT_INVALID_FILTER);
        }
    };

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            let message = error.to_string();
            return CommandResult::failure(COMMAND, "config_validation", message, EXIT_CONFIG);
        }
    };

    let catalog = match Catalog::resolve(&config.catalog) {
        Ok((catalog, _)) => catalog,
        Err(error) => {
            let message = error.to_string();
            return CommandResult::failure(COMMAND, "catalog_load", message, EXIT_CATALOG);
        }
    };

    let provider = match SpotPriceProvider::from_config(&config.spot_price) {
        Ok(provider) => provider,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime",
                format!("spot price http client could not be built: {error}"),
                EXIT_RUNTIME,
            );
        }
    };

    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(error) => {
            let message = format!("{error:#}");
            return CommandResult::failure(COMMAND, "runtime", message, EXIT_RUNTIME);
        }
    };

    let storefront = StorefrontRuntime::new(Arc::new(catalog), Arc::new(provider));
    let listing = match runtime.block_on(storefront.list(&criteria, "cli")) {
        Ok(listing) => listing,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "price_unavailable",
                error.to_string(),
                EXIT_PRICE_UNAVAILABLE,
            );
        }
    };

    let report = CatalogReport {
        command: COMMAND,
        status: "ok",
        spot: summarize(&listing.spot),
        products: listing.products,
    };

    let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"catalog\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            escape_json(&error.to_string())
        )
    });

    CommandResult { exit_code: 0, output }
}

fn build_runtime() -> anyhow::Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")
}

fn summarize(outcome: &SpotPriceOutcome) -> SpotSummary {
    let reason = match outcome {
        SpotPriceOutcome::Fallback { reason, .. } => Some(reason.to_string()),
        _ => None,
    };

    SpotSummary {
        price_per_gram: outcome.value(),
        source: outcome.source(),
        fetched_at: outcome.fetched_at().map(|at| at.to_rfc3339()),
        reason,
    }
}
