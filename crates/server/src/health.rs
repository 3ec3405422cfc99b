use std::sync::Arc;

use aurum_core::{Catalog, SpotPriceProvider};
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    catalog: Arc<Catalog>,
    provider: Arc<SpotPriceProvider>,
    live_pricing: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub catalog: HealthCheck,
    pub spot_price: HealthCheck,
    pub checked_at: String,
}

pub fn router(
    catalog: Arc<Catalog>,
    provider: Arc<SpotPriceProvider>,
    live_pricing: bool,
) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(HealthState { catalog, provider, live_pricing })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let catalog = catalog_check(&state.catalog);
    let spot_price = spot_price_check(&state.provider, state.live_pricing);
    let ready = catalog.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "aurum-server runtime initialized".to_string(),
        },
        catalog,
        spot_price,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn catalog_check(catalog: &Catalog) -> HealthCheck {
    if catalog.is_empty() {
        HealthCheck { status: "degraded", detail: "catalog has no products".to_string() }
    } else {
        HealthCheck { status: "ready", detail: format!("{} products loaded", catalog.len()) }
    }
}

// A missing live price never blocks the storefront; it only shows up here.
fn spot_price_check(provider: &SpotPriceProvider, live_pricing: bool) -> HealthCheck {
    if !live_pricing {
        return HealthCheck {
            status: "degraded",
            detail: "no spot price api key configured; serving fallback price".to_string(),
        };
    }

    match provider.cached() {
        Some(spot) => HealthCheck {
            status: "ready",
            detail: format!(
                "last live price {:.2}/g fetched at {}",
                spot.price_per_gram,
                spot.fetched_at.to_rfc3339()
            ),
        },
        None => HealthCheck {
            status: "ready",
            detail: "no live price cached yet; fetched on next catalog request".to_string(),
        },
    }
}
