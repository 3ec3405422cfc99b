//! Storefront JSON API.
//!
//! - `GET /api/products`: enriched catalog, optionally filtered by
//!   `priceMin`, `priceMax`, `popularityMin`, `popularityMax`
//! - `GET /api/spot-price`: current gold price per gram and where it came from
//!
//! A handler panic is answered with a generic 500 instead of a dropped connection.

use std::any::Any;

use aurum_core::{
    ApplicationError, EnrichedProduct, FilterQuery, InterfaceError, SpotPriceOutcome,
    SpotPriceSource, StorefrontRuntime,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct CatalogState {
    runtime: StorefrontRuntime,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotPriceResponse {
    pub price_per_gram: f64,
    pub source: SpotPriceSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Boundary error; renders as `{ "message": ... }` with a status matching the failure.
#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl From<InterfaceError> for ApiError {
    fn from(value: InterfaceError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::PriceUnavailable { .. } | InterfaceError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorBody { message: self.0.user_message().to_string() };
        (status, Json(body)).into_response()
    }
}

pub fn router(runtime: StorefrontRuntime) -> Router {
    Router::new()
        .route("/api/products", get(list_products))
        .route("/api/spot-price", get(spot_price))
        .with_state(CatalogState { runtime })
        .layer(CatchPanicLayer::custom(internal_error))
}

fn internal_error(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "non-string panic payload".to_string()
    };

    let correlation_id = Uuid::new_v4().to_string();
    error!(
        event_name = "catalog.request.panicked",
        correlation_id = %correlation_id,
        detail = %detail,
        "request handler panicked"
    );

    ApiError::from(ApplicationError::Unexpected(detail).into_interface(correlation_id))
        .into_response()
}

pub async fn list_products(
    State(state): State<CatalogState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<Vec<EnrichedProduct>>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();

    let criteria = query.parse().map_err(|filter_error| {
        warn!(
            event_name = "catalog.request.invalid_filter",
            correlation_id = %correlation_id,
            error = %filter_error,
            "rejecting catalog request"
        );
        ApplicationError::from(filter_error).into_interface(correlation_id.as_str())
    })?;

    let listing = state.runtime.list(&criteria, &correlation_id).await.map_err(|spot_error| {
        error!(
            event_name = "catalog.request.price_unavailable",
            correlation_id = %correlation_id,
            error = %spot_error,
            "could not price catalog"
        );
        ApplicationError::from(spot_error).into_interface(correlation_id.as_str())
    })?;

    Ok(Json(listing.products))
}

pub async fn spot_price(
    State(state): State<CatalogState>,
) -> Result<Json<SpotPriceResponse>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let outcome = state.runtime.provider().spot_price().await.map_err(|spot_error| {
        error!(
            event_name = "spot.request.price_unavailable",
            correlation_id = %correlation_id,
            error = %spot_error,
            "could not source spot price"
        );
        ApplicationError::from(spot_error).into_interface(correlation_id.as_str())
    })?;

    let reason = match &outcome {
        SpotPriceOutcome::Fallback { reason, .. } => Some(reason.to_string()),
        _ => None,
    };

    Ok(Json(SpotPriceResponse {
        price_per_gram: outcome.value(),
        source: outcome.source(),
        fetched_at: outcome.fetched_at(),
        reason,
    }))
}
