//! Upstream spot rate sources.
//!
//! The production source is metalpriceapi.com's `latest` endpoint, which quotes commodities
//! against a base currency: with `base=USD&currencies=XAU` the returned `rates.XAU` is troy
//! ounces of gold per US dollar.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::config::SpotPriceConfig;
use crate::errors::SpotPriceError;

/// Upstream rates are commodity units per unit of the base currency.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rate(&self) -> Result<f64, SpotPriceError>;
}

#[derive(Debug, Deserialize)]
pub struct LatestRatesResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub rates: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Clone, Debug)]
pub struct MetalPriceApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    base_currency: String,
    commodity: String,
}

impl MetalPriceApiClient {
    pub fn new(config: &SpotPriceConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("aurum/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(2);
        if let Some(timeout_secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            base_currency: config.base_currency.clone(),
            commodity: config.commodity.clone(),
        })
    }
}

#[async_trait]
impl RateSource for MetalPriceApiClient {
    async fn fetch_rate(&self) -> Result<f64, SpotPriceError> {
        let api_key = self
            .api_key
            .as_ref()
            .map(|key| key.expose_secret().trim())
            .filter(|key| !key.is_empty())
            .ok_or(SpotPriceError::MissingCredential)?;

        debug!(
            event_name = "spot.upstream.request",
            base_url = %self.base_url,
            base = %self.base_currency,
            commodity = %self.commodity,
            "requesting latest commodity rate"
        );

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("access_key", api_key),
                ("base", self.base_currency.as_str()),
                ("currencies", self.commodity.as_str()),
            ])
            .send()
            .await
            .map_err(|error| SpotPriceError::UpstreamUnavailable(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(500).collect();
            return Err(SpotPriceError::UpstreamUnavailable(format!(
                "price api returned {status}: {excerpt}"
            )));
        }

        let payload: LatestRatesResponse = response.json().await.map_err(|error| {
            SpotPriceError::MalformedUpstreamResponse(format!(
                "could not decode price api response: {error}"
            ))
        })?;

        extract_rate(&payload, &self.commodity)
    }
}

/// Pulls the commodity rate out of a decoded `latest` payload.
pub fn extract_rate(payload: &LatestRatesResponse, commodity: &str) -> Result<f64, SpotPriceError> {
    if payload.success == Some(false) {
        let detail = payload
            .error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "no error detail".to_string());
        return Err(SpotPriceError::UpstreamUnavailable(format!(
            "price api reported failure: {detail}"
        )));
    }

    let rates = payload.rates.as_ref().ok_or_else(|| {
        SpotPriceError::MalformedUpstreamResponse("response has no `rates` object".to_string())
    })?;

    rates.get(commodity).copied().ok_or_else(|| {
        let available = rates.keys().map(String::as_str).collect::<Vec<_>>().join(", ");
        SpotPriceError::MalformedUpstreamResponse(format!(
            "rate for `{commodity}` missing (available: [{available}])"
        ))
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::{extract::Query, http::StatusCode, response::IntoResponse, routing::get, Router};

    use super::{extract_rate, LatestRatesResponse, MetalPriceApiClient, RateSource};
    use crate::config::{AppConfig, SpotPriceConfig};
    use crate::errors::SpotPriceError;

    type SeenQuery = Arc<Mutex<Option<HashMap<String, String>>>>;

    /// Answers `/latest` with `status` and `body`, recording the last query string.
    async fn serve_latest(status: StatusCode, body: &str) -> (SocketAddr, SeenQuery) {
        let body = body.to_string();
        let seen: SeenQuery = Arc::default();
        let recorder = seen.clone();
        let app = Router::new().route(
            "/latest",
            get(move |Query(query): Query<HashMap<String, String>>| {
                let recorder = recorder.clone();
                let body = body.clone();
                async move {
                    *recorder.lock().expect("query lock") = Some(query);
                    (status, body).into_response()
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (addr, seen)
    }

    fn client_for(addr: SocketAddr) -> MetalPriceApiClient {
        let config = SpotPriceConfig {
            api_key: Some("test-key".to_string().into()),
            base_url: format!("http://{addr}/latest"),
            ..AppConfig::default().spot_price
        };
        MetalPriceApiClient::new(&config).expect("client should build")
    }

    fn payload(value: serde_json::Value) -> LatestRatesResponse {
        serde_json::from_value(value).expect("payload should decode")
    }

    #[test]
    fn extracts_commodity_rate() {
        let payload = payload(json!({
            "success": true,
            "base": "USD",
            "timestamp": 1_714_567_200,
            "rates": { "XAU": 0.000435, "XAG": 0.0351 }
        }));

        assert_eq!(extract_rate(&payload, "XAU"), Ok(0.000435));
    }

    #[test]
    fn missing_rates_object_is_malformed() {
        let payload = payload(json!({ "base": "USD" }));

        assert!(matches!(
            extract_rate(&payload, "XAU"),
            Err(SpotPriceError::MalformedUpstreamResponse(message)) if message.contains("rates")
        ));
    }

    #[test]
    fn missing_commodity_lists_available_codes() {
        let payload = payload(json!({ "rates": { "EUR": 0.92, "XAG": 0.0351 } }));

        assert_eq!(
            extract_rate(&payload, "XAU"),
            Err(SpotPriceError::MalformedUpstreamResponse(
                "rate for `XAU` missing (available: [EUR, XAG])".to_string()
            ))
        );
    }

    #[test]
    fn reported_failure_is_upstream_unavailable() {
        let payload = payload(json!({
            "success": false,
            "error": { "statusCode": 101, "message": "Invalid API Key." }
        }));

        let result = extract_rate(&payload, "XAU");
        assert!(matches!(
            result,
            Err(SpotPriceError::UpstreamUnavailable(ref message))
                if message.contains("Invalid API Key.")
        ));
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let mut config = AppConfig::default().spot_price;
        // Nothing listens here; reaching the network would surface as UpstreamUnavailable.
        config.base_url = "http://127.0.0.1:9/latest".to_string();
        config.api_key = None;
        let client = MetalPriceApiClient::new(&config).expect("client should build");

        assert_eq!(client.fetch_rate().await, Err(SpotPriceError::MissingCredential));
    }

    #[tokio::test]
    async fn blank_key_counts_as_missing() {
        let mut config = AppConfig::default().spot_price;
        config.api_key = Some("   ".to_string().into());
        let client = MetalPriceApiClient::new(&config).expect("client should build");

        assert_eq!(client.fetch_rate().await, Err(SpotPriceError::MissingCredential));
    }

    #[tokio::test]
    async fn fetches_rate_with_credentials_in_query() {
        let (addr, seen) =
            serve_latest(StatusCode::OK, r#"{"success":true,"rates":{"XAU":0.0004}}"#).await;

        assert_eq!(client_for(addr).fetch_rate().await, Ok(0.0004));

        let query = seen.lock().expect("query lock").clone().expect("request was made");
        assert_eq!(query.get("access_key").map(String::as_str), Some("test-key"));
        assert_eq!(query.get("base").map(String::as_str), Some("USD"));
        assert_eq!(query.get("currencies").map(String::as_str), Some("XAU"));
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_unavailable_with_body_excerpt() {
        let (addr, _) = serve_latest(StatusCode::BAD_GATEWAY, &"x".repeat(600)).await;

        let result = client_for(addr).fetch_rate().await;

        let Err(SpotPriceError::UpstreamUnavailable(message)) = result else {
            panic!("expected UpstreamUnavailable, got {result:?}");
        };
        assert!(message.contains("502"));
        assert!(message.contains(&"x".repeat(500)));
        assert!(!message.contains(&"x".repeat(501)));
    }

    #[tokio::test]
    async fn undecodable_body_is_malformed() {
        let (addr, _) = serve_latest(StatusCode::OK, "not json").await;

        let result = client_for(addr).fetch_rate().await;

        assert!(matches!(result, Err(SpotPriceError::MalformedUpstreamResponse(_))));
    }

    #[tokio::test]
    async fn connection_failure_is_upstream_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let result = client_for(addr).fetch_rate().await;

        assert!(matches!(result, Err(SpotPriceError::UpstreamUnavailable(_))));
    }
}
