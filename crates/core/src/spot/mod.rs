//! Gold spot price with a time-bounded cache and a fixed fallback.
//!
//! The provider owns the only mutable state in the pricing pipeline. A cached price is reused
//! while `now - fetched_at < ttl`; after that the next caller refetches. Concurrent callers
//! that both see a stale entry will both go upstream and the last write wins. Fallback prices
//! are never written to the cache, so every call made while the upstream is failing retries
//! the fetch.

pub mod clock;
pub mod source;

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::SpotPriceConfig;
use crate::errors::SpotPriceError;

pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::source::{MetalPriceApiClient, RateSource};

/// Grams in one troy ounce.
pub const TROY_OUNCE_GRAMS: f64 = 31.1035;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SpotPrice {
    pub price_per_gram: f64,
    pub fetched_at: DateTime<Utc>,
}

impl SpotPrice {
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        now - self.fetched_at < ttl
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpotPriceSource {
    Fresh,
    Cached,
    Fallback,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SpotPriceOutcome {
    /// Fetched upstream during this call.
    Fresh(SpotPrice),
    Cached(SpotPrice),
    /// Upstream failed; `reason` says why.
    Fallback { price_per_gram: f64, reason: SpotPriceError },
}

impl SpotPriceOutcome {
    pub fn value(&self) -> f64 {
        match self {
            Self::Fresh(spot) | Self::Cached(spot) => spot.price_per_gram,
            Self::Fallback { price_per_gram, .. } => *price_per_gram,
        }
    }

    pub fn source(&self) -> SpotPriceSource {
        match self {
            Self::Fresh(_) => SpotPriceSource::Fresh,
            Self::Cached(_) => SpotPriceSource::Cached,
            Self::Fallback { .. } => SpotPriceSource::Fallback,
        }
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Fresh(spot) | Self::Cached(spot) => Some(spot.fetched_at),
            Self::Fallback { .. } => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Last successfully fetched spot price.
#[derive(Debug, Default)]
pub struct SpotPriceCache {
    entry: Mutex<Option<SpotPrice>>,
}

impl SpotPriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<SpotPrice> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn store(&self, spot: SpotPrice) {
        *self.entry.lock().unwrap_or_else(PoisonError::into_inner) = Some(spot);
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProviderSettings {
    pub ttl: TimeDelta,
    pub fallback_price_per_gram: Option<f64>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self { ttl: TimeDelta::minutes(5), fallback_price_per_gram: Some(65.0) }
    }
}

impl From<&SpotPriceConfig> for ProviderSettings {
    fn from(config: &SpotPriceConfig) -> Self {
        let ttl_secs = i64::try_from(config.cache_ttl_secs).unwrap_or(i64::MAX / 1_000);
        Self { ttl: TimeDelta::seconds(ttl_secs), fallback_price_per_gram: config.fallback() }
    }
}

pub struct SpotPriceProvider {
    source: Arc<dyn RateSource>,
    cache: Arc<SpotPriceCache>,
    clock: Arc<dyn Clock>,
    settings: ProviderSettings,
}

impl SpotPriceProvider {
    pub fn new(source: Arc<dyn RateSource>, settings: ProviderSettings) -> Self {
        Self {
            source,
            cache: Arc::new(SpotPriceCache::new()),
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    /// Provider backed by metalpriceapi.com as configured.
    pub fn from_config(config: &SpotPriceConfig) -> Result<Self, reqwest::Error> {
        let client = MetalPriceApiClient::new(config)?;
        Ok(Self::new(Arc::new(client), ProviderSettings::from(config)))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cache(mut self, cache: Arc<SpotPriceCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn settings(&self) -> ProviderSettings {
        self.settings
    }

    pub fn cached(&self) -> Option<SpotPrice> {
        self.cache.get()
    }

    /// Current price per gram in the reference currency.
    ///
    /// Only fails when the upstream cannot be used and no fallback price is configured.
    pub async fn spot_price(&self) -> Result<SpotPriceOutcome, SpotPriceError> {
        let now = self.clock.now();
        if let Some(cached) = self.cache.get() {
            if cached.is_fresh(now, self.settings.ttl) {
                debug!(
                    event_name = "spot.cache.hit",
                    price_per_gram = cached.price_per_gram,
                    fetched_at = %cached.fetched_at,
                    "using cached spot price"
                );
                return Ok(SpotPriceOutcome::Cached(cached));
            }
        }

        info!(event_name = "spot.fetch.start", "fetching fresh spot price");
        let fetched = self.source.fetch_rate().await.and_then(price_per_gram_from_rate);

        match fetched {
            Ok(price_per_gram) => {
                let spot = SpotPrice { price_per_gram, fetched_at: now };
                self.cache.store(spot.clone());
                info!(
                    event_name = "spot.fetch.succeeded",
                    price_per_gram,
                    "fetched spot price per gram"
                );
                Ok(SpotPriceOutcome::Fresh(spot))
            }
            Err(reason) => {
                error!(
                    event_name = "spot.fetch.failed",
                    error = %reason,
                    "spot price fetch failed"
                );
                let Some(price_per_gram) = self.settings.fallback_price_per_gram else {
                    return Err(reason);
                };
                warn!(
                    event_name = "spot.fallback.used",
                    price_per_gram,
                    reason = %reason,
                    "serving fallback spot price"
                );
                Ok(SpotPriceOutcome::Fallback { price_per_gram, reason })
            }
        }
    }
}

/// Converts "commodity ounces per currency unit" into "currency per gram".
pub fn price_per_gram_from_rate(rate: f64) -> Result<f64, SpotPriceError> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(SpotPriceError::MalformedUpstreamResponse(format!(
            "rate must be a positive number (got {rate})"
        )));
    }
    Ok(1.0 / rate / TROY_OUNCE_GRAMS)
}
