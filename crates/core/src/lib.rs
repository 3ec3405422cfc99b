pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod filter;
pub mod pricing;
pub mod spot;
pub mod storefront;

pub use catalog::{enrich, Catalog, CatalogError, CatalogSource};
pub use domain::product::{EnrichedProduct, Product, ProductId};
pub use errors::{ApplicationError, FilterError, InterfaceError, SpotPriceError};
pub use filter::{filter, FilterCriteria, FilterQuery};
pub use pricing::{compute_price, to_five_scale};
pub use spot::{
    Clock, ManualClock, MetalPriceApiClient, ProviderSettings, RateSource, SpotPrice,
    SpotPriceCache, SpotPriceOutcome, SpotPriceProvider, SpotPriceSource, SystemClock,
};
pub use storefront::{CatalogListing, StorefrontRuntime};
