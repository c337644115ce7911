//! Market data provider adapters.
//!
//! Each adapter speaks one upstream's dialect and returns canonical
//! shapes. The client walks adapters in priority order; the shared
//! normalization helpers make sure nothing provider-specific leaks out.

mod capabilities;
mod traits;

pub mod coincap;
pub mod coingecko;

pub use capabilities::ProviderCapabilities;
pub use traits::MarketDataProvider;
