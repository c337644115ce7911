//! Market data provider trait definition.

use async_trait::async_trait;

use crate::errors::FetchError;
use crate::models::{CoinDetail, MarketRecord, PriceSeries};

use super::capabilities::ProviderCapabilities;

/// Trait for market data providers.
///
/// Implement this trait to add support for a new upstream. Adapters parse
/// their provider's raw payloads and normalize them before returning, so
/// every implementation speaks the same canonical shapes.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// A constant string like "COINGECKO"; used for logging and error
    /// context.
    fn id(&self) -> &'static str;

    /// Provider priority for failover ordering.
    ///
    /// Lower values = higher priority. Default is 10.
    fn priority(&self) -> u8 {
        10
    }

    /// Describes which optional operations this provider can serve.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Fetch the top assets by market capitalization.
    ///
    /// Returns up to `limit` records ordered by rank.
    async fn top_coins(&self, limit: usize) -> Result<Vec<MarketRecord>, FetchError>;

    /// Fetch current market data for the given canonical ids.
    ///
    /// Providers may return fewer records than requested when some ids are
    /// unknown to them; an entirely empty result for a non-empty request is
    /// an `EmptyResponse` failure.
    async fn coin_prices(&self, ids: &[String]) -> Result<Vec<MarketRecord>, FetchError>;

    /// Fetch the detail payload for a single asset.
    ///
    /// Default implementation reports the operation as unsupported; the
    /// client's capability filter keeps it from being called in that case.
    async fn coin_detail(&self, id: &str) -> Result<CoinDetail, FetchError> {
        let _ = id;
        Err(FetchError::EmptyResponse {
            message: format!("{}: coin detail not supported", self.id()),
        })
    }

    /// Fetch a daily price series covering the trailing `days` days.
    ///
    /// The returned series always holds exactly `days + 1` points with
    /// strictly increasing timestamps.
    async fn price_history(&self, id: &str, days: u32) -> Result<PriceSeries, FetchError>;
}
