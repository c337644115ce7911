//! Client configuration.

use std::time::Duration;

/// Tunables for the market data client.
///
/// All fields are public; hosts construct one (usually from `Default`),
/// adjust what they need, and pass it to
/// [`MarketDataClient::new`](crate::client::MarketDataClient::new).
///
/// The defaults are deliberately conservative: the free tiers of the
/// supported upstreams allow on the order of 20-30 requests per minute, so
/// the scheduler spaces requests at least 3 seconds apart with up to a
/// second of jitter on top.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Minimum spacing between the starts of consecutive upstream requests.
    pub min_request_interval: Duration,

    /// Upper bound of the random jitter added to each spacing wait.
    pub max_jitter: Duration,

    /// Hard per-attempt timeout; elapse is a `Timeout` failure.
    pub request_timeout: Duration,

    /// Additional attempts after a 429 before `RateLimited` surfaces.
    pub max_retry_attempts: u32,

    /// First backoff delay; doubles on each subsequent 429.
    pub retry_base_delay: Duration,

    /// Consecutive job failures that open the circuit.
    pub failure_threshold: u32,

    /// How long an open circuit blocks requests before admitting a probe.
    pub cooldown: Duration,

    /// TTL for top-coin listings (slow moving).
    pub top_coins_ttl: Duration,

    /// TTL for single/batch price lookups.
    pub prices_ttl: Duration,

    /// TTL for coin detail payloads.
    pub detail_ttl: Duration,

    /// TTL for price history payloads.
    pub history_ttl: Duration,

    /// TTL for fallback-sourced entries. Long enough to collapse a burst of
    /// retries, short enough to recover quickly once the upstream returns.
    pub fallback_ttl: Duration,

    /// Interval of the periodic cache sweep.
    pub sweep_interval: Duration,

    /// Demo API key forwarded to CoinGecko when present.
    pub coingecko_api_key: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            min_request_interval: Duration::from_secs(3),
            max_jitter: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
            max_retry_attempts: 2,
            retry_base_delay: Duration::from_secs(1),
            failure_threshold: 3,
            cooldown: Duration::from_secs(300),
            top_coins_ttl: Duration::from_secs(300),
            prices_ttl: Duration::from_secs(90),
            detail_ttl: Duration::from_secs(600),
            history_ttl: Duration::from_secs(600),
            fallback_ttl: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(600),
            coingecko_api_key: None,
        }
    }
}
