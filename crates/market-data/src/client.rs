//! Public facade over the fetch pipeline.
//!
//! [`MarketDataClient`] is the only type consumers talk to. Every
//! operation follows the same path: cache -> in-flight de-duplication ->
//! scheduler -> provider failover (retry + timeout per attempt) ->
//! normalize -> cache, with total conversion to fallback data on any
//! failure. Operations never return an error and never panic; the worst a
//! consumer can observe is a record flagged `is_fallback`.
//!
//! The client is an explicitly constructed service instance with
//! process-wide lifetime: build one at startup (inside a Tokio runtime)
//! and hand it to every consumer. It owns the scheduler worker and the
//! cache sweeper task; both are torn down when the client is dropped.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use crate::cache::TtlCache;
use crate::config::ClientConfig;
use crate::errors::{FetchError, RetryClass};
use crate::fallback::FallbackSupplier;
use crate::models::{CoinDetail, MarketRecord, PriceSeries};
use crate::normalize;
use crate::provider::{
    coincap::CoinCapProvider, coingecko::CoinGeckoProvider, MarketDataProvider,
    ProviderCapabilities,
};
use crate::scheduler::{
    with_timeout, CircuitBreaker, CircuitBreakerConfig, CircuitState, RequestScheduler,
    RetryPolicy,
};

/// Largest top-coins page any upstream serves in one call.
const MAX_TOP_COINS: usize = 250;

/// Largest history window we request upstream.
const MAX_HISTORY_DAYS: u32 = 365;

/// Introspection snapshot for diagnostics.
///
/// Lets operators distinguish "everything fine, just cached" from
/// "the upstream has been down for twenty minutes".
#[derive(Clone, Debug, Serialize)]
pub struct ClientStatus {
    /// Jobs waiting in the scheduler queue.
    pub queue_depth: usize,
    /// Consecutive upstream failures recorded by the circuit breaker.
    pub consecutive_failures: u32,
    /// Current circuit state.
    pub circuit_state: CircuitState,
    /// Entries across all caches, expired or not.
    pub cached_entries: usize,
}

/// Resilient market data client.
pub struct MarketDataClient {
    config: ClientConfig,
    providers: Vec<Arc<dyn MarketDataProvider>>,
    records_cache: Arc<TtlCache<Vec<MarketRecord>>>,
    detail_cache: Arc<TtlCache<CoinDetail>>,
    history_cache: Arc<TtlCache<PriceSeries>>,
    scheduler: RequestScheduler,
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
    fallback: FallbackSupplier,
    /// Per-cache-key locks so concurrent misses collapse into one fetch.
    inflight: AsyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    sweeper: JoinHandle<()>,
}

impl MarketDataClient {
    /// Create a client with the default provider set (CoinGecko primary,
    /// CoinCap secondary).
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: ClientConfig) -> Self {
        let providers: Vec<Arc<dyn MarketDataProvider>> = vec![
            Arc::new(CoinGeckoProvider::new(config.coingecko_api_key.clone())),
            Arc::new(CoinCapProvider::new()),
        ];
        Self::with_providers(config, providers)
    }

    /// Create a client with a custom provider list.
    ///
    /// Providers are tried in ascending [`priority`] order on each fetch.
    ///
    /// [`priority`]: MarketDataProvider::priority
    pub fn with_providers(
        config: ClientConfig,
        mut providers: Vec<Arc<dyn MarketDataProvider>>,
    ) -> Self {
        providers.sort_by_key(|p| p.priority());

        let breaker = Arc::new(CircuitBreaker::with_config(CircuitBreakerConfig {
            failure_threshold: config.failure_threshold,
            cooldown: config.cooldown,
        }));
        let scheduler = RequestScheduler::new(
            config.min_request_interval,
            config.max_jitter,
            Arc::clone(&breaker),
        );

        let records_cache = Arc::new(TtlCache::new());
        let detail_cache = Arc::new(TtlCache::new());
        let history_cache = Arc::new(TtlCache::new());

        let sweeper = tokio::spawn(run_sweeper(
            config.sweep_interval,
            Arc::clone(&records_cache),
            Arc::clone(&detail_cache),
            Arc::clone(&history_cache),
        ));

        Self {
            retry: RetryPolicy::new(config.retry_base_delay, config.max_retry_attempts),
            config,
            providers,
            records_cache,
            detail_cache,
            history_cache,
            scheduler,
            breaker,
            fallback: FallbackSupplier,
            inflight: AsyncMutex::new(HashMap::new()),
            sweeper,
        }
    }

    /// The top `limit` assets by market capitalization.
    pub async fn get_top_coins(&self, limit: usize) -> Vec<MarketRecord> {
        let limit = limit.clamp(1, MAX_TOP_COINS);
        let key = format!("top_coins:{limit}");

        if let Some(hit) = self.records_cache.get(&key) {
            return hit;
        }

        let lock = self.key_lock(&key).await;
        let _guard = lock.lock().await;

        if let Some(hit) = self.records_cache.get(&key) {
            return hit;
        }

        let providers = self.providers.clone();
        let retry = self.retry.clone();
        let timeout = self.config.request_timeout;
        let result = self
            .scheduler
            .enqueue(key.clone(), move || async move {
                fetch_with_failover(&providers, &retry, timeout, |_| true, move |p| async move {
                    p.top_coins(limit).await
                })
                .await
            })
            .await;

        match result {
            Ok(records) => {
                self.records_cache
                    .set(key, records.clone(), self.config.top_coins_ttl);
                records
            }
            Err(e) => {
                warn!("get_top_coins: serving fallback data ({})", e);
                let records = self.fallback.top_coins(limit);
                self.records_cache
                    .set(key, records.clone(), self.config.fallback_ttl);
                records
            }
        }
    }

    /// Current market data for the given ids, in canonical id space.
    ///
    /// An empty id list short-circuits to an empty result without touching
    /// the scheduler.
    pub async fn get_coin_prices(&self, ids: &[String]) -> Vec<MarketRecord> {
        let ids = normalize_ids(ids);
        if ids.is_empty() {
            return Vec::new();
        }
        let key = format!("prices:{}", ids.join(","));

        if let Some(hit) = self.records_cache.get(&key) {
            return hit;
        }

        let lock = self.key_lock(&key).await;
        let _guard = lock.lock().await;

        if let Some(hit) = self.records_cache.get(&key) {
            return hit;
        }

        let providers = self.providers.clone();
        let retry = self.retry.clone();
        let timeout = self.config.request_timeout;
        let job_ids = ids.clone();
        let result = self
            .scheduler
            .enqueue(key.clone(), move || async move {
                fetch_with_failover(&providers, &retry, timeout, |_| true, move |p| {
                    let ids = job_ids.clone();
                    async move { p.coin_prices(&ids).await }
                })
                .await
            })
            .await;

        match result {
            Ok(records) => {
                self.records_cache
                    .set(key, records.clone(), self.config.prices_ttl);
                records
            }
            Err(e) => {
                warn!("get_coin_prices: serving fallback data ({})", e);
                let records = self.fallback.coin_prices(&ids);
                self.records_cache
                    .set(key, records.clone(), self.config.fallback_ttl);
                records
            }
        }
    }

    /// Detail payload for a single asset.
    pub async fn get_coin_details(&self, id: &str) -> CoinDetail {
        let id = normalize::canonical_id(id);
        let key = format!("detail:{id}");

        if let Some(hit) = self.detail_cache.get(&key) {
            return hit;
        }

        let lock = self.key_lock(&key).await;
        let _guard = lock.lock().await;

        if let Some(hit) = self.detail_cache.get(&key) {
            return hit;
        }

        let providers = self.providers.clone();
        let retry = self.retry.clone();
        let timeout = self.config.request_timeout;
        let job_id = id.clone();
        let result = self
            .scheduler
            .enqueue(key.clone(), move || async move {
                fetch_with_failover(
                    &providers,
                    &retry,
                    timeout,
                    |caps| caps.supports_detail,
                    move |p| {
                        let id = job_id.clone();
                        async move { p.coin_detail(&id).await }
                    },
                )
                .await
            })
            .await;

        match result {
            Ok(detail) => {
                self.detail_cache
                    .set(key, detail.clone(), self.config.detail_ttl);
                detail
            }
            Err(e) => {
                warn!("get_coin_details: serving fallback data ({})", e);
                let detail = self.fallback.coin_detail(&id);
                self.detail_cache
                    .set(key, detail.clone(), self.config.fallback_ttl);
                detail
            }
        }
    }

    /// Daily price history covering the trailing `days` days.
    ///
    /// The result always holds exactly `days + 1` points with strictly
    /// increasing timestamps, from the upstream and fallback paths alike.
    pub async fn get_coin_price_history(&self, id: &str, days: u32) -> PriceSeries {
        let id = normalize::canonical_id(id);
        let days = days.clamp(1, MAX_HISTORY_DAYS);
        let key = format!("history:{id}:{days}");

        if let Some(hit) = self.history_cache.get(&key) {
            return hit;
        }

        let lock = self.key_lock(&key).await;
        let _guard = lock.lock().await;

        if let Some(hit) = self.history_cache.get(&key) {
            return hit;
        }

        let providers = self.providers.clone();
        let retry = self.retry.clone();
        let timeout = self.config.request_timeout;
        let job_id = id.clone();
        let result = self
            .scheduler
            .enqueue(key.clone(), move || async move {
                fetch_with_failover(
                    &providers,
                    &retry,
                    timeout,
                    |caps| caps.supports_history,
                    move |p| {
                        let id = job_id.clone();
                        async move { p.price_history(&id, days).await }
                    },
                )
                .await
            })
            .await;

        match result {
            Ok(series) => {
                self.history_cache
                    .set(key, series.clone(), self.config.history_ttl);
                series
            }
            Err(e) => {
                warn!("get_coin_price_history: serving fallback data ({})", e);
                let series = self.fallback.price_history(&id, days);
                self.history_cache
                    .set(key, series.clone(), self.config.fallback_ttl);
                series
            }
        }
    }

    /// Diagnostics snapshot: queue length, failure count, breaker state,
    /// and cache population.
    pub fn status(&self) -> ClientStatus {
        ClientStatus {
            queue_depth: self.scheduler.queue_depth(),
            consecutive_failures: self.breaker.consecutive_failures(),
            circuit_state: self.breaker.state(),
            cached_entries: self.records_cache.len()
                + self.detail_cache.len()
                + self.history_cache.len(),
        }
    }

    /// The lock guarding in-flight fetches for one cache key.
    async fn key_lock(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut map = self.inflight.lock().await;
        Arc::clone(
            map.entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }
}

impl Drop for MarketDataClient {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

/// Canonicalize, sort, and dedup a consumer-supplied id list so equivalent
/// requests share a cache key.
fn normalize_ids(ids: &[String]) -> Vec<String> {
    let mut ids: Vec<String> = ids
        .iter()
        .filter(|id| !id.trim().is_empty())
        .map(|id| normalize::canonical_id(id))
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Walk providers in priority order until one serves the request.
///
/// Each attempt runs under the per-call timeout and the 429 backoff
/// policy. Providers whose capabilities do not cover the operation are
/// skipped without burning a serialized upstream call. The last error wins
/// when every provider fails.
async fn fetch_with_failover<T, F, Fut>(
    providers: &[Arc<dyn MarketDataProvider>],
    retry: &RetryPolicy,
    timeout: Duration,
    supports: fn(&ProviderCapabilities) -> bool,
    op: F,
) -> Result<T, FetchError>
where
    F: Fn(Arc<dyn MarketDataProvider>) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut last_error: Option<FetchError> = None;

    for provider in providers {
        if !supports(&provider.capabilities()) {
            continue;
        }
        let id = provider.id();

        let attempt = retry
            .run(id, || with_timeout(id, timeout, op(Arc::clone(provider))))
            .await;

        match attempt {
            Ok(value) => {
                if last_error.is_some() {
                    info!("{}: served request after failover", id);
                }
                return Ok(value);
            }
            Err(e) if e.retry_class() == RetryClass::Never => return Err(e),
            Err(e) => {
                warn!("{}: {}, trying next provider", id, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or(FetchError::EmptyResponse {
        message: "no provider supports this operation".to_string(),
    }))
}

/// Periodic cache sweep bounding memory growth from keys that are never
/// looked up again.
async fn run_sweeper(
    interval: Duration,
    records: Arc<TtlCache<Vec<MarketRecord>>>,
    details: Arc<TtlCache<CoinDetail>>,
    history: Arc<TtlCache<PriceSeries>>,
) {
    // `tokio::time::interval` panics on a zero period.
    let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
    // The first tick completes immediately; skip it so sweeps start one
    // full interval after startup.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let evicted = records.sweep() + details.sweep() + history.sweep();
        if evicted > 0 {
            debug!("Cache sweep: evicted {} expired entries", evicted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::models::PricePoint;

    struct MockProvider {
        id: &'static str,
        priority: u8,
        caps: ProviderCapabilities,
        calls: Arc<AtomicUsize>,
        fail: bool,
        delay: Duration,
    }

    impl MockProvider {
        fn healthy(calls: &Arc<AtomicUsize>) -> Self {
            Self {
                id: "MOCK",
                priority: 10,
                caps: ProviderCapabilities::default(),
                calls: Arc::clone(calls),
                fail: false,
                delay: Duration::ZERO,
            }
        }

        fn failing(calls: &Arc<AtomicUsize>) -> Self {
            Self {
                fail: true,
                ..Self::healthy(calls)
            }
        }

        async fn call(&self) -> Result<(), FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                Err(FetchError::Http {
                    provider: self.id.to_string(),
                    status: 500,
                })
            } else {
                Ok(())
            }
        }
    }

    fn sample_record(id: &str) -> MarketRecord {
        MarketRecord {
            id: id.to_string(),
            symbol: id.chars().take(3).collect(),
            name: id.to_string(),
            image_url: None,
            current_price_usd: 100.0,
            price_change_pct_24h: Some(0.5),
            price_change_pct_7d: None,
            price_change_pct_30d: None,
            market_cap_usd: 1_000_000.0,
            total_volume_usd: 50_000.0,
            market_cap_rank: Some(1),
            last_updated: Utc::now(),
            is_fallback: false,
        }
    }

    fn sample_detail(id: &str) -> CoinDetail {
        CoinDetail {
            id: id.to_string(),
            symbol: id.chars().take(3).collect(),
            name: id.to_string(),
            image_url: None,
            description: Some("A test asset.".to_string()),
            homepage: None,
            current_price_usd: 100.0,
            price_change_pct_24h: None,
            price_change_pct_7d: None,
            price_change_pct_30d: None,
            market_cap_usd: 1_000_000.0,
            total_volume_usd: 50_000.0,
            market_cap_rank: Some(1),
            last_updated: Utc::now(),
            is_fallback: false,
        }
    }

    fn sample_series(id: &str, days: u32) -> PriceSeries {
        let end = Utc::now();
        let points = (0..=days)
            .map(|i| PricePoint {
                timestamp: end - chrono::Duration::days(i64::from(days - i)),
                price_usd: 100.0 + f64::from(i),
            })
            .collect();
        PriceSeries {
            id: id.to_string(),
            days,
            points,
            is_fallback: false,
        }
    }

    #[async_trait::async_trait]
    impl MarketDataProvider for MockProvider {
        fn id(&self) -> &'static str {
            self.id
        }

        fn priority(&self) -> u8 {
            self.priority
        }

        fn capabilities(&self) -> ProviderCapabilities {
            self.caps
        }

        async fn top_coins(&self, limit: usize) -> Result<Vec<MarketRecord>, FetchError> {
            self.call().await?;
            Ok((0..limit)
                .map(|i| sample_record(&format!("coin-{i}")))
                .collect())
        }

        async fn coin_prices(&self, ids: &[String]) -> Result<Vec<MarketRecord>, FetchError> {
            self.call().await?;
            Ok(ids.iter().map(|id| sample_record(id)).collect())
        }

        async fn coin_detail(&self, id: &str) -> Result<CoinDetail, FetchError> {
            self.call().await?;
            Ok(sample_detail(id))
        }

        async fn price_history(&self, id: &str, days: u32) -> Result<PriceSeries, FetchError> {
            self.call().await?;
            Ok(sample_series(id, days))
        }
    }

    fn fast_config() -> ClientConfig {
        ClientConfig {
            min_request_interval: Duration::ZERO,
            max_jitter: Duration::ZERO,
            retry_base_delay: Duration::from_millis(1),
            ..ClientConfig::default()
        }
    }

    fn client_with(providers: Vec<Arc<dyn MarketDataProvider>>) -> MarketDataClient {
        MarketDataClient::with_providers(fast_config(), providers)
    }

    #[tokio::test(start_paused = true)]
    async fn facade_never_errors_and_flags_fallback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = client_with(vec![Arc::new(MockProvider::failing(&calls))]);

        let top = client.get_top_coins(10).await;
        assert!(!top.is_empty());
        assert!(top.iter().all(|r| r.is_fallback));

        let prices = client
            .get_coin_prices(&["bitcoin".to_string(), "ethereum".to_string()])
            .await;
        assert_eq!(prices.len(), 2);
        assert!(prices.iter().all(|r| r.is_fallback));

        let detail = client.get_coin_details("bitcoin").await;
        assert!(detail.is_fallback);

        let history = client.get_coin_price_history("bitcoin", 30).await;
        assert!(history.is_fallback);
        assert_eq!(history.points.len(), 31);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_fetch_is_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = client_with(vec![Arc::new(MockProvider::healthy(&calls))]);

        let first = client.get_top_coins(10).await;
        let second = client.get_top_coins(10).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.len(), 10);
        assert_eq!(second.len(), 10);
        assert!(first.iter().all(|r| !r.is_fallback));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_identical_calls_share_one_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut provider = MockProvider::healthy(&calls);
        provider.delay = Duration::from_millis(50);
        let client = client_with(vec![Arc::new(provider)]);

        let (a, b, c) = tokio::join!(
            client.get_top_coins(100),
            client.get_top_coins(100),
            client.get_top_coins(100),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.len(), 100);
        assert_eq!(b.len(), 100);
        assert_eq!(c.len(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn breaker_opens_and_stops_upstream_traffic() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = MarketDataClient::with_providers(
            ClientConfig {
                failure_threshold: 2,
                ..fast_config()
            },
            vec![Arc::new(MockProvider::failing(&calls))],
        );

        // Distinct keys so each call schedules a fresh job.
        let _ = client.get_top_coins(5).await;
        let _ = client.get_top_coins(6).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(client.status().circuit_state, CircuitState::Open);
        assert_eq!(client.status().consecutive_failures, 2);

        // The circuit is open: still a usable answer, but no new request.
        let third = client.get_top_coins(7).await;
        assert!(third.iter().all(|r| r.is_fallback));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failover_reaches_secondary_provider() {
        let primary_calls = Arc::new(AtomicUsize::new(0));
        let secondary_calls = Arc::new(AtomicUsize::new(0));

        let mut primary = MockProvider::failing(&primary_calls);
        primary.id = "PRIMARY";
        primary.priority = 1;
        let mut secondary = MockProvider::healthy(&secondary_calls);
        secondary.id = "SECONDARY";
        secondary.priority = 20;

        let client = client_with(vec![Arc::new(primary), Arc::new(secondary)]);

        let records = client.get_top_coins(10).await;
        assert!(records.iter().all(|r| !r.is_fallback));
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 1);

        // The job as a whole succeeded, so the breaker saw no failure.
        assert_eq!(client.status().consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn capability_filter_skips_unsupporting_providers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut provider = MockProvider::healthy(&calls);
        provider.caps = ProviderCapabilities {
            supports_detail: false,
            supports_history: true,
        };
        let client = client_with(vec![Arc::new(provider)]);

        let detail = client.get_coin_details("bitcoin").await;
        assert!(detail.is_fallback);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn upstream_history_preserves_shape() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = client_with(vec![Arc::new(MockProvider::healthy(&calls))]);

        let series = client.get_coin_price_history("bitcoin", 30).await;
        assert!(!series.is_fallback);
        assert_eq!(series.points.len(), 31);
        for pair in series.points.windows(2) {
            assert!(pair[1].timestamp > pair[0].timestamp);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn empty_id_list_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = client_with(vec![Arc::new(MockProvider::healthy(&calls))]);

        let records = client.get_coin_prices(&[]).await;
        assert!(records.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn equivalent_id_lists_share_a_cache_entry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = client_with(vec![Arc::new(MockProvider::healthy(&calls))]);

        let _ = client
            .get_coin_prices(&["ethereum".to_string(), "bitcoin".to_string()])
            .await;
        let _ = client
            .get_coin_prices(&["bitcoin".to_string(), "ethereum".to_string(), "bitcoin".to_string()])
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
