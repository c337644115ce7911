//! Coindeck Market Data Crate
//!
//! This crate provides a resilient market data client: it fetches
//! third-party crypto price data over HTTP under strict upstream rate
//! limits while serving consumers fast, consistent, always-available
//! responses.
//!
//! # Overview
//!
//! The crate supports:
//! - Multiple providers (CoinGecko, CoinCap) tried in priority order
//! - TTL caching with per-operation lifetimes
//! - Single-lane request scheduling that enforces the upstream rate limit
//! - Circuit breaking and bounded 429 backoff
//! - Deterministic fallback data so consumers never see an empty state
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |     Consumer     |  (UI widgets, detail pages)
//! +------------------+
//!          |
//!          v
//! +------------------+     +------------------+
//! | MarketDataClient | --> |    TtlCache      |  (hit: return at once)
//! +------------------+     +------------------+
//!          | miss
//!          v
//! +------------------+     +------------------+
//! | RequestScheduler | --> |  CircuitBreaker  |  (open: fail fast)
//! +------------------+     +------------------+
//!          |  one job at a time, min spacing
//!          v
//! +------------------+     +------------------+
//! |    Provider      | --> |   RetryPolicy    |  (429: backoff)
//! +------------------+     +------------------+
//!          |
//!          v
//! +------------------+
//! |   MarketRecord   |  (canonical; or FallbackSupplier on failure)
//! +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`MarketDataClient`] - the public facade; its operations never fail
//! - [`MarketRecord`] - the canonical market row consumers depend on
//! - [`CoinDetail`] / [`PriceSeries`] - detail and history shapes
//! - [`ClientConfig`] - tunables (spacing, TTLs, thresholds)
//! - [`ClientStatus`] - diagnostics snapshot (`status()`)
//! - [`FetchError`] - internal error taxonomy, absorbed at the facade

pub mod cache;
pub mod client;
pub mod config;
pub mod errors;
pub mod fallback;
pub mod models;
pub mod provider;
pub mod scheduler;

mod normalize;

// Re-export the public surface.
pub use cache::TtlCache;
pub use client::{ClientStatus, MarketDataClient};
pub use config::ClientConfig;
pub use errors::{FetchError, RetryClass};
pub use fallback::FallbackSupplier;
pub use models::{CoinDetail, MarketRecord, PricePoint, PriceSeries};

// Re-export provider types.
pub use provider::coincap::CoinCapProvider;
pub use provider::coingecko::CoinGeckoProvider;
pub use provider::{MarketDataProvider, ProviderCapabilities};

// Re-export scheduler types.
pub use scheduler::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, RequestScheduler, RetryPolicy,
};
