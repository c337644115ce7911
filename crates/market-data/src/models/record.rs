use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The canonical market record all consumers depend on.
///
/// One row per asset, independent of which upstream produced it. Numeric
/// invariants are enforced by the normalization helpers: prices, caps, and
/// volumes are always finite and non-negative; percentage changes may be
/// negative and are `None` when the upstream did not report them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketRecord {
    /// Provider-agnostic identifier, stable across calls (e.g. "bitcoin").
    pub id: String,

    /// Ticker symbol as reported by the upstream (e.g. "btc").
    pub symbol: String,

    /// Human-readable asset name.
    pub name: String,

    /// Logo URL, when the upstream provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Latest price in USD.
    pub current_price_usd: f64,

    /// Price change over the trailing 24 hours, in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_change_pct_24h: Option<f64>,

    /// Price change over the trailing 7 days, in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_change_pct_7d: Option<f64>,

    /// Price change over the trailing 30 days, in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_change_pct_30d: Option<f64>,

    /// Market capitalization in USD.
    pub market_cap_usd: f64,

    /// Trailing 24-hour traded volume in USD.
    pub total_volume_usd: f64,

    /// Rank by market capitalization, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap_rank: Option<u32>,

    /// When the upstream last refreshed this row.
    pub last_updated: DateTime<Utc>,

    /// True when the record was synthesized locally instead of fetched.
    /// Consumers branch on this to show a degraded-state indicator.
    pub is_fallback: bool,
}
