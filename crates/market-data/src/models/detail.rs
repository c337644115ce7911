use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Detail-page shape for a single asset.
///
/// Superset of the listing row: adds descriptive fields that only the
/// per-asset upstream endpoints carry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoinDetail {
    /// Provider-agnostic identifier, stable across calls.
    pub id: String,

    /// Ticker symbol.
    pub symbol: String,

    /// Human-readable asset name.
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// Prose description of the asset, when the upstream carries one.
    /// Fallback details use this to state that data is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Project homepage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,

    pub current_price_usd: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_change_pct_24h: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_change_pct_7d: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_change_pct_30d: Option<f64>,

    pub market_cap_usd: f64,

    pub total_volume_usd: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap_rank: Option<u32>,

    pub last_updated: DateTime<Utc>,

    /// True when the record was synthesized locally instead of fetched.
    pub is_fallback: bool,
}
