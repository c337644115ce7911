//! Raw CoinCap response shapes and their canonical conversions.
//!
//! CoinCap encodes every number as a string and uses its own field
//! vocabulary (`priceUsd`, `changePercent24Hr`, `volumeUsd24Hr`), which is
//! exactly the heterogeneity the normalization helpers exist for.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{MarketRecord, PricePoint};
use crate::normalize;

/// Envelope around `/v2/assets`.
#[derive(Debug, Deserialize)]
pub(super) struct AssetsEnvelope {
    pub data: Vec<CoinCapAsset>,
}

/// Envelope around `/v2/assets/{id}/history`.
#[derive(Debug, Deserialize)]
pub(super) struct HistoryEnvelope {
    pub data: Vec<CoinCapHistoryPoint>,
}

/// One asset row.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(super) struct CoinCapAsset {
    pub id: String,
    pub rank: Option<String>,
    pub symbol: String,
    pub name: String,
    pub price_usd: Option<String>,
    pub market_cap_usd: Option<String>,
    pub volume_usd24_hr: Option<String>,
    pub change_percent24_hr: Option<String>,
}

impl CoinCapAsset {
    pub(super) fn into_record(self) -> MarketRecord {
        MarketRecord {
            id: normalize::canonical_id(&self.id),
            symbol: self.symbol.to_ascii_lowercase(),
            name: self.name,
            // CoinCap has no image endpoint; consumers tolerate the null.
            image_url: None,
            current_price_usd: normalize::non_negative(normalize::parse_str_f64(
                self.price_usd.as_deref(),
            )),
            price_change_pct_24h: normalize::pct_change(normalize::parse_str_f64(
                self.change_percent24_hr.as_deref(),
            )),
            price_change_pct_7d: None,
            price_change_pct_30d: None,
            market_cap_usd: normalize::non_negative(normalize::parse_str_f64(
                self.market_cap_usd.as_deref(),
            )),
            total_volume_usd: normalize::non_negative(normalize::parse_str_f64(
                self.volume_usd24_hr.as_deref(),
            )),
            market_cap_rank: normalize::parse_str_u32(self.rank.as_deref()),
            last_updated: Utc::now(),
            is_fallback: false,
        }
    }
}

/// One point of `/v2/assets/{id}/history`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CoinCapHistoryPoint {
    pub price_usd: String,
    /// Millisecond epoch timestamp.
    pub time: i64,
}

impl CoinCapHistoryPoint {
    pub(super) fn into_point(self) -> Option<PricePoint> {
        let timestamp = DateTime::from_timestamp_millis(self.time)?;
        let price_usd = normalize::parse_str_f64(Some(&self.price_usd))?;
        Some(PricePoint {
            timestamp,
            price_usd,
        })
    }
}
