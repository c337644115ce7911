//! Raw CoinGecko response shapes and their canonical conversions.

use std::collections::HashMap;

use serde::Deserialize;

use crate::models::{CoinDetail, MarketRecord, PricePoint};
use crate::normalize;

/// One row of `/coins/markets`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct GeckoMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub total_volume: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub price_change_percentage_24h_in_currency: Option<f64>,
    pub price_change_percentage_7d_in_currency: Option<f64>,
    pub price_change_percentage_30d_in_currency: Option<f64>,
    pub last_updated: Option<String>,
}

impl GeckoMarket {
    pub(super) fn into_record(self) -> MarketRecord {
        MarketRecord {
            id: normalize::canonical_id(&self.id),
            symbol: self.symbol,
            name: self.name,
            image_url: self.image,
            current_price_usd: normalize::non_negative(self.current_price),
            price_change_pct_24h: normalize::pct_change(
                self.price_change_percentage_24h_in_currency
                    .or(self.price_change_percentage_24h),
            ),
            price_change_pct_7d: normalize::pct_change(
                self.price_change_percentage_7d_in_currency,
            ),
            price_change_pct_30d: normalize::pct_change(
                self.price_change_percentage_30d_in_currency,
            ),
            market_cap_usd: normalize::non_negative(self.market_cap),
            total_volume_usd: normalize::non_negative(self.total_volume),
            market_cap_rank: self.market_cap_rank,
            last_updated: normalize::parse_rfc3339(self.last_updated.as_deref()),
            is_fallback: false,
        }
    }
}

/// `/coins/{id}` payload, trimmed to the fields the detail shape needs.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct GeckoDetail {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub description: Option<GeckoDescription>,
    pub links: Option<GeckoLinks>,
    pub image: Option<GeckoImage>,
    pub market_cap_rank: Option<u32>,
    pub market_data: Option<GeckoMarketData>,
    pub last_updated: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct GeckoDescription {
    pub en: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct GeckoLinks {
    pub homepage: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct GeckoImage {
    pub large: Option<String>,
    pub small: Option<String>,
}

/// Per-currency maps inside `market_data`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct GeckoMarketData {
    pub current_price: Option<HashMap<String, f64>>,
    pub market_cap: Option<HashMap<String, f64>>,
    pub total_volume: Option<HashMap<String, f64>>,
    pub price_change_percentage_24h: Option<f64>,
    pub price_change_percentage_7d: Option<f64>,
    pub price_change_percentage_30d: Option<f64>,
}

impl GeckoDetail {
    pub(super) fn into_detail(self) -> CoinDetail {
        fn usd(map: &Option<HashMap<String, f64>>) -> Option<f64> {
            map.as_ref().and_then(|m| m.get("usd").copied())
        }

        let market = self.market_data.unwrap_or_default();

        CoinDetail {
            id: normalize::canonical_id(&self.id),
            symbol: self.symbol,
            name: self.name,
            image_url: self.image.and_then(|i| i.large.or(i.small)),
            description: self
                .description
                .and_then(|d| d.en)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            homepage: self
                .links
                .and_then(|l| l.homepage.into_iter().find(|h| !h.is_empty())),
            current_price_usd: normalize::non_negative(usd(&market.current_price)),
            price_change_pct_24h: normalize::pct_change(market.price_change_percentage_24h),
            price_change_pct_7d: normalize::pct_change(market.price_change_percentage_7d),
            price_change_pct_30d: normalize::pct_change(market.price_change_percentage_30d),
            market_cap_usd: normalize::non_negative(usd(&market.market_cap)),
            total_volume_usd: normalize::non_negative(usd(&market.total_volume)),
            market_cap_rank: self.market_cap_rank,
            last_updated: normalize::parse_rfc3339(self.last_updated.as_deref()),
            is_fallback: false,
        }
    }
}

/// `/coins/{id}/market_chart` payload: `[[timestamp_ms, value], ...]`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct GeckoMarketChart {
    pub prices: Vec<[f64; 2]>,
}

impl GeckoMarketChart {
    pub(super) fn into_points(self) -> Vec<PricePoint> {
        self.prices
            .into_iter()
            .filter_map(|[ts_ms, price]| {
                let timestamp = chrono::DateTime::from_timestamp_millis(ts_ms as i64)?;
                Some(PricePoint {
                    timestamp,
                    price_usd: price,
                })
            })
            .collect()
    }
}
