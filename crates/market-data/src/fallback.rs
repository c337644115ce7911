//! Synthetic data served when every real fetch path has failed.
//!
//! Pure local computation - nothing here is queued, rate-limited, or
//! fallible. Every record is flagged `is_fallback: true` so consumers can
//! render a degraded-state indicator instead of a broken page.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{CoinDetail, MarketRecord, PricePoint, PriceSeries};

/// Description used on fallback detail records.
const UNAVAILABLE_DESCRIPTION: &str =
    "Live market data for this asset is temporarily unavailable. \
     The figures shown are placeholders and will refresh automatically.";

/// Curated static values for the majors.
struct CuratedAsset {
    id: &'static str,
    symbol: &'static str,
    name: &'static str,
    price_usd: f64,
    market_cap_usd: f64,
    total_volume_usd: f64,
    change_pct_24h: f64,
    rank: u32,
}

const CURATED: &[CuratedAsset] = &[
    CuratedAsset { id: "bitcoin", symbol: "btc", name: "Bitcoin", price_usd: 64_000.0, market_cap_usd: 1_260_000_000_000.0, total_volume_usd: 28_000_000_000.0, change_pct_24h: 0.4, rank: 1 },
    CuratedAsset { id: "ethereum", symbol: "eth", name: "Ethereum", price_usd: 3_100.0, market_cap_usd: 372_000_000_000.0, total_volume_usd: 14_000_000_000.0, change_pct_24h: -0.6, rank: 2 },
    CuratedAsset { id: "tether", symbol: "usdt", name: "Tether", price_usd: 1.0, market_cap_usd: 112_000_000_000.0, total_volume_usd: 46_000_000_000.0, change_pct_24h: 0.0, rank: 3 },
    CuratedAsset { id: "binancecoin", symbol: "bnb", name: "BNB", price_usd: 580.0, market_cap_usd: 85_000_000_000.0, total_volume_usd: 1_700_000_000.0, change_pct_24h: 0.8, rank: 4 },
    CuratedAsset { id: "solana", symbol: "sol", name: "Solana", price_usd: 150.0, market_cap_usd: 69_000_000_000.0, total_volume_usd: 2_400_000_000.0, change_pct_24h: 1.9, rank: 5 },
    CuratedAsset { id: "ripple", symbol: "xrp", name: "XRP", price_usd: 0.52, market_cap_usd: 29_000_000_000.0, total_volume_usd: 1_100_000_000.0, change_pct_24h: -1.2, rank: 6 },
    CuratedAsset { id: "usd-coin", symbol: "usdc", name: "USDC", price_usd: 1.0, market_cap_usd: 33_000_000_000.0, total_volume_usd: 5_600_000_000.0, change_pct_24h: 0.0, rank: 7 },
    CuratedAsset { id: "cardano", symbol: "ada", name: "Cardano", price_usd: 0.45, market_cap_usd: 16_000_000_000.0, total_volume_usd: 340_000_000.0, change_pct_24h: -0.9, rank: 8 },
    CuratedAsset { id: "dogecoin", symbol: "doge", name: "Dogecoin", price_usd: 0.12, market_cap_usd: 17_000_000_000.0, total_volume_usd: 680_000_000.0, change_pct_24h: 2.4, rank: 9 },
    CuratedAsset { id: "tron", symbol: "trx", name: "TRON", price_usd: 0.13, market_cap_usd: 11_000_000_000.0, total_volume_usd: 310_000_000.0, change_pct_24h: 0.3, rank: 10 },
];

/// Supplier of deterministic, clearly-labeled synthetic market data.
#[derive(Clone, Copy, Debug, Default)]
pub struct FallbackSupplier;

impl FallbackSupplier {
    /// The curated top list, truncated to `limit`.
    pub fn top_coins(&self, limit: usize) -> Vec<MarketRecord> {
        CURATED
            .iter()
            .take(limit)
            .map(|asset| self.record_for_curated(asset))
            .collect()
    }

    /// One record per requested id: curated values where known, bounded
    /// placeholders otherwise.
    pub fn coin_prices(&self, ids: &[String]) -> Vec<MarketRecord> {
        ids.iter().map(|id| self.record_for_id(id)).collect()
    }

    /// A detail-shaped record stating that data is unavailable.
    pub fn coin_detail(&self, id: &str) -> CoinDetail {
        let record = self.record_for_id(id);
        CoinDetail {
            id: record.id,
            symbol: record.symbol,
            name: record.name,
            image_url: None,
            description: Some(UNAVAILABLE_DESCRIPTION.to_string()),
            homepage: None,
            current_price_usd: record.current_price_usd,
            price_change_pct_24h: record.price_change_pct_24h,
            price_change_pct_7d: None,
            price_change_pct_30d: None,
            market_cap_usd: record.market_cap_usd,
            total_volume_usd: record.total_volume_usd,
            market_cap_rank: record.market_cap_rank,
            last_updated: Utc::now(),
            is_fallback: true,
        }
    }

    /// A synthetic daily price series: exactly `days + 1` points, one day
    /// apart, following a bounded random walk around the asset's seed
    /// price. Deterministic for a given `(id, days)` pair.
    pub fn price_history(&self, id: &str, days: u32) -> PriceSeries {
        let seed_price = self.seed_price(id);
        let mut rng = StdRng::seed_from_u64(id_hash(id) ^ u64::from(days));

        let end = Utc::now();
        let mut points = Vec::with_capacity(days as usize + 1);
        let mut price = seed_price;
        for i in 0..=days {
            let timestamp = end - chrono::Duration::days(i64::from(days - i));
            points.push(PricePoint {
                timestamp,
                price_usd: price,
            });
            let step: f64 = rng.gen_range(-0.03..0.03);
            price = (price * (1.0 + step)).clamp(seed_price * 0.5, seed_price * 1.5);
        }

        PriceSeries {
            id: id.to_string(),
            days,
            points,
            is_fallback: true,
        }
    }

    fn record_for_curated(&self, asset: &CuratedAsset) -> MarketRecord {
        MarketRecord {
            id: asset.id.to_string(),
            symbol: asset.symbol.to_string(),
            name: asset.name.to_string(),
            image_url: None,
            current_price_usd: asset.price_usd,
            price_change_pct_24h: Some(asset.change_pct_24h),
            price_change_pct_7d: None,
            price_change_pct_30d: None,
            market_cap_usd: asset.market_cap_usd,
            total_volume_usd: asset.total_volume_usd,
            market_cap_rank: Some(asset.rank),
            last_updated: Utc::now(),
            is_fallback: true,
        }
    }

    fn record_for_id(&self, id: &str) -> MarketRecord {
        if let Some(asset) = CURATED.iter().find(|a| a.id == id) {
            return self.record_for_curated(asset);
        }

        // Unknown asset: a bounded placeholder derived from the id so
        // repeated calls agree with each other.
        let price = self.seed_price(id);
        MarketRecord {
            id: id.to_string(),
            symbol: id.chars().take(4).collect(),
            name: id.to_string(),
            image_url: None,
            current_price_usd: price,
            price_change_pct_24h: None,
            price_change_pct_7d: None,
            price_change_pct_30d: None,
            market_cap_usd: 0.0,
            total_volume_usd: 0.0,
            market_cap_rank: None,
            last_updated: Utc::now(),
            is_fallback: true,
        }
    }

    /// Anchor price for an asset: curated where known, otherwise derived
    /// from the id hash and bounded to (0, 100].
    fn seed_price(&self, id: &str) -> f64 {
        CURATED
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.price_usd)
            .unwrap_or_else(|| 0.01 + (id_hash(id) % 10_000) as f64 / 100.0)
    }
}

/// FNV-1a fold of the id, stable across runs and platforms.
fn id_hash(id: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in id.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_coins_are_flagged_and_truncated() {
        let supplier = FallbackSupplier;

        let records = supplier.top_coins(5);
        assert_eq!(records.len(), 5);
        assert!(records.iter().all(|r| r.is_fallback));
        assert_eq!(records[0].id, "bitcoin");

        // Asking for more than the curated list yields the whole list.
        assert_eq!(supplier.top_coins(100).len(), CURATED.len());
    }

    #[test]
    fn prices_cover_every_requested_id() {
        let supplier = FallbackSupplier;
        let ids = vec![
            "bitcoin".to_string(),
            "some-obscure-token".to_string(),
            "ethereum".to_string(),
        ];

        let records = supplier.coin_prices(&ids);
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.is_fallback));
        assert!(records.iter().all(|r| r.current_price_usd > 0.0));
        assert_eq!(records[0].current_price_usd, 64_000.0);
    }

    #[test]
    fn unknown_id_placeholder_is_deterministic_and_bounded() {
        let supplier = FallbackSupplier;

        let a = supplier.coin_prices(&["mystery-coin".to_string()]);
        let b = supplier.coin_prices(&["mystery-coin".to_string()]);
        assert_eq!(a[0].current_price_usd, b[0].current_price_usd);
        assert!(a[0].current_price_usd > 0.0);
        assert!(a[0].current_price_usd <= 100.01);
    }

    #[test]
    fn detail_states_data_unavailable() {
        let supplier = FallbackSupplier;
        let detail = supplier.coin_detail("bitcoin");

        assert!(detail.is_fallback);
        assert!(detail
            .description
            .as_deref()
            .unwrap()
            .contains("temporarily unavailable"));
    }

    #[test]
    fn history_has_exact_length_and_increasing_timestamps() {
        let supplier = FallbackSupplier;
        let series = supplier.price_history("bitcoin", 30);

        assert!(series.is_fallback);
        assert_eq!(series.points.len(), 31);
        for pair in series.points.windows(2) {
            assert!(pair[1].timestamp > pair[0].timestamp);
        }
    }

    #[test]
    fn history_walk_is_deterministic_and_bounded() {
        let supplier = FallbackSupplier;
        let a = supplier.price_history("ethereum", 90);
        let b = supplier.price_history("ethereum", 90);

        let prices_a: Vec<f64> = a.points.iter().map(|p| p.price_usd).collect();
        let prices_b: Vec<f64> = b.points.iter().map(|p| p.price_usd).collect();
        assert_eq!(prices_a, prices_b);

        let seed = 3_100.0;
        assert!(prices_a
            .iter()
            .all(|p| (seed * 0.5..=seed * 1.5).contains(p)));
    }

    #[test]
    fn zero_day_history_still_has_one_point() {
        let supplier = FallbackSupplier;
        let series = supplier.price_history("bitcoin", 0);
        assert_eq!(series.points.len(), 1);
    }
}
