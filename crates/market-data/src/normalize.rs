//! Canonical normalization helpers shared by all provider adapters.
//!
//! Upstreams disagree on field names, number encodings, and identifier
//! spaces. Every adapter funnels its raw payloads through these helpers so
//! the rest of the system only ever sees one shape: a malformed single
//! field is coerced, never allowed to fail a whole batch, and consumers
//! never see a provider-specific coin id.

use chrono::{DateTime, Utc};

use crate::errors::FetchError;
use crate::models::{PricePoint, PriceSeries};

/// Coerce an optional numeric field that must be finite and non-negative
/// (prices, caps, volumes). Missing, NaN, or negative values become 0.
pub(crate) fn non_negative(value: Option<f64>) -> f64 {
    value
        .filter(|v| v.is_finite())
        .map(|v| v.max(0.0))
        .unwrap_or(0.0)
}

/// Pass through a percentage-change field, dropping non-finite garbage.
/// Percentages may legitimately be negative; absence stays `None`.
pub(crate) fn pct_change(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Parse a string-encoded float (CoinCap encodes every number as a string).
pub(crate) fn parse_str_f64(value: Option<&str>) -> Option<f64> {
    value.and_then(|s| s.trim().parse::<f64>().ok())
}

/// Parse a string-encoded unsigned integer (e.g. CoinCap's `rank`).
pub(crate) fn parse_str_u32(value: Option<&str>) -> Option<u32> {
    value.and_then(|s| s.trim().parse::<u32>().ok())
}

/// Parse an RFC 3339 timestamp, defaulting to now when absent or mangled.
pub(crate) fn parse_rfc3339(value: Option<&str>) -> DateTime<Utc> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// Map a provider-reported coin id into the canonical id space.
///
/// The canonical space follows the primary provider's slugs ("bitcoin",
/// "binancecoin", ...); secondary providers that spell a handful of majors
/// differently are folded in here.
pub(crate) fn canonical_id(raw: &str) -> String {
    let raw = raw.trim().to_ascii_lowercase();
    match raw.as_str() {
        "binance-coin" => "binancecoin".to_string(),
        "xrp" => "ripple".to_string(),
        "avalanche" => "avalanche-2".to_string(),
        "multi-collateral-dai" => "dai".to_string(),
        _ => raw,
    }
}

/// Inverse of [`canonical_id`] for building CoinCap query paths.
pub(crate) fn coincap_query_id(canonical: &str) -> &str {
    match canonical {
        "binancecoin" => "binance-coin",
        "ripple" => "xrp",
        "avalanche-2" => "avalanche",
        "dai" => "multi-collateral-dai",
        other => other,
    }
}

/// Shape raw history points into the canonical daily series.
///
/// Whatever granularity the upstream returned, the output always has
/// exactly `days + 1` points spaced one day apart and ending at the newest
/// observation, each carrying the latest price known at that instant.
/// Unusable input (no finite points at all) is a shape-validation failure.
pub(crate) fn shape_daily_series(
    id: &str,
    days: u32,
    mut raw: Vec<PricePoint>,
) -> Result<PriceSeries, FetchError> {
    raw.retain(|p| p.price_usd.is_finite() && p.price_usd >= 0.0);
    raw.sort_by_key(|p| p.timestamp);

    let Some(newest) = raw.last() else {
        return Err(FetchError::EmptyResponse {
            message: format!("no usable history points for '{id}'"),
        });
    };
    let end = newest.timestamp;

    let mut points = Vec::with_capacity(days as usize + 1);
    for i in 0..=days {
        let target = end - chrono::Duration::days(i64::from(days - i));
        let price = raw
            .iter()
            .rev()
            .find(|p| p.timestamp <= target)
            .map(|p| p.price_usd)
            .unwrap_or(raw[0].price_usd);
        points.push(PricePoint {
            timestamp: target,
            price_usd: price,
        });
    }

    Ok(PriceSeries {
        id: id.to_string(),
        days,
        points,
        is_fallback: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(day: i64, price: f64) -> PricePoint {
        PricePoint {
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::days(day),
            price_usd: price,
        }
    }

    #[test]
    fn non_negative_coerces_missing_and_negative() {
        assert_eq!(non_negative(None), 0.0);
        assert_eq!(non_negative(Some(-5.0)), 0.0);
        assert_eq!(non_negative(Some(f64::NAN)), 0.0);
        assert_eq!(non_negative(Some(12.5)), 12.5);
    }

    #[test]
    fn pct_change_keeps_negatives_and_absence() {
        assert_eq!(pct_change(Some(-3.2)), Some(-3.2));
        assert_eq!(pct_change(None), None);
        assert_eq!(pct_change(Some(f64::INFINITY)), None);
    }

    #[test]
    fn parses_string_encoded_numbers() {
        assert_eq!(parse_str_f64(Some("29021.45")), Some(29021.45));
        assert_eq!(parse_str_f64(Some(" 1.5 ")), Some(1.5));
        assert_eq!(parse_str_f64(Some("n/a")), None);
        assert_eq!(parse_str_f64(None), None);
        assert_eq!(parse_str_u32(Some("3")), Some(3));
        assert_eq!(parse_str_u32(Some("-1")), None);
    }

    #[test]
    fn canonical_id_folds_known_aliases() {
        assert_eq!(canonical_id("binance-coin"), "binancecoin");
        assert_eq!(canonical_id("XRP"), "ripple");
        assert_eq!(canonical_id("bitcoin"), "bitcoin");
        assert_eq!(coincap_query_id("binancecoin"), "binance-coin");
        assert_eq!(coincap_query_id("bitcoin"), "bitcoin");
    }

    #[test]
    fn daily_series_has_exact_point_count() {
        let raw: Vec<_> = (0..=30).map(|d| point(d, 100.0 + d as f64)).collect();
        let series = shape_daily_series("bitcoin", 30, raw).unwrap();

        assert_eq!(series.points.len(), 31);
        for pair in series.points.windows(2) {
            assert!(pair[1].timestamp > pair[0].timestamp);
        }
        assert_eq!(series.points.last().unwrap().price_usd, 130.0);
    }

    #[test]
    fn sparse_input_is_forward_filled() {
        // Only three observations across a 7-day window.
        let raw = vec![point(0, 10.0), point(3, 13.0), point(7, 17.0)];
        let series = shape_daily_series("bitcoin", 7, raw).unwrap();

        assert_eq!(series.points.len(), 8);
        // Day 1 and 2 carry the last known price from day 0.
        assert_eq!(series.points[1].price_usd, 10.0);
        assert_eq!(series.points[2].price_usd, 10.0);
        assert_eq!(series.points[3].price_usd, 13.0);
        assert_eq!(series.points[7].price_usd, 17.0);
    }

    #[test]
    fn unsorted_input_is_handled() {
        let raw = vec![point(7, 17.0), point(0, 10.0), point(3, 13.0)];
        let series = shape_daily_series("bitcoin", 7, raw).unwrap();
        assert_eq!(series.points[0].price_usd, 10.0);
        assert_eq!(series.points[7].price_usd, 17.0);
    }

    #[test]
    fn empty_input_is_a_shape_failure() {
        let result = shape_daily_series("bitcoin", 7, Vec::new());
        assert!(matches!(result, Err(FetchError::EmptyResponse { .. })));

        let garbage = vec![point(0, f64::NAN)];
        let result = shape_daily_series("bitcoin", 7, garbage);
        assert!(matches!(result, Err(FetchError::EmptyResponse { .. })));
    }
}
