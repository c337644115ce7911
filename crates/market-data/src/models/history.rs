use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single timestamped price observation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price_usd: f64,
}

/// Daily price series for one asset.
///
/// Invariant: `points.len() == days + 1` with strictly increasing
/// timestamps, whether the series came from an upstream or from the
/// fallback supplier. Chart rendering never needs to special-case either
/// source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriceSeries {
    /// Provider-agnostic asset identifier.
    pub id: String,

    /// Number of trailing days requested.
    pub days: u32,

    /// One point per day plus the current point.
    pub points: Vec<PricePoint>,

    /// True when the series was synthesized locally instead of fetched.
    pub is_fallback: bool,
}
