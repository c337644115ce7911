//! Canonical data shapes consumed by the rest of the system.
//!
//! Providers return heterogeneous payloads; everything is normalized into
//! these types before leaving the crate. Consumers never see a
//! provider-specific identifier or field name.

mod detail;
mod history;
mod record;

pub use detail::CoinDetail;
pub use history::{PricePoint, PriceSeries};
pub use record::MarketRecord;
