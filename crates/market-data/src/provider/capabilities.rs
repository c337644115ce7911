//! Provider capability declarations.

/// Describes which operations a market data provider can serve.
///
/// Used by the client to skip adapters that cannot handle a request
/// instead of burning a serialized upstream call on a guaranteed failure.
/// Listing and batch-price support is mandatory for every adapter, so only
/// the optional surfaces are declared here.
#[derive(Clone, Copy, Debug)]
pub struct ProviderCapabilities {
    /// Whether the provider exposes a rich per-asset detail endpoint
    /// (description, links, imagery).
    pub supports_detail: bool,

    /// Whether the provider exposes historical price data.
    pub supports_history: bool,
}

impl Default for ProviderCapabilities {
    fn default() -> Self {
        Self {
            supports_detail: true,
            supports_history: true,
        }
    }
}
