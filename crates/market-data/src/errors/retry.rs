/// Classification for failover policy.
///
/// Used to determine how the fetch pipeline should respond to errors from
/// providers.
///
/// # Behavior Summary
///
/// | Class | Retry Same Provider? | Try Next Provider? |
/// |-------|---------------------|--------------------|
/// | `Backoff` | Yes (exponential, bounded) | Yes, once the budget is spent |
/// | `NextProvider` | No | Yes |
/// | `Never` | No | No |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Retry the same provider with exponential backoff.
    ///
    /// Used only for rate limiting (HTTP 429). The retry policy sleeps
    /// `base_delay * 2^attempt` between attempts; once the budget is
    /// exhausted the error surfaces and the failover loop moves on to the
    /// next provider, since rate limits are per-upstream.
    Backoff,

    /// Try the next provider in priority order without retrying this one.
    ///
    /// Used for timeouts, transport errors, non-429 HTTP errors, and
    /// malformed bodies. The provider may be down or misbehaving, but
    /// another upstream can still serve the request.
    NextProvider,

    /// Terminal for this job - no further attempts anywhere.
    ///
    /// An open circuit or a torn-down scheduler gates the whole serialized
    /// lane, so walking the provider list cannot help.
    Never,
}
