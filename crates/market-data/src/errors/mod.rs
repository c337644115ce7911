//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`FetchError`]: The main error enum for all upstream fetch operations
//! - [`RetryClass`]: Classification for determining failover behavior
//!
//! None of these errors ever reach a consumer of the public facade: the
//! client converts every failure into fallback data at its boundary. They
//! exist for the orchestration layer (retry, failover, circuit breaker) and
//! for diagnostics.

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur while fetching market data from an upstream.
///
/// Each variant is classified into a [`RetryClass`] via the
/// [`retry_class`](Self::retry_class) method, which determines how the
/// provider failover loop should handle the error.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The provider returned HTTP 429 and, once surfaced past the retry
    /// policy, the backoff budget is exhausted.
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// No response within the bounded per-call window.
    /// Not retried by the backoff policy; counts toward the circuit breaker.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// Transport-level failure (DNS, connection refused, TLS).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Any other non-2xx response from the provider.
    #[error("HTTP {status}: {provider}")]
    Http {
        /// The provider that returned the status
        provider: String,
        /// The HTTP status code
        status: u16,
    },

    /// The circuit breaker is open; the request was never sent.
    #[error("Circuit open: upstream calls suspended")]
    CircuitOpen,

    /// A 2xx response whose body failed basic shape validation.
    #[error("Empty response: {message}")]
    EmptyResponse {
        /// Description of the validation failure
        message: String,
    },

    /// The request scheduler was torn down before the job completed.
    #[error("Request scheduler shut down")]
    Canceled,
}

impl FetchError {
    /// Returns the retry classification for this error.
    ///
    /// - [`RetryClass::Backoff`]: retry the same provider with exponential
    ///   backoff (the retry policy handles this before the error surfaces)
    /// - [`RetryClass::NextProvider`]: try the next provider in priority order
    /// - [`RetryClass::Never`]: terminal for this job
    pub fn retry_class(&self) -> RetryClass {
        match self {
            // Rate limiting is retried in place by the backoff policy.
            Self::RateLimited { .. } => RetryClass::Backoff,

            // Transient or provider-local failures - another upstream may
            // still be able to serve the request.
            Self::Timeout { .. }
            | Self::Network(_)
            | Self::Http { .. }
            | Self::EmptyResponse { .. } => RetryClass::NextProvider,

            // The breaker gates the whole lane and the scheduler is shared,
            // so no other provider can help.
            Self::CircuitOpen | Self::Canceled => RetryClass::Never,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_is_backoff() {
        let error = FetchError::RateLimited {
            provider: "COINGECKO".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Backoff);
    }

    #[test]
    fn timeout_tries_next_provider() {
        let error = FetchError::Timeout {
            provider: "COINGECKO".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::NextProvider);
    }

    #[test]
    fn http_error_tries_next_provider() {
        let error = FetchError::Http {
            provider: "COINCAP".to_string(),
            status: 500,
        };
        assert_eq!(error.retry_class(), RetryClass::NextProvider);
    }

    #[test]
    fn empty_response_tries_next_provider() {
        let error = FetchError::EmptyResponse {
            message: "no market rows".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::NextProvider);
    }

    #[test]
    fn circuit_open_never_retries() {
        assert_eq!(FetchError::CircuitOpen.retry_class(), RetryClass::Never);
    }

    #[test]
    fn canceled_never_retries() {
        assert_eq!(FetchError::Canceled.retry_class(), RetryClass::Never);
    }

    #[test]
    fn error_display() {
        let error = FetchError::RateLimited {
            provider: "COINGECKO".to_string(),
        };
        assert_eq!(format!("{}", error), "Rate limited: COINGECKO");

        let error = FetchError::Http {
            provider: "COINCAP".to_string(),
            status: 503,
        };
        assert_eq!(format!("{}", error), "HTTP 503: COINCAP");

        assert_eq!(
            format!("{}", FetchError::CircuitOpen),
            "Circuit open: upstream calls suspended"
        );
    }
}
