//! Circuit breaker for the serialized upstream lane.
//!
//! Tracks consecutive job failures and temporarily blocks new upstream
//! calls once a threshold is hit. The circuit has three states:
//!
//! - **Closed**: Normal operation, requests are allowed through.
//! - **Open**: The upstream is failing, requests are blocked.
//! - **HalfOpen**: The cool-down elapsed; a probe is allowed through and
//!   its outcome decides whether the circuit closes or reopens.
//!
//! All upstream traffic flows through one scheduler lane, so there is a
//! single process-wide circuit rather than one per provider. State is
//! in-memory and resets on application restart.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::Serialize;

use crate::errors::FetchError;

/// Default number of consecutive failures before opening the circuit.
const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Default time to wait before admitting a probe request.
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(300);

/// Circuit breaker state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum CircuitState {
    /// Normal operation - requests are allowed.
    Closed,
    /// The upstream is failing - requests are blocked.
    Open,
    /// Testing recovery - the next request is allowed through.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open => write!(f, "Open"),
            Self::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit.
    pub failure_threshold: u32,
    /// Time to wait before testing recovery.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

/// Internal circuit state.
#[derive(Debug)]
struct Circuit {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

impl Circuit {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
        }
    }
}

/// Process-wide circuit breaker.
///
/// Thread-safe; shared between the scheduler worker (which records
/// outcomes) and callers enqueueing new jobs (which check clearance).
pub struct CircuitBreaker {
    circuit: Mutex<Circuit>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Create a circuit breaker with default settings.
    pub fn new() -> Self {
        Self::with_config(CircuitBreakerConfig::default())
    }

    /// Create a circuit breaker with custom configuration.
    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self {
            circuit: Mutex::new(Circuit::new()),
            config,
        }
    }

    /// Lock the circuit mutex, recovering from poison if necessary.
    ///
    /// The worst case after recovery is slightly incorrect circuit state,
    /// which is better than panicking.
    fn lock_circuit(&self) -> MutexGuard<'_, Circuit> {
        self.circuit.lock().unwrap_or_else(|poisoned| {
            warn!("Circuit breaker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Check whether a request may proceed.
    ///
    /// Returns `Err(CircuitOpen)` while the circuit is open and the
    /// cool-down has not elapsed. Once it has, the circuit transitions to
    /// `HalfOpen` and the request is admitted as a probe.
    pub fn check(&self) -> Result<(), FetchError> {
        let mut circuit = self.lock_circuit();

        match circuit.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let cooled = circuit
                    .opened_at
                    .map(|at| at.elapsed() >= self.config.cooldown)
                    .unwrap_or(true);

                if cooled {
                    info!("Circuit breaker: cool-down elapsed, admitting probe request");
                    circuit.state = CircuitState::HalfOpen;
                    Ok(())
                } else {
                    Err(FetchError::CircuitOpen)
                }
            }
        }
    }

    /// Record a successful job.
    ///
    /// Resets the failure count and closes the circuit (a half-open probe
    /// that succeeds recovers the lane).
    pub fn record_success(&self) {
        let mut circuit = self.lock_circuit();

        if circuit.state != CircuitState::Closed {
            info!("Circuit breaker: closing circuit after successful request");
        }
        circuit.state = CircuitState::Closed;
        circuit.consecutive_failures = 0;
        circuit.opened_at = None;
    }

    /// Record a failed job.
    ///
    /// Increments the consecutive-failure count and may open the circuit.
    /// A failure while half-open immediately reopens it.
    pub fn record_failure(&self) {
        let mut circuit = self.lock_circuit();

        match circuit.state {
            CircuitState::Closed => {
                circuit.consecutive_failures += 1;
                if circuit.consecutive_failures >= self.config.failure_threshold {
                    warn!(
                        "Circuit breaker: opening circuit after {} consecutive failures",
                        circuit.consecutive_failures
                    );
                    circuit.state = CircuitState::Open;
                    circuit.opened_at = Some(Instant::now());
                } else {
                    debug!(
                        "Circuit breaker: failure {}/{}",
                        circuit.consecutive_failures, self.config.failure_threshold
                    );
                }
            }
            CircuitState::HalfOpen => {
                warn!("Circuit breaker: probe failed, reopening circuit");
                circuit.state = CircuitState::Open;
                circuit.opened_at = Some(Instant::now());
            }
            CircuitState::Open => {
                // Late failure from a job that was already in flight when
                // the circuit opened; nothing further to do.
                debug!("Circuit breaker: additional failure while open");
            }
        }
    }

    /// Current circuit state.
    pub fn state(&self) -> CircuitState {
        self.lock_circuit().state
    }

    /// Current consecutive-failure count.
    pub fn consecutive_failures(&self) -> u32 {
        self.lock_circuit().consecutive_failures
    }

    /// Manually reset the circuit to closed.
    pub fn reset(&self) {
        let mut circuit = self.lock_circuit();
        info!("Circuit breaker: manual reset");
        *circuit = Circuit::new();
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}
