//! Single-lane request queue with rate-limit spacing.
//!
//! All outbound upstream calls are funneled through one FIFO queue drained
//! by a single worker task. Only one request is ever in flight, so the
//! minimum inter-request spacing is enforced by construction no matter how
//! many consumers call concurrently. Callers get a future resolved when
//! their job eventually executes; the job outcome is recorded on the
//! shared circuit breaker.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use log::{debug, warn};
use rand::Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use super::CircuitBreaker;
use crate::errors::FetchError;

/// How a drained job ended, as seen by the worker.
enum JobOutcome {
    /// The job ran and succeeded.
    Success,
    /// The job ran and failed; carries a rendering of the error for logs.
    Failure(String),
    /// The job was rejected without running because the circuit is open.
    Skipped,
}

/// A queued unit of work.
///
/// The closure receives the worker's circuit-breaker clearance: on `Err`
/// it must resolve its caller with that error and report `Skipped` instead
/// of touching the network.
struct Job {
    label: String,
    run: Box<dyn FnOnce(Result<(), FetchError>) -> BoxFuture<'static, JobOutcome> + Send>,
}

/// FIFO scheduler serializing all upstream requests.
///
/// Cheap to share behind the client; jobs execute strictly in submission
/// order, one at a time, never concurrently.
pub struct RequestScheduler {
    tx: mpsc::UnboundedSender<Job>,
    breaker: Arc<CircuitBreaker>,
    queue_depth: Arc<AtomicUsize>,
}

impl RequestScheduler {
    /// Create a scheduler and spawn its worker task.
    ///
    /// Must be called from within a Tokio runtime. The worker exits when
    /// the scheduler is dropped.
    pub fn new(
        min_interval: Duration,
        max_jitter: Duration,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue_depth = Arc::new(AtomicUsize::new(0));

        tokio::spawn(run_worker(
            rx,
            min_interval,
            max_jitter,
            Arc::clone(&breaker),
            Arc::clone(&queue_depth),
        ));

        Self {
            tx,
            breaker,
            queue_depth,
        }
    }

    /// Number of jobs waiting in the queue (not yet started).
    pub fn queue_depth(&self) -> usize {
        self.queue_depth.load(Ordering::SeqCst)
    }

    /// Append a job to the queue and await its result.
    ///
    /// Fails fast with `CircuitOpen` while the breaker is tripped, without
    /// entering the queue. Otherwise the job executes once the worker
    /// reaches it and has waited out the rate-limit spacing.
    pub async fn enqueue<T, F, Fut>(&self, label: impl Into<String>, job: F) -> Result<T, FetchError>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        self.breaker.check()?;

        let (reply_tx, reply_rx) = oneshot::channel();
        let run = Box::new(
            move |clearance: Result<(), FetchError>| -> BoxFuture<'static, JobOutcome> {
                Box::pin(async move {
                    if let Err(e) = clearance {
                        let _ = reply_tx.send(Err(e));
                        return JobOutcome::Skipped;
                    }
                    match job().await {
                        Ok(value) => {
                            let _ = reply_tx.send(Ok(value));
                            JobOutcome::Success
                        }
                        Err(e) => {
                            let summary = e.to_string();
                            let _ = reply_tx.send(Err(e));
                            JobOutcome::Failure(summary)
                        }
                    }
                })
            },
        );

        self.queue_depth.fetch_add(1, Ordering::SeqCst);
        if self
            .tx
            .send(Job {
                label: label.into(),
                run,
            })
            .is_err()
        {
            self.queue_depth.fetch_sub(1, Ordering::SeqCst);
            return Err(FetchError::Canceled);
        }

        reply_rx.await.unwrap_or(Err(FetchError::Canceled))
    }
}

/// Worker loop draining the queue.
async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Job>,
    min_interval: Duration,
    max_jitter: Duration,
    breaker: Arc<CircuitBreaker>,
    queue_depth: Arc<AtomicUsize>,
) {
    let mut last_request: Option<Instant> = None;

    while let Some(job) = rx.recv().await {
        queue_depth.fetch_sub(1, Ordering::SeqCst);

        // Jobs accepted while the lane was healthy must not keep hammering
        // an upstream whose circuit has since opened.
        let clearance = breaker.check();

        if clearance.is_ok() {
            if let Some(last) = last_request {
                let spacing = min_interval + jitter(max_jitter);
                let elapsed = last.elapsed();
                if spacing > elapsed {
                    debug!(
                        "Scheduler: waiting {:?} before job '{}'",
                        spacing - elapsed,
                        job.label
                    );
                    tokio::time::sleep(spacing - elapsed).await;
                }
            }
            last_request = Some(Instant::now());
        }

        match (job.run)(clearance).await {
            JobOutcome::Success => breaker.record_success(),
            JobOutcome::Failure(summary) => {
                warn!("Scheduler: job '{}' failed: {}", job.label, summary);
                breaker.record_failure();
            }
            JobOutcome::Skipped => {
                debug!("Scheduler: job '{}' rejected, circuit open", job.label);
            }
        }
    }

    debug!("Scheduler: queue closed, worker exiting");
}

/// Small random addition to the spacing wait, avoiding thundering-herd
/// synchronization across client instances.
fn jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let micros = rand::thread_rng().gen_range(0..=max.as_micros() as u64);
    Duration::from_micros(micros)
}
