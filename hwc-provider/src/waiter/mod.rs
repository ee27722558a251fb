//! State convergence waiter.
//!
//! Repeatedly probes a remote resource until its status reaches one of the
//! target states, fails, disappears, is cancelled or the deadline passes.
//! Lifecycle drivers supply the probe and the state vocabulary; the waiter
//! owns timing, classification and cancellation.

mod classify;
mod probe;
mod spec;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use classify::{classify, Classification};
pub use probe::{BoxError, ProbeError, ProbeOutcome};
pub use spec::{
    AbsencePolicy, SpecError, WaitSpec, WaitSpecBuilder, DEFAULT_DELAY, DEFAULT_POLL_INTERVAL,
};

/// Label reported when a delete wait converges because the resource is gone.
pub const DELETED_LABEL: &str = "deleted";

/// Why a wait did not converge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    UnexpectedState,
    Absent,
    ProbeError,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::UnexpectedState => "unexpected state",
            FailureKind::Absent => "resource vanished",
            FailureKind::ProbeError => "probe error",
            FailureKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Successful end of a wait.
#[derive(Debug)]
pub struct Converged<T> {
    /// Last snapshot, `None` when the resource converged by disappearing.
    pub snapshot: Option<T>,
    pub label: String,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Failed end of a wait, with the best diagnostics available.
#[derive(Debug)]
pub struct WaitFailure<T> {
    pub kind: FailureKind,
    /// Last label observed (the offending one for `UnexpectedState`).
    pub label: Option<String>,
    /// Last snapshot observed.
    pub snapshot: Option<T>,
    pub cause: Option<BoxError>,
    pub target: String,
    pub attempts: u32,
    pub elapsed: Duration,
}

impl<T> fmt::Display for WaitFailure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last = self.label.as_deref().unwrap_or("unknown");
        match self.kind {
            FailureKind::Timeout => {
                write!(
                    f,
                    "timeout after {:?} waiting for state [{}] (last state: {})",
                    self.elapsed, self.target, last
                )?;
                if let Some(cause) = &self.cause {
                    write!(f, ", last error: {cause}")?;
                }
                Ok(())
            }
            FailureKind::UnexpectedState => write!(
                f,
                "unexpected state '{}', wanted target [{}]",
                last, self.target
            ),
            FailureKind::Absent => write!(
                f,
                "resource not found while waiting for state [{}] (last state: {})",
                self.target, last
            ),
            FailureKind::ProbeError => match &self.cause {
                Some(cause) => write!(f, "error reading state: {cause}"),
                None => f.write_str("error reading state"),
            },
            FailureKind::Cancelled => {
                write!(f, "wait cancelled (last state: {last})")?;
                if let Some(cause) = &self.cause {
                    write!(f, ", last error: {cause}")?;
                }
                Ok(())
            }
        }
    }
}

impl<T: fmt::Debug> std::error::Error for WaitFailure<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Shape of one probe result, as reported to attempt subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Observed,
    Absent,
    RetryableError,
    FatalError,
}

/// One iteration of the poll loop.
#[derive(Debug, Clone)]
pub struct PollAttempt {
    pub seq: u32,
    pub elapsed: Duration,
    pub label: Option<String>,
    pub outcome: AttemptOutcome,
}

/// Blocks until a probe converges on the configured states.
pub struct Waiter {
    spec: WaitSpec,
    cancel: CancellationToken,
    attempts_tx: Option<mpsc::UnboundedSender<PollAttempt>>,
    resource: String,
}

impl Waiter {
    pub fn new(spec: WaitSpec) -> Self {
        Self {
            spec,
            cancel: CancellationToken::new(),
            attempts_tx: None,
            resource: "resource".to_string(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Receive a [`PollAttempt`] for every probe.
    pub fn with_subscriber(mut self, tx: mpsc::UnboundedSender<PollAttempt>) -> Self {
        self.attempts_tx = Some(tx);
        self
    }

    /// Name used in log lines, e.g. `stack web/8a1f`.
    pub fn describing(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    pub fn spec(&self) -> &WaitSpec {
        &self.spec
    }

    /// Poll `probe` until convergence or failure. Probes never overlap.
    pub async fn wait<T, F, Fut>(self, mut probe: F) -> Result<Converged<T>, WaitFailure<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProbeOutcome<T>>,
    {
        let start = Instant::now();
        let deadline = start + self.spec.timeout();
        let mut poll = PollState::<T>::default();

        debug!(
            "Waiting up to {:?} for {} to reach [{}]",
            self.spec.timeout(),
            self.resource,
            self.spec.describe_target()
        );

        let delay = self.spec.delay().min(self.spec.timeout());
        if !self.sleep(delay).await {
            return Err(self.fail(FailureKind::Cancelled, poll, None, start));
        }

        let mut interval = self.spec.poll_interval();
        loop {
            poll.attempts += 1;

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                outcome = probe() => Some(outcome),
            };
            let Some(outcome) = outcome else {
                return Err(self.fail(FailureKind::Cancelled, poll, None, start));
            };

            self.record(poll.attempts, start, &outcome);

            match (classify(&self.spec, &outcome), outcome) {
                (Classification::Converged, ProbeOutcome::Observed { snapshot, label }) => {
                    info!("{} reached state {}", self.resource, label);
                    return Ok(Converged {
                        snapshot: Some(snapshot),
                        label,
                        attempts: poll.attempts,
                        elapsed: start.elapsed(),
                    });
                }
                (Classification::Converged, _) => {
                    info!("{} no longer exists", self.resource);
                    return Ok(Converged {
                        snapshot: None,
                        label: DELETED_LABEL.to_string(),
                        attempts: poll.attempts,
                        elapsed: start.elapsed(),
                    });
                }
                (Classification::Continue, ProbeOutcome::Observed { snapshot, label }) => {
                    poll.observe(snapshot, label);
                }
                (Classification::Continue, ProbeOutcome::Error(e)) => {
                    warn!("{} busy, retrying: {}", self.resource, e);
                    poll.cause = Some(e.into_cause());
                }
                (Classification::Continue, ProbeOutcome::Absent) => {}
                (Classification::Fail(kind), ProbeOutcome::Observed { snapshot, label }) => {
                    poll.observe(snapshot, label);
                    return Err(self.fail(kind, poll, None, start));
                }
                (Classification::Fail(kind), ProbeOutcome::Error(e)) => {
                    return Err(self.fail(kind, poll, Some(e.into_cause()), start));
                }
                (Classification::Fail(kind), ProbeOutcome::Absent) => {
                    return Err(self.fail(kind, poll, None, start));
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(self.fail(FailureKind::Timeout, poll, None, start));
            }

            if !self.sleep(interval.min(deadline - now)).await {
                return Err(self.fail(FailureKind::Cancelled, poll, None, start));
            }
            interval = self.spec.next_interval(interval);
        }
    }

    /// Returns `false` if cancelled before the sleep finished.
    async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    fn record<T>(&self, seq: u32, start: Instant, outcome: &ProbeOutcome<T>) {
        let attempt = PollAttempt {
            seq,
            elapsed: start.elapsed(),
            label: outcome.label().map(str::to_string),
            outcome: match outcome {
                ProbeOutcome::Observed { .. } => AttemptOutcome::Observed,
                ProbeOutcome::Absent => AttemptOutcome::Absent,
                ProbeOutcome::Error(e) if e.is_retryable() => AttemptOutcome::RetryableError,
                ProbeOutcome::Error(_) => AttemptOutcome::FatalError,
            },
        };

        debug!(
            "{} attempt {} after {:?}: {:?} {}",
            self.resource,
            attempt.seq,
            attempt.elapsed,
            attempt.outcome,
            attempt.label.as_deref().unwrap_or("-")
        );

        if let Some(tx) = &self.attempts_tx {
            let _ = tx.send(attempt);
        }
    }

    fn fail<T>(
        &self,
        kind: FailureKind,
        poll: PollState<T>,
        cause: Option<BoxError>,
        start: Instant,
    ) -> WaitFailure<T> {
        let failure = WaitFailure {
            kind,
            label: poll.label,
            snapshot: poll.snapshot,
            cause: cause.or(poll.cause),
            target: self.spec.describe_target(),
            attempts: poll.attempts,
            elapsed: start.elapsed(),
        };
        warn!("Waiting for {} failed: {}", self.resource, failure);
        failure
    }
}

/// Last thing the loop saw.
struct PollState<T> {
    attempts: u32,
    label: Option<String>,
    snapshot: Option<T>,
    /// Last retryable error, cleared by the next observation.
    cause: Option<BoxError>,
}

impl<T> Default for PollState<T> {
    fn default() -> Self {
        Self {
            attempts: 0,
            label: None,
            snapshot: None,
            cause: None,
        }
    }
}

impl<T> PollState<T> {
    fn observe(&mut self, snapshot: T, label: String) {
        self.snapshot = Some(snapshot);
        self.label = Some(label);
        self.cause = None;
    }
}

/// Wait without cancellation or attempt subscribers.
pub async fn wait_for<T, F, Fut>(spec: WaitSpec, probe: F) -> Result<Converged<T>, WaitFailure<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeOutcome<T>>,
{
    Waiter::new(spec).wait(probe).await
}
