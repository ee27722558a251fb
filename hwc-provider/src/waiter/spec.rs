//! Wait specification: state vocabularies, absence policy and timing.

use std::collections::BTreeSet;
use std::time::Duration;

use thiserror::Error;

/// Initial delay before the first probe.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);
/// Minimum interval between two probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// How a "not found" probe result is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsencePolicy {
    /// The resource is expected to disappear (delete waits).
    Success,
    /// The resource must keep existing (create/update waits).
    Failure,
}

/// Rejected wait specifications.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,

    #[error("no target state given and absence is not accepted as success")]
    NoTarget,

    #[error("state '{0}' is both pending and target")]
    Overlap(String),

    #[error("maximum poll interval {max:?} is below the minimum {min:?}")]
    BackoffBelowFloor { min: Duration, max: Duration },
}

/// Immutable, validated parameters of a single wait.
#[derive(Debug, Clone)]
pub struct WaitSpec {
    pending: BTreeSet<String>,
    target: BTreeSet<String>,
    absence: AbsencePolicy,
    timeout: Duration,
    delay: Duration,
    poll_interval: Duration,
    max_poll_interval: Option<Duration>,
}

impl WaitSpec {
    pub fn builder(timeout: Duration) -> WaitSpecBuilder {
        WaitSpecBuilder {
            pending: BTreeSet::new(),
            target: BTreeSet::new(),
            absence: AbsencePolicy::Failure,
            timeout,
            delay: DEFAULT_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_interval: None,
        }
    }

    pub fn is_pending(&self, label: &str) -> bool {
        self.pending.contains(label)
    }

    pub fn is_target(&self, label: &str) -> bool {
        self.target.contains(label)
    }

    pub fn pending(&self) -> &BTreeSet<String> {
        &self.pending
    }

    pub fn target(&self) -> &BTreeSet<String> {
        &self.target
    }

    pub fn absence(&self) -> AbsencePolicy {
        self.absence
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn max_poll_interval(&self) -> Option<Duration> {
        self.max_poll_interval
    }

    /// Interval to use after `current`. Fixed at the floor unless backoff is enabled,
    /// in which case it doubles up to the ceiling.
    pub(crate) fn next_interval(&self, current: Duration) -> Duration {
        match self.max_poll_interval {
            Some(max) => current.saturating_mul(2).clamp(self.poll_interval, max),
            None => self.poll_interval,
        }
    }

    /// Human-readable list of the states that end the wait successfully.
    pub(crate) fn describe_target(&self) -> String {
        let mut states: Vec<&str> = self.target.iter().map(String::as_str).collect();
        if self.absence == AbsencePolicy::Success {
            states.push("<deleted>");
        }
        states.join(", ")
    }
}

/// Builder for [`WaitSpec`].
#[derive(Debug, Clone)]
pub struct WaitSpecBuilder {
    pending: BTreeSet<String>,
    target: BTreeSet<String>,
    absence: AbsencePolicy,
    timeout: Duration,
    delay: Duration,
    poll_interval: Duration,
    max_poll_interval: Option<Duration>,
}

impl WaitSpecBuilder {
    pub fn pending<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.extend(states.into_iter().map(Into::into));
        self
    }

    pub fn target<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target.extend(states.into_iter().map(Into::into));
        self
    }

    pub fn absence(mut self, policy: AbsencePolicy) -> Self {
        self.absence = policy;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Enable exponential backoff between probes, capped at `max`.
    pub fn backoff(mut self, max: Duration) -> Self {
        self.max_poll_interval = Some(max);
        self
    }

    pub fn build(self) -> Result<WaitSpec, SpecError> {
        if self.timeout.is_zero() {
            return Err(SpecError::ZeroTimeout);
        }
        if self.poll_interval.is_zero() {
            return Err(SpecError::ZeroPollInterval);
        }
        if self.target.is_empty() && self.absence == AbsencePolicy::Failure {
            return Err(SpecError::NoTarget);
        }
        if let Some(state) = self.pending.intersection(&self.target).next() {
            return Err(SpecError::Overlap(state.clone()));
        }
        if let Some(max) = self.max_poll_interval {
            if max < self.poll_interval {
                return Err(SpecError::BackoffBelowFloor {
                    min: self.poll_interval,
                    max,
                });
            }
        }

        Ok(WaitSpec {
            pending: self.pending,
            target: self.target,
            absence: self.absence,
            timeout: self.timeout,
            delay: self.delay,
            poll_interval: self.poll_interval,
            max_poll_interval: self.max_poll_interval,
        })
    }
}
