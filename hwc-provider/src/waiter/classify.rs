//! Classification of probe outcomes against a wait specification.

use super::probe::ProbeOutcome;
use super::spec::{AbsencePolicy, WaitSpec};
use super::FailureKind;

/// What the poll loop does with one probe outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Converged,
    Continue,
    Fail(FailureKind),
}

pub fn classify<T>(spec: &WaitSpec, outcome: &ProbeOutcome<T>) -> Classification {
    match outcome {
        ProbeOutcome::Observed { label, .. } if spec.is_target(label) => Classification::Converged,
        ProbeOutcome::Observed { label, .. } if spec.is_pending(label) => Classification::Continue,
        ProbeOutcome::Observed { .. } => Classification::Fail(FailureKind::UnexpectedState),
        ProbeOutcome::Absent => match spec.absence() {
            AbsencePolicy::Success => Classification::Converged,
            AbsencePolicy::Failure => Classification::Fail(FailureKind::Absent),
        },
        ProbeOutcome::Error(e) if e.is_retryable() => Classification::Continue,
        ProbeOutcome::Error(_) => Classification::Fail(FailureKind::ProbeError),
    }
}
