//! hwc-provider: lifecycle drivers for RTS stacks and CCE clusters/nodes.
//!
//! ## Architecture
//!
//! - **Waiter**: polls a probe until the remote resource converges on a target
//!   state, fails, disappears, is cancelled or times out
//! - **Drivers**: one per resource kind; issue the mutating call and wait with
//!   their own pending/target state sets
//! - **Clients**: the API boundary, as traits with a reqwest implementation
//! - **Query**: list-and-filter lookups that must resolve to a single resource

pub mod clients;
pub mod config;
pub mod driver;
pub mod error;
pub mod query;
pub mod waiter;

pub use clients::{CceApi, HttpClient, StackApi, StatusReport};
pub use config::{ApiConfig, Config, TimeoutConfig};
pub use driver::{
    ClusterDriver, Driver, DriverError, NodeCreate, NodeDriver, NodeKey, StackDriver, StackKey,
    Timeouts,
};
pub use error::{ApiError, LookupError};
pub use waiter::{
    wait_for, AbsencePolicy, Converged, FailureKind, PollAttempt, ProbeError, ProbeOutcome,
    WaitFailure, WaitSpec, Waiter,
};
