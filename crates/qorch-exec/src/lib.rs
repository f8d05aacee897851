//! Orchestration passes over the qorch ledger: registration, dispatch, polling,
//! aggregation and metrics.

pub mod aggregate;
pub mod circuit;
pub mod cycle;
pub mod dispatch;
pub mod family;
pub mod keys;
pub mod metrics;
pub mod partition;
pub mod pause;
pub mod poll;
pub mod register;
pub mod simulate;

pub use aggregate::{aggregate_runs, Aggregate};
pub use circuit::{analyze, measure_mapping, CircuitStats};
pub use cycle::{run_cycle, CycleReport};
pub use dispatch::{expand_runs, DispatchReport, Dispatcher};
pub use family::{CodeFamily, CodeSpec};
pub use metrics::{MetricsReport, MetricsStage};
pub use partition::partition_runs;
pub use pause::{Pause, ShutdownSignal};
pub use poll::{PollOutcome, PollReport, PollingEngine};
pub use register::{register_batch, Registration, RegistrationPlan, SourceCircuit};
pub use simulate::{execute_locally, LocalRun};
