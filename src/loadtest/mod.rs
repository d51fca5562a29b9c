//! Staged load-test driver for the tutorial API.
//!
//! A [`LoadPlan`] of ramp stages decides how many virtual users are active;
//! each virtual user loops over the [`RequestGroup`]s of the scenario and
//! every response is checked for status code and latency. The run ends with a
//! [`Summary`] carrying success rate, error rate and latency percentiles.

pub mod plan;
pub mod runner;
pub mod scenario;
pub mod stats;

pub use plan::{LoadPlan, PlanError, Stage};
pub use runner::{LoadRunner, LoadTestError, RunnerConfig};
pub use scenario::{default_groups, CheckResult, IterationContext, Method, RequestBody, RequestGroup};
pub use stats::{LatencySummary, Rate, Sample, Stats, Summary, Thresholds};
