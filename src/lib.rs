//! OTel Tutorial - instrumented REST service and staged load-test driver
//!
//! The service exposes a small user API and a CPU-bound computation endpoint,
//! with every request traced, logged as JSON and counted in Prometheus
//! metrics. The `loadtest` module ramps virtual users against that API and
//! reports success and error rates.

pub mod config;
pub mod core;
pub mod error;
pub mod loadtest;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::config::Settings;
pub use crate::core::{fibonacci, fibonacci_checked};
pub use crate::error::ApiError;
pub use crate::loadtest::{LoadPlan, LoadRunner, RunnerConfig, Summary};
pub use crate::models::{CreateUserRequest, FibonacciRequest, User};
pub use crate::routes::AppState;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        assert_eq!(fibonacci(10), 55);
        assert_eq!(LoadPlan::default().peak_target(), 20);
    }
}
