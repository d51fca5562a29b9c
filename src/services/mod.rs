// Service exports
pub mod metrics;
pub mod telemetry;
pub mod user_store;

pub use metrics::{HttpMetrics, InFlightGuard, MetricsError};
pub use telemetry::{init_telemetry, TelemetryError, TelemetryGuard};
pub use user_store::UserStore;
