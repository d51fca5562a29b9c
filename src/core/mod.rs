// Core algorithm exports
pub mod fibonacci;

pub use fibonacci::{fibonacci, fibonacci_checked, ComputeError, DEFAULT_MAX_N};
