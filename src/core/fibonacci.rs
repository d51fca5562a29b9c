use thiserror::Error;

/// Errors produced by the computation endpoint
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComputeError {
    #[error("n too large (max {max}, got {n})")]
    TooLarge { n: u32, max: u32 },
}

/// Default upper bound for `n`
pub const DEFAULT_MAX_N: u32 = 50;

/// Compute the n-th fibonacci number with the naive doubly-recursive definition.
///
/// The exponential cost is deliberate: the compute endpoint exists to put
/// measurable CPU load behind a span.
pub fn fibonacci(n: u32) -> u64 {
    if n <= 1 {
        return n as u64;
    }
    fibonacci(n - 1) + fibonacci(n - 2)
}

/// Bounds-checked entry point used by the HTTP handler
#[tracing::instrument(level = "debug")]
pub fn fibonacci_checked(n: u32, max_n: u32) -> Result<u64, ComputeError> {
    if n > max_n {
        return Err(ComputeError::TooLarge { n, max: max_n });
    }

    let result = fibonacci(n);
    tracing::debug!(result, "fibonacci computed");
    Ok(result)
}
