// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{RequestId, User};
pub use requests::{CreateUserRequest, FibonacciRequest};
pub use responses::{ErrorResponse, FibonacciResponse, HealthResponse};
