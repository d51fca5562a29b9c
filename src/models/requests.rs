use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to create a user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Request to compute a fibonacci number
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FibonacciRequest {
    pub n: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_user_validation() {
        let ok = CreateUserRequest {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad_email = CreateUserRequest {
            name: "Alice".to_string(),
            email: "not-an-email".to_string(),
        };
        assert!(bad_email.validate().is_err());

        let empty_name = CreateUserRequest {
            name: String::new(),
            email: "alice@example.com".to_string(),
        };
        assert!(empty_name.validate().is_err());
    }
}
