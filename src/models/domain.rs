use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user record as exposed by the REST API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl User {
    /// Build a user with a freshly generated id
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Request id assigned to every inbound request by the tracing middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_gets_unique_id() {
        let a = User::new("Alice", "alice@example.com");
        let b = User::new("Alice", "alice@example.com");

        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
    }

    #[test]
    fn test_user_json_shape() {
        let user = User {
            id: "42".to_string(),
            name: "Bob".to_string(),
            email: "bob@example.com".to_string(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], "42");
        assert_eq!(json["name"], "Bob");
        assert_eq!(json["email"], "bob@example.com");
    }
}
