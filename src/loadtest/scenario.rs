use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

/// Placeholder substituted with the id of the user created earlier in the iteration
pub const USER_ID_PLACEHOLDER: &str = "{user_id}";

/// Id used when the iteration has no created user to look up
pub const MISSING_USER_ID: &str = "404";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// Request payload of a group
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// A fresh `{name, email}` pair, unique per virtual user and iteration
    NewUser,
}

/// A named request plus the checks applied to its response
#[derive(Debug, Clone)]
pub struct RequestGroup {
    pub name: String,
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
    pub expected_status: u16,
    pub max_latency: Duration,
    /// Remember the `id` field of the response for later groups
    pub captures_user_id: bool,
}

impl RequestGroup {
    pub fn get(name: &str, path: &str, expected_status: u16, max_latency: Duration) -> Self {
        Self {
            name: name.to_string(),
            method: Method::Get,
            path: path.to_string(),
            body: RequestBody::Empty,
            expected_status,
            max_latency,
            captures_user_id: false,
        }
    }

    pub fn post(
        name: &str,
        path: &str,
        body: RequestBody,
        expected_status: u16,
        max_latency: Duration,
    ) -> Self {
        Self {
            name: name.to_string(),
            method: Method::Post,
            path: path.to_string(),
            body,
            expected_status,
            max_latency,
            captures_user_id: false,
        }
    }

    pub fn capturing_user_id(mut self) -> Self {
        self.captures_user_id = true;
        self
    }

    /// Path with the user placeholder filled in
    pub fn resolve_path(&self, ctx: &IterationContext) -> String {
        if !self.path.contains(USER_ID_PLACEHOLDER) {
            return self.path.clone();
        }
        let id = ctx.user_id.as_deref().unwrap_or(MISSING_USER_ID);
        self.path.replace(USER_ID_PLACEHOLDER, id)
    }

    pub fn resolve_body(&self, ctx: &IterationContext) -> Option<Value> {
        match &self.body {
            RequestBody::Empty => None,
            RequestBody::Json(value) => Some(value.clone()),
            RequestBody::NewUser => Some(json!({
                "name": format!("Load Test User {}-{}", ctx.vu, ctx.iteration),
                "email": format!("loadtest+{}-{}@example.com", ctx.vu, ctx.iteration),
            })),
        }
    }

    /// Run the group's checks against one response.
    /// `status` is `None` when the request never got a response.
    pub fn evaluate(&self, status: Option<u16>, latency: Duration) -> Vec<CheckResult> {
        let status_ok = status == Some(self.expected_status);
        let latency_ok = status.is_some() && latency < self.max_latency;

        vec![
            CheckResult {
                name: format!("status is {}", self.expected_status),
                passed: status_ok,
            },
            CheckResult {
                name: format!("latency < {}", humantime::format_duration(self.max_latency)),
                passed: latency_ok,
            },
        ]
    }
}

/// Outcome of one boolean check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
}

/// Per-iteration state carried between the groups of one virtual user
#[derive(Debug, Clone, Default)]
pub struct IterationContext {
    pub vu: u32,
    pub iteration: u64,
    pub user_id: Option<String>,
}

impl IterationContext {
    pub fn new(vu: u32, iteration: u64) -> Self {
        Self {
            vu,
            iteration,
            user_id: None,
        }
    }
}

/// The scenario exercised against the tutorial API, in iteration order
pub fn default_groups() -> Vec<RequestGroup> {
    let ms = Duration::from_millis;

    vec![
        RequestGroup::get("health", "/api/health", 200, ms(200)),
        RequestGroup::get("list_users", "/api/users", 200, ms(500)),
        RequestGroup::post("create_user", "/api/users", RequestBody::NewUser, 201, ms(500))
            .capturing_user_id(),
        RequestGroup::get("get_user", "/api/users/{user_id}", 200, ms(500)),
        RequestGroup::post(
            "compute",
            "/api/compute",
            RequestBody::Json(json!({ "n": 20 })),
            200,
            ms(1000),
        ),
        RequestGroup::post(
            "compute_too_large",
            "/api/compute",
            RequestBody::Json(json!({ "n": 60 })),
            500,
            ms(500),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_groups_cover_api() {
        let groups = default_groups();
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();

        assert_eq!(
            names,
            vec!["health", "list_users", "create_user", "get_user", "compute", "compute_too_large"]
        );
        assert!(groups[2].captures_user_id);
        assert_eq!(groups[5].expected_status, 500);
    }

    #[test]
    fn test_resolve_path_uses_created_user() {
        let group = RequestGroup::get("get_user", "/api/users/{user_id}", 200, Duration::from_millis(500));

        let mut ctx = IterationContext::new(1, 0);
        assert_eq!(group.resolve_path(&ctx), "/api/users/404");

        ctx.user_id = Some("abc".to_string());
        assert_eq!(group.resolve_path(&ctx), "/api/users/abc");
    }

    #[test]
    fn test_new_user_body_is_unique() {
        let group = RequestGroup::post(
            "create_user",
            "/api/users",
            RequestBody::NewUser,
            201,
            Duration::from_millis(500),
        );

        let a = group.resolve_body(&IterationContext::new(1, 0)).unwrap();
        let b = group.resolve_body(&IterationContext::new(1, 1)).unwrap();
        assert_ne!(a["email"], b["email"]);
        assert_eq!(a["email"], "loadtest+1-0@example.com");
    }

    #[test]
    fn test_checks() {
        let group = RequestGroup::get("health", "/api/health", 200, Duration::from_millis(200));

        let ok = group.evaluate(Some(200), Duration::from_millis(10));
        assert!(ok.iter().all(|c| c.passed));
        assert_eq!(ok[0].name, "status is 200");
        assert_eq!(ok[1].name, "latency < 200ms");

        let slow = group.evaluate(Some(200), Duration::from_millis(300));
        assert!(slow[0].passed && !slow[1].passed);

        let failed = group.evaluate(None, Duration::from_millis(1));
        assert!(failed.iter().all(|c| !c.passed));
    }
}
