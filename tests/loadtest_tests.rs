// Load runner tests against a mock API

use mockito::{Matcher, Server};
use otel_tutorial::loadtest::{LoadPlan, LoadRunner, RequestBody, RequestGroup, RunnerConfig};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

fn quick_config(base_url: String, plan: &str) -> RunnerConfig {
    let mut config = RunnerConfig::new(base_url, plan.parse::<LoadPlan>().unwrap());
    config.think_time = Duration::from_millis(50);
    config.tick = Duration::from_millis(20);
    config.request_timeout = Duration::from_secs(2);
    config.graceful_stop = Duration::from_secs(5);
    config
}

#[tokio::test]
async fn test_default_scenario_against_healthy_api() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/api/health")
        .with_status(200)
        .with_body(r#"{"status":"healthy"}"#)
        .expect_at_least(1)
        .create_async()
        .await;
    server
        .mock("GET", "/api/users")
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;
    server
        .mock("POST", "/api/users")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"u-1","name":"Load","email":"load@example.com"}"#)
        .create_async()
        .await;
    let get_user = server
        .mock("GET", "/api/users/u-1")
        .with_status(200)
        .with_body(r#"{"id":"u-1","name":"Load","email":"load@example.com"}"#)
        .expect_at_least(1)
        .create_async()
        .await;
    server
        .mock("POST", "/api/compute")
        .match_body(Matcher::PartialJson(json!({ "n": 20 })))
        .with_status(200)
        .with_body(r#"{"n":20,"result":6765}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/api/compute")
        .match_body(Matcher::PartialJson(json!({ "n": 60 })))
        .with_status(500)
        .with_body(r#"{"error":"compute_error"}"#)
        .create_async()
        .await;

    let runner = LoadRunner::new(quick_config(server.url(), "0s:2,1s:2")).unwrap();
    let summary = runner.run().await.unwrap();

    get_user.assert_async().await;
    assert!(summary.total_requests >= 6, "expected at least one iteration");
    assert!(summary.iterations >= 1);
    assert_eq!(summary.peak_vus, 2);
    assert_eq!(summary.transport_errors, 0);
    assert_eq!(summary.error_rate, 0.0);
    assert_eq!(summary.success_rate, 1.0);
    assert_eq!(summary.groups.len(), 6);
    assert!(summary.thresholds_passed());
}

#[tokio::test]
async fn test_unexpected_status_counts_as_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/api/health")
        .with_status(503)
        .create_async()
        .await;

    let mut config = quick_config(server.url(), "0s:1,300ms:1");
    config.groups = vec![RequestGroup::get(
        "health",
        "/api/health",
        200,
        Duration::from_millis(500),
    )];

    let summary = LoadRunner::new(config).unwrap().run().await.unwrap();

    assert!(summary.total_requests >= 1);
    assert_eq!(summary.error_rate, 1.0);
    // the latency check still passes, the status check does not
    assert!((summary.success_rate - 0.5).abs() < 1e-9);
    assert!(!summary.thresholds_passed());
}

#[tokio::test]
async fn test_unreachable_target_reports_transport_errors() {
    // Nothing listens on port 9 (discard) in test environments
    let mut config = quick_config("http://127.0.0.1:9".to_string(), "0s:1,200ms:1");
    config.groups = vec![RequestGroup::get(
        "health",
        "/api/health",
        200,
        Duration::from_millis(500),
    )];
    config.request_timeout = Duration::from_millis(200);

    let summary = LoadRunner::new(config).unwrap().run().await.unwrap();

    assert!(summary.total_requests >= 1);
    assert_eq!(summary.transport_errors as usize, summary.total_requests);
    assert_eq!(summary.success_rate, 0.0);
}

/// Virtual user index encoded in a generated `loadtest+{vu}-{iteration}` email
fn vu_of(body: &[u8]) -> Option<u32> {
    let body: Value = serde_json::from_slice(body).ok()?;
    let email = body.get("email")?.as_str()?;
    email.strip_prefix("loadtest+")?.split('-').next()?.parse().ok()
}

#[tokio::test]
async fn test_ramp_down_retires_surplus_virtual_users() {
    let started = Instant::now();
    let arrivals: Arc<Mutex<Vec<(Duration, u32)>>> = Arc::default();

    let mut server = Server::new_async().await;
    let recorded = arrivals.clone();
    server
        .mock("POST", "/api/users")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body_from_request(move |request| {
            if let Some(vu) = request.body().ok().and_then(|body| vu_of(body)) {
                if let Ok(mut arrivals) = recorded.lock() {
                    arrivals.push((started.elapsed(), vu));
                }
            }
            br#"{"id":"u-1","name":"Load","email":"load@example.com"}"#.to_vec()
        })
        .create_async()
        .await;

    // three users for 300ms, then one user for 500ms
    let mut config = quick_config(server.url(), "0s:3,300ms:3,0s:1,500ms:1");
    config.groups = vec![RequestGroup::post(
        "create_user",
        "/api/users",
        RequestBody::NewUser,
        201,
        Duration::from_millis(500),
    )];
    let graceful_stop = config.graceful_stop;

    let summary = LoadRunner::new(config).unwrap().run().await.unwrap();
    let total = started.elapsed();

    assert_eq!(summary.peak_vus, 3);
    assert_eq!(summary.error_rate, 0.0);
    assert!(total < Duration::from_millis(800) + graceful_stop);

    let arrivals = arrivals.lock().unwrap().clone();
    let before_drop: Vec<u32> = arrivals
        .iter()
        .filter(|(at, _)| *at < Duration::from_millis(250))
        .map(|(_, vu)| *vu)
        .collect();
    let after_drop: Vec<u32> = arrivals
        .iter()
        .filter(|(at, _)| *at >= Duration::from_millis(500))
        .map(|(_, vu)| *vu)
        .collect();

    for vu in 0..3 {
        assert!(before_drop.contains(&vu), "vu {vu} never ran before the ramp-down");
    }
    assert!(!after_drop.is_empty(), "requests stopped after the ramp-down");
    assert!(after_drop.iter().all(|vu| *vu == 0), "retired users kept running: {after_drop:?}");
}
