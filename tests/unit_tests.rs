// Unit tests for the public library API

use otel_tutorial::core::{fibonacci, fibonacci_checked, ComputeError, DEFAULT_MAX_N};
use otel_tutorial::loadtest::{
    default_groups, IterationContext, LoadPlan, PlanError, Rate, Sample, Stage, Stats, Thresholds,
};
use otel_tutorial::loadtest::stats::RunInfo;
use otel_tutorial::services::UserStore;
use std::time::Duration;

#[test]
fn test_fibonacci_sequence_prefix() {
    let prefix: Vec<u64> = (0..10).map(fibonacci).collect();
    assert_eq!(prefix, vec![0, 1, 1, 2, 3, 5, 8, 13, 21, 34]);
}

#[test]
fn test_fibonacci_limit_boundary() {
    assert!(fibonacci_checked(0, DEFAULT_MAX_N).is_ok());
    assert_eq!(
        fibonacci_checked(DEFAULT_MAX_N + 1, DEFAULT_MAX_N),
        Err(ComputeError::TooLarge { n: 51, max: 50 })
    );
}

#[test]
fn test_plan_ramp_matches_stages() {
    let plan: LoadPlan = "10s:10,20s:10,10s:0".parse().unwrap();

    let samples: Vec<u32> = [0, 2, 5, 10, 20, 30, 35, 40]
        .iter()
        .map(|s| plan.target_at(Duration::from_secs(*s)))
        .collect();

    assert_eq!(samples, vec![0, 2, 5, 10, 10, 10, 5, 0]);
}

#[test]
fn test_plan_rejects_bad_input() {
    assert!(matches!("".parse::<LoadPlan>(), Err(PlanError::Empty)));
    assert!(matches!("10s".parse::<LoadPlan>(), Err(PlanError::InvalidStage(_))));
    assert!(LoadPlan::new(vec![Stage::new(Duration::from_secs(1), 1)]).is_ok());
}

#[test]
fn test_every_default_group_has_two_checks() {
    let ctx = IterationContext::new(0, 0);
    for group in default_groups() {
        let checks = group.evaluate(Some(group.expected_status), Duration::from_millis(1));
        assert_eq!(checks.len(), 2, "group {}", group.name);
        assert!(checks.iter().all(|c| c.passed));
        assert!(group.resolve_path(&ctx).starts_with("/api/"));
    }
}

#[test]
fn test_stats_success_and_error_rates() {
    let mut stats = Stats::default();
    let outcomes = [(Some(201), true), (Some(201), true), (Some(500), false), (None, false)];

    for (status, expected) in outcomes {
        stats.record(Sample {
            group: "create_user".to_string(),
            status,
            latency: Duration::from_millis(20),
            expected,
            checks_passed: if expected { 2 } else { 0 },
            checks_failed: if expected { 0 } else { 2 },
        });
    }

    let summary = stats.summarize(
        RunInfo {
            duration: Duration::from_secs(1),
            iterations: 4,
            peak_vus: 1,
        },
        &Thresholds::default(),
    );

    assert_eq!(summary.total_requests, 4);
    assert_eq!(summary.transport_errors, 1);
    assert_eq!(summary.checks, Rate { passes: 4, total: 8 });
    assert!((summary.success_rate - 0.5).abs() < 1e-9);
    assert!((summary.error_rate - 0.5).abs() < 1e-9);
    assert!(!summary.thresholds_passed());

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["groups"][0]["name"], "create_user");
    assert_eq!(json["peak_vus"], 1);
}

#[test]
fn test_user_store_round_trip() {
    tokio_test::block_on(async {
        let store = UserStore::with_seed_users(10);
        let user = store.create("Dana", "dana@example.com").await;

        assert_eq!(store.get(&user.id).await, Some(user));
        assert_eq!(store.len().await, 3);
    });
}
