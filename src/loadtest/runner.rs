use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::loadtest::plan::LoadPlan;
use crate::loadtest::scenario::{default_groups, IterationContext, Method, RequestGroup};
use crate::loadtest::stats::{RunInfo, Sample, Stats, Summary, Thresholds};

/// Errors that abort a load test run
#[derive(Debug, Error)]
pub enum LoadTestError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Sample aggregator failed: {0}")]
    Aggregator(#[from] tokio::task::JoinError),
}

/// Everything a run needs to know
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub base_url: String,
    pub plan: LoadPlan,
    pub groups: Vec<RequestGroup>,
    /// Pause between two iterations of one virtual user
    pub think_time: Duration,
    pub request_timeout: Duration,
    /// How long virtual users may finish their iteration once the plan ends
    pub graceful_stop: Duration,
    /// Controller resolution for recomputing the target
    pub tick: Duration,
    pub thresholds: Thresholds,
}

impl RunnerConfig {
    pub fn new(base_url: impl Into<String>, plan: LoadPlan) -> Self {
        Self {
            base_url: base_url.into(),
            plan,
            groups: default_groups(),
            think_time: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
            graceful_stop: Duration::from_secs(30),
            tick: Duration::from_millis(100),
            thresholds: Thresholds::default(),
        }
    }
}

/// Drives virtual users through the scenario according to the ramp plan
///
/// A controller loop publishes the current target on a watch channel. The
/// virtual user with index `i` keeps iterating while `i < target`, so
/// lowering the target retires the highest indices first. Samples stream
/// through an mpsc channel into a single aggregator task.
pub struct LoadRunner {
    config: RunnerConfig,
    client: Client,
}

struct VuShared {
    client: Client,
    base_url: String,
    groups: Vec<RequestGroup>,
    think_time: Duration,
    iterations: AtomicU64,
}

impl LoadRunner {
    pub fn new(config: RunnerConfig) -> Result<Self, LoadTestError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("otel-tutorial-loadtest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<Summary, LoadTestError> {
        let plan = &self.config.plan;
        let total = plan.total_duration();
        info!(
            base_url = %self.config.base_url,
            plan = %plan,
            duration = %humantime::format_duration(total),
            "Starting load test"
        );

        let (sample_tx, mut sample_rx) = mpsc::unbounded_channel::<Sample>();
        let (target_tx, target_rx) = watch::channel(0u32);

        let aggregator = tokio::spawn(async move {
            let mut stats = Stats::default();
            while let Some(sample) = sample_rx.recv().await {
                stats.record(sample);
            }
            stats
        });

        let shared = Arc::new(VuShared {
            client: self.client.clone(),
            base_url: self.config.base_url.trim_end_matches('/').to_string(),
            groups: self.config.groups.clone(),
            think_time: self.config.think_time,
            iterations: AtomicU64::new(0),
        });

        let mut running: HashMap<u32, JoinHandle<()>> = HashMap::new();
        let mut peak_vus = 0u32;
        let mut last_target = 0u32;
        let start = Instant::now();
        let mut ticker = tokio::time::interval(self.config.tick);

        loop {
            ticker.tick().await;
            let elapsed = start.elapsed();
            if elapsed >= total {
                break;
            }

            let target = plan.target_at(elapsed);
            target_tx.send_replace(target);
            if target != last_target {
                debug!(target, elapsed_ms = elapsed.as_millis() as u64, "Virtual user target changed");
                last_target = target;
            }

            running.retain(|_, handle| !handle.is_finished());
            for vu in 0..target {
                running.entry(vu).or_insert_with(|| {
                    tokio::spawn(run_virtual_user(
                        vu,
                        shared.clone(),
                        target_rx.clone(),
                        sample_tx.clone(),
                    ))
                });
            }
            peak_vus = peak_vus.max(running.len() as u32);
        }

        target_tx.send_replace(0);
        drop(sample_tx);

        let handles: Vec<JoinHandle<()>> = running.into_values().collect();
        let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
        let drain = futures::future::join_all(handles);
        if tokio::time::timeout(self.config.graceful_stop, drain).await.is_err() {
            warn!("Graceful stop expired, aborting remaining virtual users");
            for abort in aborts {
                abort.abort();
            }
        }

        let stats = aggregator.await?;
        let run = RunInfo {
            duration: start.elapsed(),
            iterations: shared.iterations.load(Ordering::Relaxed),
            peak_vus,
        };
        info!(requests = stats.total_requests(), iterations = run.iterations, "Load test finished");

        Ok(stats.summarize(run, &self.config.thresholds))
    }
}

async fn run_virtual_user(
    vu: u32,
    shared: Arc<VuShared>,
    mut target_rx: watch::Receiver<u32>,
    samples: mpsc::UnboundedSender<Sample>,
) {
    debug!(vu, "Virtual user started");
    let mut iteration = 0u64;

    loop {
        if *target_rx.borrow() <= vu {
            break;
        }

        let mut ctx = IterationContext::new(vu, iteration);
        for group in &shared.groups {
            let sample = execute_group(&shared, group, &mut ctx).await;
            if samples.send(sample).is_err() {
                return;
            }
        }
        shared.iterations.fetch_add(1, Ordering::Relaxed);
        iteration += 1;

        // Sleep between iterations, but leave early when retired
        tokio::select! {
            _ = tokio::time::sleep(shared.think_time) => {}
            _ = target_rx.wait_for(|target| *target <= vu) => break,
        }
    }

    debug!(vu, iterations = iteration, "Virtual user stopped");
}

async fn execute_group(shared: &VuShared, group: &RequestGroup, ctx: &mut IterationContext) -> Sample {
    let url = format!("{}{}", shared.base_url, group.resolve_path(ctx));
    let mut request = match group.method {
        Method::Get => shared.client.get(&url),
        Method::Post => shared.client.post(&url),
    };
    if let Some(body) = group.resolve_body(ctx) {
        request = request.json(&body);
    }

    let started = Instant::now();
    let status = match request.send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            if group.captures_user_id {
                ctx.user_id = response
                    .json::<Value>()
                    .await
                    .ok()
                    .and_then(|body| body.get("id").and_then(Value::as_str).map(str::to_owned));
            } else if let Err(e) = response.bytes().await {
                debug!(group = %group.name, "Failed to read response body: {}", e);
            }
            Some(status)
        }
        Err(e) => {
            debug!(group = %group.name, url = %url, "Request failed: {}", e);
            None
        }
    };
    let latency = started.elapsed();

    let checks = group.evaluate(status, latency);
    let checks_passed = checks.iter().filter(|c| c.passed).count() as u32;

    Sample {
        group: group.name.clone(),
        status,
        latency,
        expected: status == Some(group.expected_status),
        checks_passed,
        checks_failed: checks.len() as u32 - checks_passed,
    }
}
