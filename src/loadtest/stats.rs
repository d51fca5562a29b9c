use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// One completed request as seen by a virtual user
#[derive(Debug, Clone)]
pub struct Sample {
    pub group: String,
    /// `None` when the request failed before a response arrived
    pub status: Option<u16>,
    pub latency: Duration,
    /// Whether the status matched the group's expectation
    pub expected: bool,
    pub checks_passed: u32,
    pub checks_failed: u32,
}

/// Fraction of passing events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rate {
    pub passes: u64,
    pub total: u64,
}

impl Rate {
    pub fn add(&mut self, passed: bool) {
        self.add_many(u64::from(passed), 1);
    }

    pub fn add_many(&mut self, passes: u64, total: u64) {
        self.passes += passes;
        self.total += total;
    }

    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.passes as f64 / self.total as f64
    }
}

/// Latency distribution in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: usize,
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

impl LatencySummary {
    pub fn from_latencies(latencies: &[Duration]) -> Self {
        if latencies.is_empty() {
            return Self::default();
        }

        let mut sorted: Vec<f64> = latencies.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let sum: f64 = sorted.iter().sum();
        Self {
            count: sorted.len(),
            min_ms: sorted[0],
            max_ms: sorted[sorted.len() - 1],
            mean_ms: sum / sorted.len() as f64,
            p50_ms: percentile(&sorted, 50.0),
            p90_ms: percentile(&sorted, 90.0),
            p95_ms: percentile(&sorted, 95.0),
            p99_ms: percentile(&sorted, 99.0),
        }
    }
}

/// Nearest-rank percentile over an ascending, non-empty slice
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (pct * sorted.len() as f64 / 100.0).ceil() as usize;
    let index = rank.clamp(1, sorted.len()) - 1;
    sorted[index]
}

/// Pass/fail limits evaluated at the end of a run
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub max_error_rate: f64,
    pub p95_latency: Duration,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_error_rate: 0.1,
            p95_latency: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Default)]
struct GroupStats {
    latencies: Vec<Duration>,
    errors: Rate,
    checks: Rate,
}

impl GroupStats {
    fn record(&mut self, sample: &Sample) {
        self.latencies.push(sample.latency);
        self.errors.add(!sample.expected);
        self.checks.add_many(
            u64::from(sample.checks_passed),
            u64::from(sample.checks_passed + sample.checks_failed),
        );
    }
}

/// Running aggregate of every sample in a run
#[derive(Debug, Default)]
pub struct Stats {
    overall: GroupStats,
    groups: BTreeMap<String, GroupStats>,
    transport_errors: u64,
}

impl Stats {
    pub fn record(&mut self, sample: Sample) {
        if sample.status.is_none() {
            self.transport_errors += 1;
        }
        self.overall.record(&sample);
        self.groups.entry(sample.group.clone()).or_default().record(&sample);
    }

    pub fn total_requests(&self) -> usize {
        self.overall.latencies.len()
    }

    pub fn summarize(self, run: RunInfo, thresholds: &Thresholds) -> Summary {
        let latency = LatencySummary::from_latencies(&self.overall.latencies);
        let error_rate = self.overall.errors.ratio();

        let groups = self
            .groups
            .iter()
            .map(|(name, stats)| GroupSummary {
                name: name.clone(),
                requests: stats.latencies.len(),
                error_rate: stats.errors.ratio(),
                checks: stats.checks,
                latency: LatencySummary::from_latencies(&stats.latencies),
            })
            .collect();

        let p95_limit = thresholds.p95_latency.as_secs_f64() * 1000.0;
        let threshold_results = vec![
            ThresholdResult {
                name: format!("error_rate < {}", thresholds.max_error_rate),
                actual: error_rate,
                limit: thresholds.max_error_rate,
                passed: error_rate < thresholds.max_error_rate,
            },
            ThresholdResult {
                name: format!("p(95) < {}", humantime::format_duration(thresholds.p95_latency)),
                actual: latency.p95_ms,
                limit: p95_limit,
                passed: latency.p95_ms < p95_limit,
            },
        ];

        Summary {
            duration_secs: run.duration.as_secs_f64(),
            iterations: run.iterations,
            peak_vus: run.peak_vus,
            total_requests: latency.count,
            transport_errors: self.transport_errors,
            success_rate: self.overall.checks.ratio(),
            error_rate,
            checks: self.overall.checks,
            latency,
            groups,
            thresholds: threshold_results,
        }
    }
}

/// Facts about the run that do not come from samples
#[derive(Debug, Clone, Copy, Default)]
pub struct RunInfo {
    pub duration: Duration,
    pub iterations: u64,
    pub peak_vus: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub name: String,
    pub requests: usize,
    pub error_rate: f64,
    pub checks: Rate,
    pub latency: LatencySummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThresholdResult {
    pub name: String,
    pub actual: f64,
    pub limit: f64,
    pub passed: bool,
}

/// End-of-run report
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub duration_secs: f64,
    pub iterations: u64,
    pub peak_vus: u32,
    pub total_requests: usize,
    pub transport_errors: u64,
    /// Fraction of passed checks
    pub success_rate: f64,
    /// Fraction of requests that did not return the expected status
    pub error_rate: f64,
    pub checks: Rate,
    pub latency: LatencySummary,
    pub groups: Vec<GroupSummary>,
    pub thresholds: Vec<ThresholdResult>,
}

impl Summary {
    pub fn thresholds_passed(&self) -> bool {
        self.thresholds.iter().all(|t| t.passed)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "duration: {:.1}s  iterations: {}  peak vus: {}",
            self.duration_secs, self.iterations, self.peak_vus
        )?;
        writeln!(
            f,
            "requests: {}  transport errors: {}",
            self.total_requests, self.transport_errors
        )?;
        writeln!(
            f,
            "checks: {:.2}% ({}/{})  error rate: {:.2}%",
            self.success_rate * 100.0,
            self.checks.passes,
            self.checks.total,
            self.error_rate * 100.0
        )?;
        writeln!(
            f,
            "latency: avg={:.2}ms min={:.2}ms p50={:.2}ms p90={:.2}ms p95={:.2}ms p99={:.2}ms max={:.2}ms",
            self.latency.mean_ms,
            self.latency.min_ms,
            self.latency.p50_ms,
            self.latency.p90_ms,
            self.latency.p95_ms,
            self.latency.p99_ms,
            self.latency.max_ms
        )?;

        writeln!(f)?;
        for group in &self.groups {
            writeln!(
                f,
                "  {:<20} reqs={:<6} checks={:>6.2}% errors={:>6.2}% p95={:.2}ms",
                group.name,
                group.requests,
                group.checks.ratio() * 100.0,
                group.error_rate * 100.0,
                group.latency.p95_ms
            )?;
        }

        writeln!(f)?;
        for threshold in &self.thresholds {
            let mark = if threshold.passed { "ok  " } else { "FAIL" };
            writeln!(f, "  [{}] {} (actual {:.4})", mark, threshold.name, threshold.actual)?;
        }
        Ok(())
    }
}
