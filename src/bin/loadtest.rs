use clap::Parser;
use otel_tutorial::loadtest::{LoadPlan, LoadRunner, RunnerConfig, Thresholds};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Exit code used when the run completed but a threshold failed
const THRESHOLDS_FAILED_EXIT_CODE: i32 = 99;

#[derive(Parser, Debug)]
#[command(name = "loadtest")]
#[command(about = "Ramp virtual users against the tutorial API and check every response")]
struct Args {
    /// Base URL of the service under test
    #[arg(long, env = "BASE_URL", default_value = "http://127.0.0.1:8080")]
    base_url: String,

    /// Comma-separated ramp stages, <duration>:<target>
    #[arg(long, default_value = "30s:10,1m:10,30s:20,1m:20,30s:0")]
    stages: LoadPlan,

    /// Pause between iterations of one virtual user
    #[arg(long, default_value = "1000")]
    think_time_ms: u64,

    /// Per-request timeout
    #[arg(long, default_value = "10000")]
    timeout_ms: u64,

    /// Fail the run when the error rate reaches this fraction
    #[arg(long, default_value = "0.1")]
    max_error_rate: f64,

    /// Fail the run when p95 latency reaches this many milliseconds
    #[arg(long, default_value = "500")]
    p95_ms: u64,

    /// Write the summary as JSON to this file
    #[arg(long)]
    summary_json: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose output")]
    verbose: bool,
}

fn init_logger(verbose: bool) {
    let default = if verbose { "otel_tutorial=debug,loadtest=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_logger(args.verbose);

    let mut config = RunnerConfig::new(args.base_url, args.stages);
    config.think_time = Duration::from_millis(args.think_time_ms);
    config.request_timeout = Duration::from_millis(args.timeout_ms);
    config.thresholds = Thresholds {
        max_error_rate: args.max_error_rate,
        p95_latency: Duration::from_millis(args.p95_ms),
    };

    let runner = LoadRunner::new(config)?;
    let summary = runner.run().await?;

    println!("{}", summary);

    if let Some(path) = args.summary_json {
        std::fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
        tracing::info!("Summary written to {}", path.display());
    }

    if !summary.thresholds_passed() {
        tracing::error!("One or more thresholds failed");
        std::process::exit(THRESHOLDS_FAILED_EXIT_CODE);
    }
    Ok(())
}
