//! Logging and trace export.
//!
//! Sets up one `tracing` subscriber with up to four layers:
//! - stdout, JSON or pretty
//! - JSON lines written to `logs/app.log` for Promtail to ship to Loki
//! - OpenTelemetry, exporting spans over OTLP/gRPC to a collector such as Jaeger
//! - an `EnvFilter` honouring `RUST_LOG`, falling back to the configured level

use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace::SdkTracerProvider, Resource};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::{LoggingSettings, TelemetrySettings};

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to create log directory {path}: {source}")]
    LogDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build OTLP exporter: {0}")]
    Exporter(String),

    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("A global subscriber is already installed: {0}")]
    Init(String),
}

/// Output format of the stdout layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "pretty" | "text" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Keeps background telemetry machinery alive.
///
/// Dropping the guard flushes the file writer; call [`TelemetryGuard::shutdown`]
/// to also flush pending spans to the collector.
pub struct TelemetryGuard {
    _file_guard: Option<WorkerGuard>,
    tracer_provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    pub fn tracing_exported(&self) -> bool {
        self.tracer_provider.is_some()
    }

    /// Flush pending spans and stop the exporter.
    ///
    /// The provider blocks while the batch processor drains, and the gRPC
    /// exporter needs the async runtime to make progress, so the flush runs
    /// on the blocking pool.
    pub async fn shutdown(mut self) {
        let Some(provider) = self.tracer_provider.take() else {
            return;
        };

        match tokio::task::spawn_blocking(move || provider.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => eprintln!("Failed to shut down tracer provider: {e}"),
            Err(e) => eprintln!("Tracer provider shutdown task failed: {e}"),
        }
    }
}

/// Build the log filter: `RUST_LOG` wins over the configured level
pub fn build_env_filter(default_level: &str) -> Result<EnvFilter, TelemetryError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level).map_err(|e| TelemetryError::Filter(e.to_string())),
    }
}

/// Initialize all telemetry and install the global subscriber
pub fn init_telemetry(
    logging: &LoggingSettings,
    telemetry: &TelemetrySettings,
) -> Result<TelemetryGuard, TelemetryError> {
    let env_filter = build_env_filter(&logging.level)?;

    let tracer_provider = if telemetry.enabled {
        Some(build_tracer_provider(telemetry)?)
    } else {
        None
    };
    let otel_layer = tracer_provider.as_ref().map(|provider| {
        let tracer = provider.tracer(telemetry.service_name.clone());
        tracing_opentelemetry::OpenTelemetryLayer::<Registry, _>::new(tracer)
    });

    let (file_layer, file_guard) = if logging.file_enabled {
        std::fs::create_dir_all(&logging.directory).map_err(|source| TelemetryError::LogDirectory {
            path: logging.directory.clone(),
            source,
        })?;
        let appender = tracing_appender::rolling::never(&logging.directory, &logging.file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .json();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let (json_stdout, pretty_stdout) = match LogFormat::parse(&logging.format) {
        LogFormat::Json => (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stdout).json()),
            None,
        ),
        LogFormat::Pretty => (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stdout).pretty()),
        ),
    };

    tracing_subscriber::registry()
        .with(otel_layer)
        .with(env_filter)
        .with(json_stdout)
        .with(pretty_stdout)
        .with(file_layer)
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))?;

    tracing::info!(
        format = %logging.format,
        file_logging = logging.file_enabled,
        trace_export = tracer_provider.is_some(),
        "Telemetry initialized"
    );
    if tracer_provider.is_some() {
        tracing::info!(endpoint = %telemetry.otlp_endpoint, "Exporting spans over OTLP");
    }

    Ok(TelemetryGuard {
        _file_guard: file_guard,
        tracer_provider,
    })
}

fn build_tracer_provider(telemetry: &TelemetrySettings) -> Result<SdkTracerProvider, TelemetryError> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(telemetry.otlp_endpoint.clone())
        .build()
        .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

    let resource = Resource::builder_empty()
        .with_attributes([
            KeyValue::new("service.name", telemetry.service_name.clone()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build();

    global::set_tracer_provider(provider.clone());
    Ok(provider)
}

/// Create a span for an ad-hoc unit of work, tagged with its own id
pub fn operation_span(name: &str) -> tracing::Span {
    tracing::info_span!(
        "operation",
        name = %name,
        operation_id = %uuid::Uuid::new_v4(),
    )
}
