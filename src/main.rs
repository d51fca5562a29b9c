use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use otel_tutorial::config::Settings;
use otel_tutorial::error::{handle_json_payload_error, handle_query_payload_error};
use otel_tutorial::middleware::RequestTracing;
use otel_tutorial::routes::{self, AppState};
use otel_tutorial::services::init_telemetry;
use tracing::info;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    // Initialize logging and trace export (needs the runtime for the OTLP channel)
    let telemetry = init_telemetry(&settings.logging, &settings.telemetry).map_err(|e| {
        eprintln!("Failed to initialize telemetry: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    info!("Starting OpenTelemetry tutorial service...");

    let app_state = AppState::from_settings(&settings).map_err(|e| {
        tracing::error!("Failed to register metrics: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    info!(
        users = app_state.users.capacity(),
        compute_max_n = app_state.compute_max_n,
        trace_export = telemetry.tracing_exported(),
        "Application state initialized"
    );

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on http://{}:{}", host, port);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(RequestTracing::new(app_state.metrics.clone()))
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run();

    let result = server.await;

    info!("Server stopped, flushing telemetry");
    telemetry.shutdown().await;

    result
}
