use actix_web::{web, HttpResponse};

use crate::routes::AppState;

/// Expose Prometheus metrics
///
/// GET /metrics
pub async fn metrics_handler(state: web::Data<AppState>) -> HttpResponse {
    match state.metrics.render() {
        Ok(body) => HttpResponse::Ok()
            .content_type(state.metrics.content_type())
            .body(body),
        Err(err) => {
            tracing::error!("Failed to encode metrics: {}", err);
            HttpResponse::InternalServerError().body(format!("failed to encode metrics: {err}"))
        }
    }
}
