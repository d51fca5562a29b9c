// Route exports
pub mod api;
pub mod metrics;

use actix_web::web;
use std::sync::Arc;

use crate::config::Settings;
use crate::services::{HttpMetrics, MetricsError, UserStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserStore>,
    pub metrics: Arc<HttpMetrics>,
    pub compute_max_n: u32,
}

impl AppState {
    /// Build the shared state from configuration, seeding the demo users
    pub fn from_settings(settings: &Settings) -> Result<Self, MetricsError> {
        Ok(Self {
            users: Arc::new(UserStore::with_seed_users(settings.users.capacity)),
            metrics: Arc::new(HttpMetrics::new()?),
            compute_max_n: settings.compute.max_n,
        })
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(metrics::metrics_handler))
        .service(web::scope("/api").configure(api::configure));
}
