use actix_web::{web, HttpResponse};
use tracing::{info, warn, Instrument};
use validator::Validate;

use crate::core::fibonacci_checked;
use crate::error::ApiError;
use crate::models::{
    CreateUserRequest, FibonacciRequest, FibonacciResponse, HealthResponse, RequestId,
};
use crate::routes::AppState;
use crate::services::telemetry::operation_span;

/// Configure all `/api` routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/users", web::get().to(list_users))
        .route("/users", web::post().to(create_user))
        .route("/users/{id}", web::get().to(get_user))
        .route("/compute", web::post().to(compute_fibonacci));
}

/// Health check endpoint
///
/// GET /api/health
async fn health_check() -> HttpResponse {
    let span = tracing::info_span!("health_check");

    async {
        info!("Health check requested");
        HttpResponse::Ok().json(HealthResponse::healthy())
    }
    .instrument(span)
    .await
}

/// List all users
///
/// GET /api/users
#[tracing::instrument(skip(state))]
async fn list_users(state: web::Data<AppState>) -> HttpResponse {
    info!("Listing all users");

    let users = state.users.list().await;

    info!(count = users.len(), "Users retrieved");
    HttpResponse::Ok().json(users)
}

/// Create a user
///
/// POST /api/users
///
/// Request body:
/// ```json
/// { "name": "string", "email": "string" }
/// ```
#[tracing::instrument(skip(state, req, request_id), fields(request_id = %request_id))]
async fn create_user(
    state: web::Data<AppState>,
    req: web::Json<CreateUserRequest>,
    request_id: RequestId,
) -> Result<HttpResponse, ApiError> {
    info!("Creating new user: {}", req.name);

    if let Err(errors) = req.validate() {
        warn!(errors = %errors, "Invalid user payload");
        return Err(errors.into());
    }

    let user = state.users.create(&req.name, &req.email).await;

    info!(user_id = %user.id, "User created successfully");
    Ok(HttpResponse::Created().json(user))
}

/// Get a user by id
///
/// GET /api/users/{id}
#[tracing::instrument(skip(state, path))]
async fn get_user(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();

    info!(user_id = %user_id, "Fetching user by ID");

    match state.users.get(&user_id).await {
        Some(user) => {
            info!("User found");
            Ok(HttpResponse::Ok().json(user))
        }
        None => {
            warn!(user_id = %user_id, "User not found");
            Err(ApiError::UserNotFound(user_id))
        }
    }
}

/// Compute a fibonacci number
///
/// POST /api/compute
///
/// Runs on the blocking pool: the computation is deliberately CPU-bound.
#[tracing::instrument(skip(state, req), fields(n = req.n))]
async fn compute_fibonacci(
    state: web::Data<AppState>,
    req: web::Json<FibonacciRequest>,
) -> Result<HttpResponse, ApiError> {
    let n = req.n;
    let max_n = state.compute_max_n;

    if n > max_n {
        warn!("Fibonacci computation requested with large n: {}", n);
    } else {
        info!("Computing fibonacci number for n={}", n);
    }

    let span = operation_span("fibonacci");
    let result = web::block(move || span.in_scope(|| fibonacci_checked(n, max_n))).await??;

    info!(result, "Fibonacci computation completed");
    Ok(HttpResponse::Ok().json(FibonacciResponse { n, result }))
}
