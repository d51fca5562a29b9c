use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, FromRequest, HttpMessage, HttpRequest,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::models::RequestId;
use crate::services::HttpMetrics;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Endpoint label for requests that matched no route
pub const UNMATCHED_ENDPOINT: &str = "unmatched";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Middleware giving every request an id, a span and a set of metrics
///
/// - reuses an inbound `x-request-id` or generates a UUIDv4
/// - exposes the id to handlers through the [`RequestId`] extractor
/// - wraps the request in an `http_request` span with status and duration
/// - feeds the request counter, latency histogram and in-flight gauge
/// - echoes the id back in the `x-request-id` response header
pub struct RequestTracing {
    metrics: Arc<HttpMetrics>,
}

impl RequestTracing {
    pub fn new(metrics: Arc<HttpMetrics>) -> Self {
        Self { metrics }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestTracing
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestTracingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestTracingService {
            service: Rc::new(service),
            metrics: self.metrics.clone(),
        }))
    }
}

pub struct RequestTracingService<S> {
    service: Rc<S>,
    metrics: Arc<HttpMetrics>,
}

impl<S, B> Service<ServiceRequest> for RequestTracingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let request_id = inbound_request_id(&req).unwrap_or_else(|| Uuid::new_v4().to_string());
        let method = req.method().to_string();
        let path = req.path().to_string();
        // Route pattern rather than raw path keeps label cardinality bounded
        let endpoint = req
            .match_pattern()
            .unwrap_or_else(|| UNMATCHED_ENDPOINT.to_string());

        req.extensions_mut().insert(RequestId(request_id.clone()));

        let span = tracing::info_span!(
            "http_request",
            request_id = %request_id,
            method = %method,
            path = %path,
            status = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        );

        let service = self.service.clone();
        let metrics = self.metrics.clone();
        let span_handle = span.clone();

        // Released on drop too, so cancelled requests do not stay in flight
        let in_flight = metrics.track_request_start(&method, &endpoint);
        let start_time = Instant::now();

        Box::pin(
            async move {
                info!("Request started");

                let result = service.call(req).await;
                let elapsed = start_time.elapsed();
                let status = match &result {
                    Ok(res) => res.status(),
                    Err(err) => err.as_response_error().status_code(),
                };

                metrics.track_request_result(in_flight, &method, &endpoint, status.as_u16(), elapsed);
                span_handle.record("status", status.as_u16());
                span_handle.record("duration_ms", elapsed.as_millis() as u64);

                info!("Request completed with status {}", status);

                let mut res = result?;
                if let Ok(value) = HeaderValue::from_str(&request_id) {
                    res.headers_mut()
                        .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
                }
                Ok(res)
            }
            .instrument(span),
        )
    }
}

fn inbound_request_id(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_owned)
}

impl FromRequest for RequestId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // Outside the middleware (e.g. bare handler tests) fall back to a fresh id
        let id = req
            .extensions()
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(|| RequestId(Uuid::new_v4().to_string()));
        ready(Ok(id))
    }
}
