//! HTTP Server Adapter
//!
//! JSON front-end for IP checks. Decodes the request body, calls the
//! shared IpCheckService and encodes the decision or error.

use crate::adapters::inbound::request_log::{self, Outcome, Protocol};
use crate::application::{CheckError, ErrorClass, IpCheckService};
use crate::domain::entities::AdmissionDecision;
use crate::infrastructure::shutdown::ShutdownController;
use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

/// Route of the IP check endpoint.
pub const CHECK_IP_PATH: &str = "/api/v1/ip-check";

/// IP check request body.
///
/// Fields are optional here so that a missing field is reported as a
/// malformed request rather than a JSON decoding failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpCheckRequest {
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub allowed_countries: Option<Vec<String>>,
}

/// IP check response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpCheckResponse {
    pub allowed: bool,
    pub country: String,
}

impl From<AdmissionDecision> for IpCheckResponse {
    fn from(decision: AdmissionDecision) -> Self {
        Self {
            allowed: decision.allowed,
            country: decision.country.into_inner(),
        }
    }
}

/// Error body: `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// HTTP Server state.
#[derive(Clone)]
pub struct HttpState {
    pub service: Arc<IpCheckService>,
    pub shutdown: ShutdownController,
}

/// HTTP Server - inbound adapter for JSON clients.
pub struct HttpServer {
    state: HttpState,
}

impl HttpServer {
    pub fn new(service: Arc<IpCheckService>, shutdown: ShutdownController) -> Self {
        Self {
            state: HttpState { service, shutdown },
        }
    }

    /// Build the router with all routes and layers.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route(CHECK_IP_PATH, post(check_ip_handler))
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(middleware::from_fn(log_requests))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve on an already bound listener until shutdown is signalled.
    ///
    /// Returns once every open connection has finished.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let shutdown = self.state.shutdown.clone();
        tracing::info!("HTTP server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn status_for(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::Client => StatusCode::BAD_REQUEST,
        ErrorClass::Server => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for CheckError {
    fn into_response(self) -> Response {
        error_response(status_for(self.class()), self.public_message())
    }
}

// Handler functions

async fn health_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let status = if state.shutdown.is_shutdown() {
        "draining"
    } else {
        "ok"
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn check_ip_handler(
    State(state): State<HttpState>,
    payload: Result<Json<IpCheckRequest>, JsonRejection>,
) -> Response {
    // Every body decoding failure is a bad request, including a wrong
    // content type.
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let _guard = state.shutdown.request_guard();
    let result = IpCheckService::parse_query(req.ip_address, req.allowed_countries)
        .and_then(|query| state.service.check(&query));

    match result {
        Ok(decision) => (StatusCode::OK, Json(IpCheckResponse::from(decision))).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn log_requests(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    let response = next.run(req).await;

    let status = response.status();
    request_log::record(
        Protocol::Http,
        &format!("{} {}", method, path),
        status.as_str(),
        Outcome::from_http_status(status),
        start.elapsed(),
    );
    response
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("HTTP handler panicked: {}", detail);

    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::adapters::outbound::StaticGeoResolver;
    use axum::body::Body;
    use axum::http::{header, Request as HttpRequest};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn server(resolver: StaticGeoResolver) -> HttpServer {
        let service = Arc::new(IpCheckService::new(Arc::new(resolver)));
        HttpServer::new(service, ShutdownController::new())
    }

    fn json_request(body: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method("POST")
            .uri(CHECK_IP_PATH)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(router: Router, request: HttpRequest<Body>) -> (StatusCode, serde_json::Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_check_ip_allowed() {
        let router = server(StaticGeoResolver::fixed("US")).router();
        let (status, body) = send(
            router,
            json_request(r#"{"ip_address":"128.101.101.101","allowed_countries":["US","CA"]}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"allowed": true, "country": "US"}));
    }

    #[tokio::test]
    async fn test_check_ip_not_allowed() {
        let router = server(StaticGeoResolver::fixed("BR")).router();
        let (status, body) = send(
            router,
            json_request(r#"{"ip_address":"200.160.2.3","allowed_countries":["US","CA"]}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"allowed": false, "country": "BR"}));
    }

    #[tokio::test]
    async fn test_check_ip_empty_allow_list() {
        let router = server(StaticGeoResolver::fixed("DE")).router();
        let (status, body) = send(
            router,
            json_request(r#"{"ip_address":"5.9.0.1","allowed_countries":[]}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"allowed": false, "country": "DE"}));
    }

    #[tokio::test]
    async fn test_check_ip_invalid_address() {
        let router = server(StaticGeoResolver::fixed("US")).router();
        let (status, body) = send(
            router,
            json_request(r#"{"ip_address":"not-an-ip","allowed_countries":["US"]}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({"error": "invalid IP address"}));
    }

    #[tokio::test]
    async fn test_check_ip_backend_failure() {
        let router = server(StaticGeoResolver::failing("geo service error")).router();
        let (status, body) = send(
            router,
            json_request(r#"{"ip_address":"128.101.101.101","allowed_countries":["US"]}"#),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, serde_json::json!({"error": "unable to lookup country"}));
    }

    #[tokio::test]
    async fn test_check_ip_missing_ip() {
        let router = server(StaticGeoResolver::fixed("US")).router();
        let (status, body) = send(router, json_request(r#"{"allowed_countries":["US"]}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "ip_address is required");
    }

    #[tokio::test]
    async fn test_check_ip_missing_allow_list() {
        let router = server(StaticGeoResolver::fixed("US")).router();
        let (status, body) = send(router, json_request(r#"{"ip_address":"8.8.8.8"}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "allowed_countries is required");
    }

    #[tokio::test]
    async fn test_check_ip_null_allow_list() {
        let router = server(StaticGeoResolver::fixed("US")).router();
        let (status, _) = send(
            router,
            json_request(r#"{"ip_address":"8.8.8.8","allowed_countries":null}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_check_ip_malformed_json() {
        let router = server(StaticGeoResolver::fixed("US")).router();
        let (status, body) = send(router, json_request(r#"{"ip_address": "#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_check_ip_wrong_types() {
        let router = server(StaticGeoResolver::fixed("US")).router();
        let (status, _) = send(
            router,
            json_request(r#"{"ip_address":42,"allowed_countries":"US"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_check_ip_missing_content_type() {
        let router = server(StaticGeoResolver::fixed("US")).router();
        let request = HttpRequest::builder()
            .method("POST")
            .uri(CHECK_IP_PATH)
            .body(Body::from(r#"{"ip_address":"8.8.8.8","allowed_countries":["US"]}"#))
            .unwrap();
        let (status, _) = send(router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_check_ip_get_not_allowed() {
        let router = server(StaticGeoResolver::fixed("US")).router();
        let request = HttpRequest::builder()
            .method("GET")
            .uri(CHECK_IP_PATH)
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_health() {
        let router = server(StaticGeoResolver::fixed("US")).router();
        let request = HttpRequest::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_health_while_draining() {
        let http = server(StaticGeoResolver::fixed("US"));
        http.state.shutdown.shutdown();
        let request = HttpRequest::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (_, body) = send(http.router(), request).await;

        assert_eq!(body["status"], "draining");
    }

    #[tokio::test]
    async fn test_request_guard_released_after_call() {
        let http = server(StaticGeoResolver::fixed("US"));
        let shutdown = http.state.shutdown.clone();
        let (status, _) = send(
            http.router(),
            json_request(r#"{"ip_address":"8.8.8.8","allowed_countries":["US"]}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(shutdown.active_requests(), 0);
    }

    async fn exploding_handler() -> StatusCode {
        panic!("handler exploded")
    }

    #[tokio::test]
    async fn test_panic_becomes_500() {
        let router: Router = Router::new()
            .route("/boom", get(exploding_handler))
            .layer(CatchPanicLayer::custom(handle_panic));
        let request = HttpRequest::builder()
            .uri("/boom")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(router, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal Server Error");
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_requests_are_logged() {
        let router = server(StaticGeoResolver::fixed("US")).router();
        send(
            router,
            json_request(r#"{"ip_address":"not-an-ip","allowed_countries":["US"]}"#),
        )
        .await;

        assert!(logs_contain("request rejected"));
        assert!(logs_contain("POST /api/v1/ip-check"));
    }
}
