//! Request Logging
//!
//! One structured event per handled request, emitted by the logging
//! decorators around the HTTP and gRPC adapters.

use axum::http::StatusCode;
use std::time::Duration;

/// Wire protocol a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Grpc,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Grpc => "grpc",
        }
    }
}

/// Coarse classification of a finished request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    ClientError,
    ServerError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
        }
    }

    pub fn from_http_status(status: StatusCode) -> Self {
        if status.is_server_error() {
            Self::ServerError
        } else if status.is_client_error() {
            Self::ClientError
        } else {
            Self::Ok
        }
    }

    pub fn from_grpc_code(code: tonic::Code) -> Self {
        use tonic::Code;
        match code {
            Code::Ok => Self::Ok,
            Code::InvalidArgument
            | Code::NotFound
            | Code::AlreadyExists
            | Code::PermissionDenied
            | Code::FailedPrecondition
            | Code::OutOfRange
            | Code::Unauthenticated
            | Code::Cancelled => Self::ClientError,
            _ => Self::ServerError,
        }
    }
}

/// Emit the completion event for one request.
///
/// `method` is the wire identity: the request path for HTTP, the full
/// method name for gRPC. `status` is the protocol-native status text.
pub fn record(protocol: Protocol, method: &str, status: &str, outcome: Outcome, latency: Duration) {
    let latency_ms = latency.as_secs_f64() * 1000.0;
    match outcome {
        Outcome::Ok => tracing::info!(
            protocol = protocol.as_str(),
            method,
            status,
            outcome = outcome.as_str(),
            latency_ms,
            "request completed"
        ),
        Outcome::ClientError => tracing::warn!(
            protocol = protocol.as_str(),
            method,
            status,
            outcome = outcome.as_str(),
            latency_ms,
            "request rejected"
        ),
        Outcome::ServerError => tracing::error!(
            protocol = protocol.as_str(),
            method,
            status,
            outcome = outcome.as_str(),
            latency_ms,
            "request failed"
        ),
    }
}
