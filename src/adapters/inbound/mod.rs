mod grpc_server;
mod http_server;
pub mod request_log;

pub use grpc_server::{GrpcIpChecker, GrpcServer, LoggedIpChecker, CHECK_IP_METHOD};
pub use http_server::{HttpServer, HttpState, CHECK_IP_PATH};

// Re-export for external use (e.g., integration tests)
#[allow(unused_imports)]
pub use http_server::{ErrorResponse, IpCheckRequest, IpCheckResponse};
