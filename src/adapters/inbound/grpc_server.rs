//! gRPC Server Adapter
//!
//! Unary `CheckIP` front-end. Decodes the protobuf request, calls the
//! shared IpCheckService and maps errors to gRPC status codes.

use crate::adapters::inbound::request_log::{self, Outcome, Protocol};
use crate::application::{CheckError, ErrorClass, IpCheckService};
use crate::infrastructure::shutdown::ShutdownController;
use crate::proto;
use crate::proto::ip_checker_server::{IpChecker, IpCheckerServer};
use crate::proto::{IpCheckRequest, IpCheckResponse};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::{Request, Response, Status};

/// Full wire name of the `CheckIP` method.
pub const CHECK_IP_METHOD: &str = "/ipchecker.v1.IPChecker/CheckIP";

fn to_status(err: CheckError) -> Status {
    match err.class() {
        ErrorClass::Client => Status::invalid_argument(err.public_message()),
        ErrorClass::Server => Status::internal(err.public_message()),
    }
}

/// `IpChecker` service implementation backed by the IpCheckService.
pub struct GrpcIpChecker {
    service: Arc<IpCheckService>,
    shutdown: ShutdownController,
}

impl GrpcIpChecker {
    pub fn new(service: Arc<IpCheckService>, shutdown: ShutdownController) -> Self {
        Self { service, shutdown }
    }
}

#[tonic::async_trait]
impl IpChecker for GrpcIpChecker {
    async fn check_ip(
        &self,
        request: Request<IpCheckRequest>,
    ) -> Result<Response<IpCheckResponse>, Status> {
        let _guard = self.shutdown.request_guard();
        let req = request.into_inner();

        // proto3 cannot tell a missing list from an empty one, so only the
        // address can be malformed here.
        let query = IpCheckService::parse_query(Some(req.ip_address), Some(req.allowed_countries))
            .map_err(to_status)?;
        let decision = self.service.check(&query).map_err(to_status)?;

        Ok(Response::new(IpCheckResponse {
            allowed: decision.allowed,
            country: decision.country.into_inner(),
        }))
    }
}

/// Logging decorator around any `IpChecker` implementation.
///
/// Observes start, completion, status and latency of each call without
/// touching the call itself.
pub struct LoggedIpChecker<S> {
    inner: S,
}

impl<S> LoggedIpChecker<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[tonic::async_trait]
impl<S: IpChecker> IpChecker for LoggedIpChecker<S> {
    async fn check_ip(
        &self,
        request: Request<IpCheckRequest>,
    ) -> Result<Response<IpCheckResponse>, Status> {
        let start = Instant::now();
        tracing::debug!(
            method = CHECK_IP_METHOD,
            peer = ?request.remote_addr(),
            request = ?request.get_ref(),
            "gRPC request started"
        );

        let result = self.inner.check_ip(request).await;

        let code = match &result {
            Ok(_) => tonic::Code::Ok,
            Err(status) => status.code(),
        };
        request_log::record(
            Protocol::Grpc,
            CHECK_IP_METHOD,
            &format!("{:?}", code),
            Outcome::from_grpc_code(code),
            start.elapsed(),
        );
        result
    }
}

fn reflection_builder() -> tonic_reflection::server::Builder<'static> {
    tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(proto::FILE_DESCRIPTOR_SET)
}

/// gRPC Server - inbound adapter for protobuf clients.
pub struct GrpcServer {
    checker: GrpcIpChecker,
    shutdown: ShutdownController,
}

impl GrpcServer {
    pub fn new(service: Arc<IpCheckService>, shutdown: ShutdownController) -> Self {
        Self {
            checker: GrpcIpChecker::new(service, shutdown.clone()),
            shutdown,
        }
    }

    /// The routable service, wrapped in the logging decorator.
    pub fn into_service(self) -> IpCheckerServer<LoggedIpChecker<GrpcIpChecker>> {
        IpCheckerServer::new(LoggedIpChecker::new(self.checker))
    }

    /// Serve on an already bound listener until shutdown is signalled.
    ///
    /// After the signal no new connections are accepted and in-flight
    /// calls are allowed to finish.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let shutdown = self.shutdown.clone();
        let reflection = reflection_builder()
            .build_v1()
            .map_err(|e| anyhow::anyhow!("failed to build reflection service: {:?}", e))?;
        let reflection_v1alpha = reflection_builder()
            .build_v1alpha()
            .map_err(|e| anyhow::anyhow!("failed to build reflection service: {:?}", e))?;
        tracing::info!("gRPC server listening on {}", listener.local_addr()?);

        Server::builder()
            .add_service(self.into_service())
            .add_service(reflection)
            .add_service(reflection_v1alpha)
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                shutdown.wait().await
            })
            .await?;

        tracing::info!("gRPC server stopped");
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::adapters::outbound::StaticGeoResolver;
    use tonic::Code;

    fn checker(resolver: StaticGeoResolver) -> LoggedIpChecker<GrpcIpChecker> {
        let service = Arc::new(IpCheckService::new(Arc::new(resolver)));
        LoggedIpChecker::new(GrpcIpChecker::new(service, ShutdownController::new()))
    }

    fn request(ip: &str, allowed: &[&str]) -> Request<IpCheckRequest> {
        Request::new(IpCheckRequest {
            ip_address: ip.to_string(),
            allowed_countries: allowed.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[test]
    fn test_wire_service_name() {
        use tonic::server::NamedService;

        assert_eq!(
            <IpCheckerServer<GrpcIpChecker> as NamedService>::NAME,
            "ipchecker.v1.IPChecker"
        );
        assert!(CHECK_IP_METHOD.starts_with("/ipchecker.v1.IPChecker/"));
    }

    #[test]
    fn test_reflection_services_build() {
        assert!(reflection_builder().build_v1().is_ok());
        assert!(reflection_builder().build_v1alpha().is_ok());
    }

    #[tokio::test]
    async fn test_check_ip_success() {
        let svc = checker(StaticGeoResolver::fixed("US"));
        let resp = svc
            .check_ip(request("128.101.101.101", &["US", "CA"]))
            .await
            .unwrap()
            .into_inner();

        assert!(resp.allowed);
        assert_eq!(resp.country, "US");
    }

    #[tokio::test]
    async fn test_check_ip_not_allowed() {
        let svc = checker(StaticGeoResolver::fixed("BR"));
        let resp = svc
            .check_ip(request("200.160.2.3", &["US"]))
            .await
            .unwrap()
            .into_inner();

        assert!(!resp.allowed);
        assert_eq!(resp.country, "BR");
    }

    #[tokio::test]
    async fn test_check_ip_empty_allow_list() {
        let svc = checker(StaticGeoResolver::fixed("DE"));
        let resp = svc.check_ip(request("5.9.0.1", &[])).await.unwrap().into_inner();

        assert!(!resp.allowed);
        assert_eq!(resp.country, "DE");
    }

    #[tokio::test]
    async fn test_check_ip_invalid_address() {
        let svc = checker(StaticGeoResolver::fixed("US"));
        let status = svc.check_ip(request("not-an-ip", &["US"])).await.unwrap_err();

        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "invalid IP address");
    }

    #[tokio::test]
    async fn test_check_ip_missing_address() {
        let svc = checker(StaticGeoResolver::fixed("US"));
        let status = svc.check_ip(request("", &["US"])).await.unwrap_err();

        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(status.message(), "ip_address is required");
    }

    #[tokio::test]
    async fn test_check_ip_backend_failure() {
        let svc = checker(StaticGeoResolver::failing("geo service error"));
        let status = svc
            .check_ip(request("128.101.101.101", &["US", "CA"]))
            .await
            .unwrap_err();

        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), "unable to lookup country");
    }

    #[tokio::test]
    async fn test_check_ip_not_in_dataset() {
        let svc = checker(StaticGeoResolver::table([("8.8.8.8", "US")]));
        let status = svc.check_ip(request("10.1.2.3", &["US"])).await.unwrap_err();

        assert_eq!(status.code(), Code::Internal);
    }

    #[tokio::test]
    async fn test_request_guard_released() {
        let shutdown = ShutdownController::new();
        let service = Arc::new(IpCheckService::new(Arc::new(StaticGeoResolver::fixed("US"))));
        let svc = GrpcIpChecker::new(service, shutdown.clone());

        let _ = svc.check_ip(request("8.8.8.8", &["US"])).await;
        assert_eq!(shutdown.active_requests(), 0);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_calls_are_logged() {
        let svc = checker(StaticGeoResolver::failing("boom"));
        let _ = svc.check_ip(request("8.8.8.8", &["US"])).await;

        assert!(logs_contain("request failed"));
        assert!(logs_contain(CHECK_IP_METHOD));
        assert!(logs_contain("Internal"));
    }
}
