//! IP Check Service - Main application use case
//!
//! The single entry point both front-ends call. It owns a non-closing
//! capability over the shared resolver and maps failures into the
//! two-class (client/server) model the adapters encode on the wire.

use crate::domain::entities::{AdmissionDecision, AdmissionQuery};
use crate::domain::errors::DomainError;
use crate::domain::ports::GeoResolver;
use crate::domain::services::AdmissionEngine;
use std::sync::Arc;

/// Who caused a failed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad request: malformed payload or unparseable address
    Client,
    /// Backend resolution failure
    Server,
}

/// Failure of one check, as seen by a protocol adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    /// A required field was missing or empty; the engine was not called.
    #[error("malformed request: {0}")]
    Malformed(String),
    /// The engine rejected the query.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl CheckError {
    pub fn class(&self) -> ErrorClass {
        match self {
            CheckError::Malformed(_) | CheckError::Domain(DomainError::InvalidInput(_)) => {
                ErrorClass::Client
            }
            CheckError::Domain(DomainError::ResolutionFailed(_)) => ErrorClass::Server,
        }
    }

    /// Message safe to return to callers.
    ///
    /// Server-side detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            CheckError::Malformed(msg) => msg.clone(),
            CheckError::Domain(DomainError::InvalidInput(_)) => "invalid IP address".to_string(),
            CheckError::Domain(DomainError::ResolutionFailed(_)) => {
                "unable to lookup country".to_string()
            }
        }
    }
}

/// IP check service.
///
/// Shared by the HTTP and gRPC adapters. It holds the resolver but never
/// exposes `close`; only the lifecycle coordinator may release it.
pub struct IpCheckService {
    resolver: Arc<dyn GeoResolver>,
}

impl IpCheckService {
    pub fn new(resolver: Arc<dyn GeoResolver>) -> Self {
        Self { resolver }
    }

    /// Build a query from decoded wire fields.
    ///
    /// An absent or empty address and an absent allow-list are rejected as
    /// malformed. An explicitly empty allow-list is accepted.
    pub fn parse_query(
        ip_address: Option<String>,
        allowed_countries: Option<Vec<String>>,
    ) -> Result<AdmissionQuery, CheckError> {
        let ip = match ip_address {
            Some(ip) if !ip.is_empty() => ip,
            _ => return Err(CheckError::Malformed("ip_address is required".to_string())),
        };
        let allowed = allowed_countries
            .ok_or_else(|| CheckError::Malformed("allowed_countries is required".to_string()))?;
        Ok(AdmissionQuery::new(ip, allowed))
    }

    /// Run one admission check.
    pub fn check(&self, query: &AdmissionQuery) -> Result<AdmissionDecision, CheckError> {
        AdmissionEngine::decide(query, self.resolver.as_ref()).map_err(|e| {
            match &e {
                DomainError::InvalidInput(_) => {
                    tracing::debug!("rejected invalid address {:?}: {}", query.ip, e)
                }
                DomainError::ResolutionFailed(_) => {
                    tracing::error!("geo resolution failed for {:?}: {}", query.ip, e)
                }
            }
            CheckError::Domain(e)
        })
    }
}
