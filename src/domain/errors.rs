//! Domain Errors
//!
//! Failure taxonomy for geodata resolution and admission decisions.

use std::net::IpAddr;

/// Failure reported by a [`GeoResolver`](crate::domain::ports::GeoResolver).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeoError {
    /// The text does not parse as an IPv4 or IPv6 address.
    #[error("invalid IP address format: {0:?}")]
    InvalidAddress(String),
    /// The address is valid but has no country in the dataset.
    #[error("no country record for {0}")]
    NotFound(IpAddr),
    /// Backend failure (corrupt record, I/O, decoding).
    #[error("geo lookup failed: {0}")]
    LookupFailed(String),
    /// The resolver has already been closed.
    #[error("geo resolver is closed")]
    Closed,
}

/// Error produced by the admission engine, independent of wire protocol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Caller-supplied address could not be parsed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The geodata backend could not produce a country.
    #[error("resolution failed: {0}")]
    ResolutionFailed(String),
}

impl From<GeoError> for DomainError {
    fn from(err: GeoError) -> Self {
        match err {
            GeoError::InvalidAddress(_) => DomainError::InvalidInput(err.to_string()),
            GeoError::NotFound(_) | GeoError::LookupFailed(_) | GeoError::Closed => {
                DomainError::ResolutionFailed(err.to_string())
            }
        }
    }
}
