//! GeoIP Resolver Port
//!
//! Defines the interface for resolving IP addresses to country codes.

use crate::domain::errors::GeoError;
use crate::domain::value_objects::CountryCode;

/// Resolver for IP address to country code.
///
/// This is an outbound port that abstracts the geodata resource.
/// Implementations may use MaxMind GeoLite2 or a fixed in-memory table.
///
/// A resolver is opened once, shared read-only by every front-end, and
/// closed exactly once by the lifecycle coordinator.
pub trait GeoResolver: Send + Sync {
    /// Resolve the country for an address given in textual form.
    ///
    /// The text is not pre-validated; implementations parse it and
    /// return [`GeoError::InvalidAddress`] when it is not an IPv4 or IPv6
    /// address.
    fn resolve_country(&self, ip: &str) -> Result<CountryCode, GeoError>;

    /// Release the backing resource.
    ///
    /// A second call, or a lookup after closing, returns [`GeoError::Closed`].
    fn close(&self) -> Result<(), GeoError>;
}
