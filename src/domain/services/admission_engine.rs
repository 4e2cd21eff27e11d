//! Admission Engine - Domain Service
//!
//! Pure decision logic: resolve the caller's country, then test it
//! against the allow-list. The engine holds no state of its own.

use crate::domain::entities::{AdmissionDecision, AdmissionQuery};
use crate::domain::errors::DomainError;
use crate::domain::ports::GeoResolver;

/// Admission engine.
///
/// Decides whether an address belongs to one of the allowed countries.
/// For a fixed query and dataset snapshot the result is repeatable.
pub struct AdmissionEngine;

impl AdmissionEngine {
    /// Decide admission for a query.
    ///
    /// # Errors
    /// * [`DomainError::InvalidInput`] if the address does not parse
    /// * [`DomainError::ResolutionFailed`] for any other resolver failure,
    ///   including an address that is absent from the dataset
    ///
    /// An empty allow-list is not an error: the decision is `allowed=false`
    /// with the resolved country still reported.
    pub fn decide(
        query: &AdmissionQuery,
        resolver: &dyn GeoResolver,
    ) -> Result<AdmissionDecision, DomainError> {
        let country = resolver.resolve_country(&query.ip)?;

        // Exact match only: "us" never admits "US".
        let allowed = query
            .allowed
            .iter()
            .any(|candidate| country.matches(candidate));

        tracing::debug!(
            ip = %query.ip,
            country = %country,
            allowed,
            "admission decided"
        );

        Ok(AdmissionDecision::new(allowed, country))
    }
}
