//! Domain Entities - Core business objects
//!
//! These entities represent the core concepts of an admission check.
//! They have no external dependencies and contain only business logic.

use crate::domain::value_objects::CountryCode;
use serde::Serialize;

/// Input of one admission check, as decoded from a wire request.
///
/// The address is kept in its raw textual form; parsing it is the
/// resolver's job. The allow-list is taken as supplied, duplicates and
/// casing included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionQuery {
    /// Raw IP address text
    pub ip: String,
    /// Acceptable country codes, in caller order
    pub allowed: Vec<String>,
}

impl AdmissionQuery {
    pub fn new(ip: impl Into<String>, allowed: Vec<String>) -> Self {
        Self {
            ip: ip.into(),
            allowed,
        }
    }
}

/// Outcome of one admission check.
///
/// `allowed` is true iff `country` appears in the allow-list under exact
/// comparison. `country` is always populated, even on rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdmissionDecision {
    pub allowed: bool,
    pub country: CountryCode,
}

impl AdmissionDecision {
    pub fn new(allowed: bool, country: CountryCode) -> Self {
        Self { allowed, country }
    }
}
