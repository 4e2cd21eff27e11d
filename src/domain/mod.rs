//! Domain Layer
//!
//! Admission rules and the geodata port. Nothing here knows about HTTP,
//! gRPC or the process lifecycle.

pub mod entities;
pub mod errors;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use entities::{AdmissionDecision, AdmissionQuery};
pub use errors::{DomainError, GeoError};
pub use value_objects::CountryCode;
