//! ipchecker Library
//!
//! Country allow-list checks for IP addresses, served over HTTP and gRPC
//! from one shared geodata resolver.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub mod proto {
    //! Generated protobuf types and service traits.
    tonic::include_proto!("ipchecker.v1");

    /// Encoded descriptors for the reflection service.
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("ipchecker_descriptor");
}

// Re-export commonly used types
pub use application::{CheckError, ErrorClass, IpCheckService};
pub use config::load_config;
pub use domain::entities::{AdmissionDecision, AdmissionQuery};
pub use domain::ports::GeoResolver;
pub use domain::services::AdmissionEngine;
pub use domain::value_objects::CountryCode;
pub use infrastructure::{Coordinator, LifecycleState};
