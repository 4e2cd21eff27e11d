//! Application Layer
//!
//! Use cases shared by every inbound adapter.

mod ip_check_service;

pub use ip_check_service::{CheckError, ErrorClass, IpCheckService};
