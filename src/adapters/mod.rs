//! Adapters Layer
//!
//! Inbound adapters drive the application (HTTP, gRPC); outbound adapters
//! implement domain ports (geodata backends).

pub mod inbound;
pub mod outbound;
